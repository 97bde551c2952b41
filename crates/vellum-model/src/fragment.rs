//! Ordered, immutable sequences of sibling nodes.

use std::sync::Arc;

use serde_json::Value;

use crate::error::ModelError;
use crate::node::Node;
use crate::schema::Schema;

/// Result of locating a position inside a fragment: the child index and the
/// position at which that child starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    pub index: usize,
    pub offset: usize,
}

/// An immutable sequence of child nodes. `size` is the sum of the children's
/// node sizes; adjacent text nodes with identical mark sets are merged on
/// construction. Clones share the child array.
#[derive(Clone)]
pub struct Fragment {
    content: Arc<Vec<Node>>,
    size: usize,
}

impl Default for Fragment {
    fn default() -> Self {
        Fragment { content: Arc::new(Vec::new()), size: 0 }
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && *self.content == *other.content
    }
}

impl Eq for Fragment {}

impl std::fmt::Debug for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.content.iter()).finish()
    }
}

impl Fragment {
    fn raw(content: Vec<Node>) -> Fragment {
        let size = content.iter().map(Node::node_size).sum();
        Fragment { content: Arc::new(content), size }
    }

    /// Build a fragment from a node list, merging adjacent compatible text
    /// nodes.
    pub fn from_vec(nodes: Vec<Node>) -> Fragment {
        let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes {
            let joined = match merged.last() {
                Some(last) if last.is_text() && node.is_text() && last.same_markup(&node) => {
                    Some(last.with_text(format!("{}{}", last.text_str(), node.text_str())))
                }
                _ => None,
            };
            match joined {
                Some(replacement) => {
                    let end = merged.len() - 1;
                    merged[end] = replacement;
                }
                None => merged.push(node),
            }
        }
        Fragment::raw(merged)
    }

    pub fn from_node(node: Node) -> Fragment {
        Fragment::raw(vec![node])
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn child(&self, index: usize) -> &Node {
        &self.content[index]
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last()
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.content.iter()
    }

    /// Concatenate, re-merging a text boundary when the mark sets match.
    pub fn append(&self, other: Fragment) -> Fragment {
        if other.size == 0 {
            return self.clone();
        }
        if self.size == 0 {
            return other;
        }
        let mut nodes: Vec<Node> = (*self.content).clone();
        nodes.extend(other.content.iter().cloned());
        Fragment::from_vec(nodes)
    }

    /// Sub-fragment between two positions, cutting partially covered edge
    /// children. Out-of-range bounds are clamped.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        let to = to.min(self.size);
        let from = from.min(to);
        if from == 0 && to == self.size {
            return self.clone();
        }
        let mut result: Vec<Node> = Vec::new();
        let mut pos = 0;
        for child in self.content.iter() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from {
                let mut child = child.clone();
                if pos < from || end > to {
                    child = if child.is_text() {
                        child.cut(
                            from.saturating_sub(pos),
                            (to - pos).min(child.node_size()),
                        )
                    } else {
                        child.cut(
                            from.saturating_sub(pos + 1),
                            (to.saturating_sub(pos + 1)).min(child.content().size()),
                        )
                    };
                }
                result.push(child);
            }
            pos = end;
        }
        Fragment::raw(result)
    }

    /// Sub-fragment covering whole children `from..to`.
    pub fn cut_by_index(&self, from: usize, to: usize) -> Fragment {
        if from == to {
            return Fragment::default();
        }
        if from == 0 && to == self.content.len() {
            return self.clone();
        }
        Fragment::raw(self.content[from..to].to_vec())
    }

    /// A copy with child `index` swapped out.
    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        if self.content[index] == node {
            return self.clone();
        }
        let mut nodes = (*self.content).clone();
        nodes[index] = node;
        Fragment::raw(nodes)
    }

    pub fn add_to_start(&self, node: Node) -> Fragment {
        let mut nodes = Vec::with_capacity(self.content.len() + 1);
        nodes.push(node);
        nodes.extend(self.content.iter().cloned());
        Fragment::raw(nodes)
    }

    pub fn add_to_end(&self, node: Node) -> Fragment {
        let mut nodes = (*self.content).clone();
        nodes.push(node);
        Fragment::raw(nodes)
    }

    /// Locate the child covering `pos`, or the boundary at `pos`. `None`
    /// outside `[0, size]`.
    pub fn find_index(&self, pos: usize) -> Option<Index> {
        if pos == 0 {
            return Some(Index { index: 0, offset: 0 });
        }
        if pos == self.size {
            return Some(Index { index: self.content.len(), offset: pos });
        }
        if pos > self.size {
            return None;
        }
        let mut cur_pos = 0;
        for (i, child) in self.content.iter().enumerate() {
            let end = cur_pos + child.node_size();
            if end >= pos {
                return Some(if end == pos {
                    Index { index: i + 1, offset: end }
                } else {
                    Index { index: i, offset: cur_pos }
                });
            }
            cur_pos = end;
        }
        None
    }

    /// Call `f` for every node between two positions, descending into
    /// children when `f` returns `true`. Arguments: node, its start
    /// position, its parent (when known), its index.
    pub(crate) fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool,
        node_start: usize,
        parent: Option<&Node>,
    ) {
        let mut pos = 0;
        for (i, child) in self.content.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, parent, i) && child.content().size() > 0 {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    (to - start).min(child.content().size()),
                    f,
                    node_start + start,
                    Some(child),
                );
            }
            pos = end;
        }
    }

    /// First position at which this fragment and `other` differ, or `None`
    /// when one is a prefix of the other and equal so far.
    pub fn find_diff_start(&self, other: &Fragment, pos: usize) -> Option<usize> {
        let mut pos = pos;
        for i in 0.. {
            if i == self.child_count() || i == other.child_count() {
                return (self.child_count() != other.child_count()).then_some(pos);
            }
            let (a, b) = (self.child(i), other.child(i));
            if a == b {
                pos += a.node_size();
                continue;
            }
            if !a.same_markup(b) {
                return Some(pos);
            }
            if a.is_text() && a.text_str() != b.text_str() {
                let same_prefix = a
                    .text_str()
                    .chars()
                    .zip(b.text_str().chars())
                    .take_while(|(x, y)| x == y)
                    .count();
                return Some(pos + same_prefix);
            }
            if a.content().size() > 0 || b.content().size() > 0 {
                if let Some(inner) = a.content().find_diff_start(b.content(), pos + 1) {
                    return Some(inner);
                }
            }
            pos += a.node_size();
        }
        None
    }

    /// Last position before which this fragment and `other` differ, as
    /// `(position in self, position in other)`.
    pub fn find_diff_end(
        &self,
        other: &Fragment,
        pos: usize,
        other_pos: usize,
    ) -> Option<(usize, usize)> {
        let (mut ia, mut ib) = (self.child_count(), other.child_count());
        let (mut pos, mut other_pos) = (pos, other_pos);
        loop {
            if ia == 0 || ib == 0 {
                return (ia != ib).then_some((pos, other_pos));
            }
            let (a, b) = (self.child(ia - 1), other.child(ib - 1));
            if a == b {
                pos -= a.node_size();
                other_pos -= a.node_size();
                ia -= 1;
                ib -= 1;
                continue;
            }
            if !a.same_markup(b) {
                return Some((pos, other_pos));
            }
            if a.is_text() && a.text_str() != b.text_str() {
                let same_suffix = a
                    .text_str()
                    .chars()
                    .rev()
                    .zip(b.text_str().chars().rev())
                    .take_while(|(x, y)| x == y)
                    .count();
                return Some((pos - same_suffix, other_pos - same_suffix));
            }
            if a.content().size() > 0 || b.content().size() > 0 {
                if let Some(inner) =
                    a.content().find_diff_end(b.content(), pos - 1, other_pos - 1)
                {
                    return Some(inner);
                }
            }
            pos -= a.node_size();
            other_pos -= b.node_size();
            ia -= 1;
            ib -= 1;
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.content.iter().map(Node::to_json).collect())
    }

    pub fn from_json(schema: &Schema, json: &Value) -> Result<Fragment, ModelError> {
        let items = json
            .as_array()
            .ok_or_else(|| ModelError::InvalidJson("fragment must be an array".into()))?;
        let nodes = items
            .iter()
            .map(|item| Node::from_json(schema, item))
            .collect::<Result<Vec<Node>, ModelError>>()?;
        Ok(Fragment::from_vec(nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic;

    fn schema() -> &'static Schema {
        basic::schema()
    }

    #[test]
    fn merges_adjacent_text_with_same_marks() {
        let frag = Fragment::from_vec(vec![
            schema().text("foo", vec![]),
            schema().text("bar", vec![]),
        ]);
        assert_eq!(frag.child_count(), 1);
        assert_eq!(frag.child(0).text_str(), "foobar");
        assert_eq!(frag.size(), 6);
    }

    #[test]
    fn does_not_merge_across_differing_marks() {
        let em = schema().mark("em", None).unwrap();
        let frag = Fragment::from_vec(vec![
            schema().text("foo", vec![]),
            schema().text("bar", vec![em]),
        ]);
        assert_eq!(frag.child_count(), 2);
    }

    #[test]
    fn append_remerges_boundary() {
        let a = Fragment::from_vec(vec![schema().text("ab", vec![])]);
        let b = Fragment::from_vec(vec![schema().text("cd", vec![])]);
        let joined = a.append(b);
        assert_eq!(joined.child_count(), 1);
        assert_eq!(joined.size(), 4);
    }

    #[test]
    fn cut_slices_text_children() {
        let frag = Fragment::from_vec(vec![schema().text("hello", vec![])]);
        let cut = frag.cut(1, 4);
        assert_eq!(cut.child(0).text_str(), "ell");
    }

    #[test]
    fn find_index_locates_boundaries_and_interiors() {
        let frag = Fragment::from_vec(vec![
            schema().text("ab", vec![]),
            schema().text("cd", vec![schema().mark("em", None).unwrap()]),
        ]);
        assert_eq!(frag.find_index(0), Some(Index { index: 0, offset: 0 }));
        assert_eq!(frag.find_index(1), Some(Index { index: 0, offset: 0 }));
        assert_eq!(frag.find_index(2), Some(Index { index: 1, offset: 2 }));
        assert_eq!(frag.find_index(4), Some(Index { index: 2, offset: 4 }));
        assert_eq!(frag.find_index(5), None);
    }
}
