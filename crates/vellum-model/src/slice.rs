//! Slices and the low-level replace algorithm.
//!
//! A [`Slice`] is a fragment whose first and last children may be "open":
//! cut through at the side, missing their boundary tokens. `open_start` and
//! `open_end` count how many levels are open on each side. Replace stitches
//! a slice into a document, joining open nodes onto the nodes cut open at
//! the edit boundary.

use serde_json::{Map, Value};

use crate::error::{ModelError, ReplaceError};
use crate::fragment::Fragment;
use crate::node::Node;
use crate::resolve::ResolvedPos;
use crate::schema::Schema;

/// A piece of a document, with open depths at both sides.
#[derive(Clone, PartialEq, Eq)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Default for Slice {
    fn default() -> Self {
        Slice { content: Fragment::default(), open_start: 0, open_end: 0 }
    }
}

impl std::fmt::Debug for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Slice({:?}, {}, {})", self.content, self.open_start, self.open_end)
    }
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Slice {
        Slice { content, open_start, open_end }
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn open_start(&self) -> usize {
        self.open_start
    }

    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// Size the slice adds when inserted: open boundary tokens do not count.
    pub fn size(&self) -> usize {
        self.content.size() - self.open_start - self.open_end
    }

    pub fn is_empty(&self) -> bool {
        self.content.size() == 0
    }

    /// Wrap a fragment, opening both sides as deep as possible.
    pub fn max_open(fragment: Fragment) -> Slice {
        let mut open_start = 0;
        let mut node = fragment.first_child();
        while let Some(n) = node {
            if n.is_leaf() {
                break;
            }
            open_start += 1;
            node = n.first_child();
        }
        let mut open_end = 0;
        let mut node = fragment.last_child();
        while let Some(n) = node {
            if n.is_leaf() {
                break;
            }
            open_end += 1;
            node = n.last_child();
        }
        Slice { content: fragment, open_start, open_end }
    }

    /// Insert a fragment at a position inside the slice, when the content
    /// around that position allows it.
    pub fn insert_at(&self, pos: usize, fragment: Fragment) -> Option<Slice> {
        let content = insert_into(&self.content, pos + self.open_start, fragment, None)?;
        Some(Slice { content, open_start: self.open_start, open_end: self.open_end })
    }

    /// Remove `[from, to)` from the slice. The range must be flat (both ends
    /// in the same parent).
    pub fn remove_between(&self, from: usize, to: usize) -> Result<Slice, ReplaceError> {
        let content =
            remove_range(&self.content, from + self.open_start, to + self.open_start)?;
        Ok(Slice { content, open_start: self.open_start, open_end: self.open_end })
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        if self.content.child_count() > 0 {
            obj.insert("content".into(), self.content.to_json());
        }
        if self.open_start > 0 {
            obj.insert("openStart".into(), Value::from(self.open_start as u64));
        }
        if self.open_end > 0 {
            obj.insert("openEnd".into(), Value::from(self.open_end as u64));
        }
        Value::Object(obj)
    }

    pub fn from_json(schema: &Schema, json: &Value) -> Result<Slice, ModelError> {
        let obj = json
            .as_object()
            .ok_or_else(|| ModelError::InvalidJson("slice must be an object".into()))?;
        let content = match obj.get("content") {
            Some(value) => Fragment::from_json(schema, value)?,
            None => Fragment::default(),
        };
        let open_start = obj.get("openStart").and_then(Value::as_u64).unwrap_or(0) as usize;
        let open_end = obj.get("openEnd").and_then(Value::as_u64).unwrap_or(0) as usize;
        if open_start + open_end > content.size() {
            return Err(ModelError::InvalidJson("slice open depths exceed content".into()));
        }
        Ok(Slice { content, open_start, open_end })
    }
}

fn remove_range(content: &Fragment, from: usize, to: usize) -> Result<Fragment, ReplaceError> {
    let index = content.find_index(from).ok_or(ReplaceError::NonFlatRemove)?;
    let index_to = content.find_index(to).ok_or(ReplaceError::NonFlatRemove)?;
    let child = content.maybe_child(index.index);
    if index.offset == from || child.map(Node::is_text).unwrap_or(false) {
        if index_to.offset != to && !content.child(index_to.index).is_text() {
            return Err(ReplaceError::NonFlatRemove);
        }
        return Ok(content.cut(0, from).append(content.cut(to, content.size())));
    }
    if index.index != index_to.index {
        return Err(ReplaceError::NonFlatRemove);
    }
    let child = content.child(index.index);
    let inner = remove_range(child.content(), from - index.offset - 1, to - index.offset - 1)?;
    Ok(content.replace_child(index.index, child.copy(inner)))
}

fn insert_into(
    content: &Fragment,
    dist: usize,
    insert: Fragment,
    parent: Option<&Node>,
) -> Option<Fragment> {
    let index = content.find_index(dist)?;
    let child = content.maybe_child(index.index);
    if index.offset == dist || child.map(Node::is_text).unwrap_or(false) {
        if let Some(parent) = parent {
            if !parent.can_replace(index.index, index.index, &insert) {
                return None;
            }
        }
        return Some(
            content.cut(0, dist).append(insert).append(content.cut(dist, content.size())),
        );
    }
    let child = content.child(index.index);
    let inner = insert_into(child.content(), dist - index.offset - 1, insert, Some(child))?;
    Some(content.replace_child(index.index, child.copy(inner)))
}

/// Replace the range between two resolved positions with a slice.
pub(crate) fn replace(
    from: &ResolvedPos,
    to: &ResolvedPos,
    slice: &Slice,
) -> Result<Node, ReplaceError> {
    if slice.open_start > from.depth() {
        return Err(ReplaceError::InsertTooDeep);
    }
    if from.depth() - slice.open_start != to.depth() - slice.open_end {
        return Err(ReplaceError::InconsistentOpenDepths {
            from_depth: from.depth(),
            open_start: slice.open_start,
            to_depth: to.depth(),
            open_end: slice.open_end,
        });
    }
    replace_outer(from, to, slice, 0)
}

fn replace_outer(
    from: &ResolvedPos,
    to: &ResolvedPos,
    slice: &Slice,
    depth: usize,
) -> Result<Node, ReplaceError> {
    let index = from.index(depth);
    let node = from.node(depth);
    if index == to.index(depth) && depth < from.depth() - slice.open_start {
        // The edit is entirely inside one child; recurse and splice it back.
        let inner = replace_outer(from, to, slice, depth + 1)?;
        Ok(node.copy(node.content().replace_child(index, inner)))
    } else if slice.content.size() == 0 {
        close(node, replace_two_way(from, to, depth)?)
    } else if slice.open_start == 0
        && slice.open_end == 0
        && from.depth() == depth
        && to.depth() == depth
    {
        // Simple flat case: splice the slice's children between the cut
        // halves of the parent's content.
        let parent = from.parent();
        let content = parent.content();
        let new_content = content
            .cut(0, from.parent_offset())
            .append(slice.content.clone())
            .append(content.cut(to.parent_offset(), content.size()));
        close(parent, new_content)
    } else {
        let (start, end) = prepare_slice_for_replace(slice, from)?;
        close(node, replace_three_way(from, &start, &end, to, depth)?)
    }
}

fn check_join(main: &Node, sub: &Node) -> Result<(), ReplaceError> {
    if !sub.node_type().compatible_content(main.node_type()) {
        return Err(ReplaceError::CannotJoin(
            sub.node_type().name().to_string(),
            main.node_type().name().to_string(),
        ));
    }
    Ok(())
}

fn joinable<'a>(
    before: &'a ResolvedPos,
    after: &ResolvedPos,
    depth: usize,
) -> Result<&'a Node, ReplaceError> {
    let node = before.node(depth);
    check_join(node, after.node(depth))?;
    Ok(node)
}

fn add_node(child: Node, target: &mut Vec<Node>) {
    match target.last() {
        Some(last) if child.is_text() && child.same_markup(last) => {
            let joined = last.with_text(format!("{}{}", last.text_str(), child.text_str()));
            let end = target.len() - 1;
            target[end] = joined;
        }
        _ => target.push(child),
    }
}

fn add_range(
    start: Option<&ResolvedPos>,
    end: Option<&ResolvedPos>,
    depth: usize,
    target: &mut Vec<Node>,
) {
    let node = match end.or(start) {
        Some(pos) => pos.node(depth),
        None => return,
    };
    let mut start_index = 0;
    let end_index = match end {
        Some(end) => end.index(depth),
        None => node.child_count(),
    };
    if let Some(start) = start {
        start_index = start.index(depth);
        if start.depth() > depth {
            start_index += 1;
        } else if start.text_offset() > 0 {
            if let Some(after) = start.node_after() {
                add_node(after, target);
            }
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        add_node(node.child(i).clone(), target);
    }
    if let Some(end) = end {
        if end.depth() == depth && end.text_offset() > 0 {
            if let Some(before) = end.node_before() {
                add_node(before, target);
            }
        }
    }
}

fn close(node: &Node, content: Fragment) -> Result<Node, ReplaceError> {
    if !node.node_type().valid_content(&content) {
        return Err(ReplaceError::InvalidContent(node.node_type().name().to_string()));
    }
    Ok(node.copy(content))
}

fn replace_three_way(
    from: &ResolvedPos,
    start: &ResolvedPos,
    end: &ResolvedPos,
    to: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ReplaceError> {
    let open_start = if from.depth() > depth {
        Some(joinable(from, start, depth + 1)?.clone())
    } else {
        None
    };
    let open_end = if to.depth() > depth {
        Some(joinable(end, to, depth + 1)?.clone())
    } else {
        None
    };
    let mut content: Vec<Node> = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    match (&open_start, &open_end) {
        (Some(os), Some(oe)) if start.index(depth) == end.index(depth) => {
            check_join(os, oe)?;
            let inner = replace_three_way(from, start, end, to, depth + 1)?;
            add_node(close(os, inner)?, &mut content);
        }
        _ => {
            if let Some(os) = &open_start {
                let inner = replace_two_way(from, start, depth + 1)?;
                add_node(close(os, inner)?, &mut content);
            }
            add_range(Some(start), Some(end), depth, &mut content);
            if let Some(oe) = &open_end {
                let inner = replace_two_way(end, to, depth + 1)?;
                add_node(close(oe, inner)?, &mut content);
            }
        }
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_vec(content))
}

fn replace_two_way(
    from: &ResolvedPos,
    to: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ReplaceError> {
    let mut content: Vec<Node> = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    if from.depth() > depth {
        let node = joinable(from, to, depth + 1)?.clone();
        let inner = replace_two_way(from, to, depth + 1)?;
        add_node(close(&node, inner)?, &mut content);
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_vec(content))
}

/// Wrap the slice's content in the nodes that the insertion position is
/// inside of, so both edit boundaries can be resolved in the same tree.
fn prepare_slice_for_replace(
    slice: &Slice,
    along: &ResolvedPos,
) -> Result<(ResolvedPos, ResolvedPos), ReplaceError> {
    let extra = along.depth() - slice.open_start;
    let parent = along.node(extra);
    let mut node = parent.copy(slice.content.clone());
    for i in (0..extra).rev() {
        node = along.node(i).copy(Fragment::from_node(node));
    }
    let start = node.resolve(slice.open_start + extra)?;
    let end = node.resolve(node.content().size() - slice.open_end - extra)?;
    Ok((start, end))
}
