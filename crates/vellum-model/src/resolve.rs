//! Resolved positions.
//!
//! An absolute position is a single integer. Resolving it against a document
//! produces the chain of ancestor nodes it sits inside, which is what every
//! structural operation works from.

use crate::error::ResolveError;
use crate::mark::Mark;
use crate::node::Node;

#[derive(Clone)]
pub(crate) struct PathItem {
    pub node: Node,
    pub index: usize,
    /// Position before the child at `index` inside `node`.
    pub before: usize,
}

/// A position along with the ancestor path that leads to it. Depth 0 is the
/// document root; `depth()` is the level of the direct parent.
#[derive(Clone)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathItem>,
    parent_offset: usize,
}

impl ResolvedPos {
    pub(crate) fn resolve(doc: &Node, pos: usize) -> Result<ResolvedPos, ResolveError> {
        if pos > doc.content().size() {
            return Err(ResolveError::OutOfRange { pos, size: doc.content().size() });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc.clone();
        loop {
            // In range by the check above, so find_index cannot fail.
            let index = match node.content().find_index(parent_offset) {
                Some(index) => index,
                None => return Err(ResolveError::OutOfRange { pos, size: doc.content().size() }),
            };
            let rem = parent_offset - index.offset;
            path.push(PathItem { node: node.clone(), index: index.index, before: start + index.offset });
            if rem == 0 {
                break;
            }
            let child = node.child(index.index).clone();
            if child.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += index.offset + 1;
            node = child;
        }
        Ok(ResolvedPos { pos, path, parent_offset })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Number of ancestor levels; 0 means the position is directly inside
    /// the root.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Offset of the position into its direct parent.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// The ancestor node at the given depth (the root at 0).
    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    pub fn parent(&self) -> &Node {
        &self.path[self.depth()].node
    }

    pub fn doc(&self) -> &Node {
        &self.path[0].node
    }

    /// Index of the child the position points into at the given depth.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    pub fn index_after(&self, depth: usize) -> usize {
        let index = self.index(depth);
        if depth == self.depth() && self.text_offset() == 0 {
            index
        } else {
            index + 1
        }
    }

    /// Position at the start of the node at `depth`'s content.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].before + 1
        }
    }

    /// Position at the end of the node at `depth`'s content.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content().size()
    }

    /// Position directly before the node at `depth`. Depth 0 has no before;
    /// one past the parent depth is the position itself.
    pub fn before(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            None
        } else if depth == self.depth() + 1 {
            Some(self.pos)
        } else {
            Some(self.path[depth - 1].before)
        }
    }

    /// Position directly after the node at `depth`.
    pub fn after(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            None
        } else if depth == self.depth() + 1 {
            Some(self.pos)
        } else {
            Some(self.path[depth - 1].before + self.node(depth).node_size())
        }
    }

    /// Offset into the text node the position points into, 0 when it points
    /// between nodes.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].before
    }

    /// The node directly after the position, cut when the position is inside
    /// a text node.
    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if index == parent.child_count() {
            return None;
        }
        let d_off = self.text_offset();
        let child = parent.child(index);
        if d_off > 0 {
            Some(child.cut(d_off, child.node_size()))
        } else {
            Some(child.clone())
        }
    }

    /// The node directly before the position.
    pub fn node_before(&self) -> Option<Node> {
        let index = self.index(self.depth());
        let d_off = self.text_offset();
        if d_off > 0 {
            return Some(self.parent().child(index).cut(0, d_off));
        }
        if index == 0 {
            None
        } else {
            Some(self.parent().child(index - 1).clone())
        }
    }

    /// Marks that newly inserted text at this position would get.
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if parent.content().size() == 0 {
            return Vec::new();
        }
        if self.text_offset() > 0 {
            return parent.child(index).marks().to_vec();
        }
        let main = if index > 0 {
            parent.maybe_child(index - 1)
        } else {
            parent.maybe_child(index)
        };
        main.map(|n| n.marks().to_vec()).unwrap_or_default()
    }

    /// Deepest depth at which this position and `pos` are inside the same
    /// node.
    pub fn shared_depth(&self, pos: usize) -> usize {
        for depth in (1..=self.depth()).rev() {
            if self.start(depth) <= pos && self.end(depth) >= pos {
                return depth;
            }
        }
        0
    }

    pub fn same_parent(&self, other: &ResolvedPos) -> bool {
        self.pos - self.parent_offset == other.pos - other.parent_offset
    }

    /// The deepest node range that fully contains both positions, subject to
    /// `pred` accepting the range's parent.
    pub fn block_range(
        &self,
        other: &ResolvedPos,
        pred: Option<&dyn Fn(&Node) -> bool>,
    ) -> Option<NodeRange> {
        if other.pos < self.pos {
            return other.block_range(self, pred);
        }
        let skip = if self.parent().inline_content() || self.pos == other.pos { 1 } else { 0 };
        let mut d = self.depth() as isize - skip;
        while d >= 0 {
            let depth = d as usize;
            if other.pos <= self.end(depth)
                && pred.map(|p| p(self.node(depth))).unwrap_or(true)
            {
                return Some(NodeRange::new(self.clone(), other.clone(), depth));
            }
            d -= 1;
        }
        None
    }
}

impl std::fmt::Debug for ResolvedPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResolvedPos({}, depth {})", self.pos, self.depth())
    }
}

/// A flat range of child nodes of a single parent, described by two resolved
/// positions and the depth of that parent.
#[derive(Clone)]
pub struct NodeRange {
    from: ResolvedPos,
    to: ResolvedPos,
    depth: usize,
}

impl NodeRange {
    pub fn new(from: ResolvedPos, to: ResolvedPos, depth: usize) -> NodeRange {
        NodeRange { from, to, depth }
    }

    pub fn from_pos(&self) -> &ResolvedPos {
        &self.from
    }

    pub fn to_pos(&self) -> &ResolvedPos {
        &self.to
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Position before the first covered child.
    pub fn start(&self) -> usize {
        self.from.before(self.depth + 1).unwrap_or(0)
    }

    /// Position after the last covered child.
    pub fn end(&self) -> usize {
        self.to.after(self.depth + 1).unwrap_or(self.to.pos())
    }

    pub fn parent(&self) -> &Node {
        self.from.node(self.depth)
    }

    pub fn start_index(&self) -> usize {
        self.from.index(self.depth)
    }

    pub fn end_index(&self) -> usize {
        self.to.index_after(self.depth)
    }
}

impl std::fmt::Debug for NodeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeRange({}-{}, depth {})", self.start(), self.end(), self.depth)
    }
}
