//! Document nodes.
//!
//! A [`Node`] is an immutable value: every edit builds new nodes along the
//! path from the root to the edit point and shares everything else with the
//! previous version. Positions inside text nodes count Unicode scalar
//! values.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ModelError, ReplaceError, ResolveError};
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::resolve::ResolvedPos;
use crate::schema::{Attrs, NodeType, Schema};
use crate::slice::{replace, Slice};

/// One element of the document tree: a block, an inline node, or a text run.
#[derive(Clone)]
pub struct Node {
    node_type: NodeType,
    attrs: Arc<Attrs>,
    content: Fragment,
    marks: Vec<Mark>,
    /// `Some` only for text nodes; the cached length is in chars.
    text: Option<(Arc<str>, usize)>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.node_type == other.node_type
            && self.attrs == other.attrs
            && self.marks == other.marks
            && self.text_str() == other.text_str()
            && self.content == other.content
    }
}

impl Eq for Node {}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.text {
            Some((text, _)) => write!(f, "{}({:?})", self.node_type.name(), text),
            None => write!(f, "{}{:?}", self.node_type.name(), self.content),
        }
    }
}

impl Node {
    pub(crate) fn new(
        node_type: NodeType,
        attrs: Arc<Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Node {
        Node { node_type, attrs, content, marks, text: None }
    }

    pub(crate) fn new_text(node_type: NodeType, text: String, marks: Vec<Mark>) -> Node {
        let len = text.chars().count();
        Node {
            node_type,
            attrs: Arc::new(Attrs::new()),
            content: Fragment::default(),
            marks,
            text: Some((Arc::from(text), len)),
        }
    }

    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    pub fn schema(&self) -> &Schema {
        self.node_type.schema()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    /// The text of a text node; empty for other nodes.
    pub fn text_str(&self) -> &str {
        match &self.text {
            Some((text, _)) => text,
            None => "",
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.node_type.is_leaf()
    }

    pub fn is_inline(&self) -> bool {
        self.node_type.is_inline()
    }

    pub fn is_block(&self) -> bool {
        self.node_type.is_block()
    }

    pub fn is_textblock(&self) -> bool {
        self.node_type.is_textblock()
    }

    pub fn inline_content(&self) -> bool {
        self.node_type.inline_content()
    }

    /// 1 for leaf nodes, the char length for text nodes, content size plus
    /// two boundary tokens for containers.
    pub fn node_size(&self) -> usize {
        match &self.text {
            Some((_, len)) => *len,
            None if self.is_leaf() => 1,
            None => self.content.size() + 2,
        }
    }

    pub fn child_count(&self) -> usize {
        self.content.child_count()
    }

    pub fn child(&self, index: usize) -> &Node {
        self.content.child(index)
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.content.maybe_child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last_child()
    }

    /// Same type, attributes, and marks (content may differ).
    pub fn same_markup(&self, other: &Node) -> bool {
        self.has_markup(&other.node_type, Some(&other.attrs), &other.marks)
    }

    pub fn has_markup(&self, node_type: &NodeType, attrs: Option<&Attrs>, marks: &[Mark]) -> bool {
        self.node_type == *node_type
            && match attrs {
                Some(attrs) => *self.attrs == *attrs,
                None => self.attrs.is_empty() || {
                    match node_type.compute_attrs(None) {
                        Ok(defaults) => *self.attrs == *defaults,
                        Err(_) => false,
                    }
                },
            }
            && Mark::same_set(&self.marks, marks)
    }

    /// A copy of this node with different content.
    pub fn copy(&self, content: Fragment) -> Node {
        if self.is_text() {
            return self.clone();
        }
        Node {
            node_type: self.node_type.clone(),
            attrs: self.attrs.clone(),
            content,
            marks: self.marks.clone(),
            text: None,
        }
    }

    /// A copy with a different mark set.
    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        if Mark::same_set(&self.marks, &marks) {
            return self.clone();
        }
        let mut copy = self.clone();
        copy.marks = marks;
        copy
    }

    /// A text node with the same markup but different text.
    pub fn with_text(&self, text: String) -> Node {
        let len = text.chars().count();
        let mut copy = self.clone();
        copy.text = Some((Arc::from(text), len));
        copy
    }

    /// Cut a sub-node between two positions (char offsets for text nodes,
    /// content positions otherwise).
    pub fn cut(&self, from: usize, to: usize) -> Node {
        match &self.text {
            Some((text, len)) => {
                let to = to.min(*len);
                let from = from.min(to);
                if from == 0 && to == *len {
                    return self.clone();
                }
                let cut: String = text.chars().skip(from).take(to - from).collect();
                self.with_text(cut)
            }
            None => {
                let to = to.min(self.content.size());
                if from == 0 && to == self.content.size() {
                    return self.clone();
                }
                self.copy(self.content.cut(from, to))
            }
        }
    }

    /// Cut out the open-ended piece of the document between two positions.
    pub fn slice(
        &self,
        from: usize,
        to: usize,
        include_parents: bool,
    ) -> Result<Slice, ResolveError> {
        if from == to {
            return Ok(Slice::default());
        }
        let from_pos = self.resolve(from)?;
        let to_pos = self.resolve(to)?;
        let depth = if include_parents { 0 } else { from_pos.shared_depth(to) };
        let start = from_pos.start(depth);
        let content = from_pos
            .node(depth)
            .content
            .cut(from_pos.pos() - start, to_pos.pos() - start);
        Ok(Slice::new(
            content,
            from_pos.depth() - depth,
            to_pos.depth() - depth,
        ))
    }

    /// Replace `[from, to)` with a slice, producing a new document.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, ReplaceError> {
        let from_pos = self.resolve(from)?;
        let to_pos = self.resolve(to)?;
        replace(&from_pos, &to_pos, slice)
    }

    /// The node directly at `pos`, if any.
    pub fn node_at(&self, pos: usize) -> Option<Node> {
        let mut node = self.clone();
        let mut pos = pos;
        loop {
            let index = node.content.find_index(pos)?;
            let child = node.maybe_child(index.index)?.clone();
            if index.offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= index.offset + 1;
            node = child;
        }
    }

    /// Call `f` for every descendant in `[from, to)`; `f` returning `false`
    /// prevents descent into a node's children.
    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    ) {
        self.content.nodes_between(from, to, f, 0, Some(self));
    }

    /// Concatenated text of all text nodes in the given range.
    pub fn text_between(&self, from: usize, to: usize, block_separator: &str) -> String {
        let mut result = String::new();
        let mut separated = true;
        self.nodes_between(from, to, &mut |node, pos, _, _| {
            if node.is_text() {
                let start = from.saturating_sub(pos);
                let end = (to - pos).min(node.node_size());
                result.extend(node.text_str().chars().skip(start).take(end - start));
                separated = block_separator.is_empty();
            } else if node.is_block() && pos > 0 && !separated {
                result.push_str(block_separator);
                separated = true;
            }
            true
        });
        result
    }

    pub fn text_content(&self) -> String {
        if self.is_text() {
            return self.text_str().to_string();
        }
        self.text_between(0, self.content.size(), "")
    }

    /// Resolve an absolute position into a structural path.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, ResolveError> {
        ResolvedPos::resolve(self, pos)
    }

    /// The content-match state after this node's children up to `index`.
    /// `None` when the existing content does not match the type (an invalid
    /// document).
    pub fn content_match_at(&self, index: usize) -> Option<crate::ContentMatch> {
        self.node_type
            .content_match()
            .match_fragment_range(&self.content, 0, index)
    }

    /// Whether replacing children `from..to` with `replacement` keeps this
    /// node's content valid.
    pub fn can_replace(&self, from: usize, to: usize, replacement: &Fragment) -> bool {
        self.can_replace_range(from, to, replacement, 0, replacement.child_count())
    }

    pub fn can_replace_range(
        &self,
        from: usize,
        to: usize,
        replacement: &Fragment,
        start: usize,
        end: usize,
    ) -> bool {
        let one = match self
            .content_match_at(from)
            .and_then(|m| m.match_fragment_range(replacement, start, end))
        {
            Some(m) => m,
            None => return false,
        };
        let two = match one.match_fragment_range(&self.content, to, self.child_count()) {
            Some(m) => m,
            None => return false,
        };
        if !two.valid_end() {
            return false;
        }
        (start..end).all(|i| self.node_type.allows_marks(replacement.child(i).marks()))
    }

    /// Whether a node of the given type could be placed instead of children
    /// `from..to`.
    pub fn can_replace_with(&self, from: usize, to: usize, node_type: &NodeType) -> bool {
        let start = match self.content_match_at(from).and_then(|m| m.match_type(node_type)) {
            Some(m) => m,
            None => return false,
        };
        match start.match_fragment_range(&self.content, to, self.child_count()) {
            Some(end) => end.valid_end(),
            None => false,
        }
    }

    /// Whether `other`'s content could be appended after this node's.
    pub fn can_append(&self, other: &Node) -> bool {
        if other.child_count() > 0 {
            self.can_replace(self.child_count(), self.child_count(), &other.content)
        } else {
            self.node_type.compatible_content(&other.node_type)
        }
    }

    /// Validate this node and all descendants against the schema: content
    /// expressions must match and every mark must be allowed.
    pub fn check(&self) -> Result<(), ModelError> {
        if !self.node_type.valid_content(&self.content) {
            return Err(ModelError::InvalidContent(self.node_type.name().to_string()));
        }
        // A legal mark set must survive re-adding each member: canonical
        // order, no duplicates, no mutually excluding pairs.
        let mut rebuilt: Vec<Mark> = Vec::new();
        for mark in &self.marks {
            rebuilt = mark.add_to_set(&rebuilt);
        }
        if !Mark::same_set(&rebuilt, &self.marks) {
            return Err(ModelError::DisallowedMark(
                self.node_type.name().to_string(),
                self.marks
                    .first()
                    .map(|m| m.mark_type().name().to_string())
                    .unwrap_or_default(),
            ));
        }
        for child in self.content.children() {
            child.check()?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), Value::String(self.node_type.name().to_string()));
        if !self.attrs.is_empty() {
            obj.insert(
                "attrs".into(),
                Value::Object(self.attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            );
        }
        if let Some((text, _)) = &self.text {
            obj.insert("text".into(), Value::String(text.to_string()));
        } else if self.content.child_count() > 0 {
            obj.insert("content".into(), self.content.to_json());
        }
        if !self.marks.is_empty() {
            obj.insert(
                "marks".into(),
                Value::Array(self.marks.iter().map(Mark::to_json).collect()),
            );
        }
        Value::Object(obj)
    }

    pub fn from_json(schema: &Schema, json: &Value) -> Result<Node, ModelError> {
        let obj = json
            .as_object()
            .ok_or_else(|| ModelError::InvalidJson("node must be an object".into()))?;
        let type_name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::InvalidJson("node is missing its type".into()))?;
        let node_type = schema
            .node_type(type_name)
            .ok_or_else(|| ModelError::UnknownNodeType(type_name.to_string()))?;
        let marks = match obj.get("marks") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| Mark::from_json(schema, item))
                .collect::<Result<Vec<Mark>, ModelError>>()?,
            Some(_) => {
                return Err(ModelError::InvalidJson("node marks must be an array".into()))
            }
            None => Vec::new(),
        };
        if node_type.is_text() {
            let text = obj
                .get("text")
                .and_then(Value::as_str)
                .ok_or(ModelError::EmptyText)?;
            if text.is_empty() {
                return Err(ModelError::EmptyText);
            }
            return Ok(schema.text(text, marks));
        }
        let attrs = match obj.get("attrs") {
            Some(Value::Object(map)) => {
                Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Attrs>())
            }
            Some(_) => return Err(ModelError::InvalidJson("node attrs must be an object".into())),
            None => None,
        };
        let content = match obj.get("content") {
            Some(value) => Fragment::from_json(schema, value)?,
            None => Fragment::default(),
        };
        let node = node_type.create(attrs.as_ref(), content, marks)?;
        Ok(node)
    }
}
