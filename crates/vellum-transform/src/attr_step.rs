//! Attribute steps: update a single attribute on a node or on the document.

use serde_json::{Map, Value};

use vellum_model::{Attrs, Fragment, Node, Slice};

use crate::map::Mappable;
use crate::step::{get_usize, Step, StepError, StepJsonError, StepResult};

fn with_attr(attrs: &Attrs, name: &str, value: Value) -> Attrs {
    let mut updated = attrs.clone();
    updated.insert(name.to_string(), value);
    updated
}

/// Set one attribute on the node at `pos`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrStep {
    pub pos: usize,
    pub attr: String,
    pub value: Value,
}

impl AttrStep {
    pub fn new(pos: usize, attr: impl Into<String>, value: Value) -> AttrStep {
        AttrStep { pos, attr: attr.into(), value }
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        let node = match doc.node_at(self.pos) {
            Some(node) => node,
            None => return StepResult::fail("no node at attribute step's position"),
        };
        if node.is_text() {
            return StepResult::fail("attribute steps do not apply to text nodes");
        }
        let attrs = with_attr(node.attrs(), &self.attr, self.value.clone());
        let updated = match node.node_type().create(
            Some(&attrs),
            Fragment::default(),
            node.marks().to_vec(),
        ) {
            Ok(updated) => updated,
            Err(err) => return StepResult::Failed(err.to_string()),
        };
        // Replacing just the opening token keeps the node's content; the
        // open end joins it back onto the rebuilt node.
        let open_end = if node.is_leaf() { 0 } else { 1 };
        StepResult::from_replace(
            doc,
            self.pos,
            self.pos + 1,
            &Slice::new(Fragment::from_node(updated), 0, open_end),
        )
    }

    pub(crate) fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        let node = doc.node_at(self.pos).ok_or(StepError::NoNodeAt(self.pos))?;
        let old = node.attr(&self.attr).cloned().unwrap_or(Value::Null);
        Ok(Step::Attr(AttrStep::new(self.pos, self.attr.clone(), old)))
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        let pos = mapping.map_result(self.pos, 1);
        if pos.deleted_after() {
            None
        } else {
            Some(Step::Attr(AttrStep::new(pos.pos(), self.attr.clone(), self.value.clone())))
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String("attr".into()));
        obj.insert("pos".into(), Value::from(self.pos as u64));
        obj.insert("attr".into(), Value::String(self.attr.clone()));
        obj.insert("value".into(), self.value.clone());
        Value::Object(obj)
    }

    pub(crate) fn from_json(obj: &Map<String, Value>) -> Result<AttrStep, StepJsonError> {
        let attr = obj
            .get("attr")
            .and_then(Value::as_str)
            .ok_or_else(|| StepJsonError::InvalidJson("attr step without attr name".into()))?;
        let value = obj
            .get("value")
            .cloned()
            .ok_or_else(|| StepJsonError::InvalidJson("attr step without value".into()))?;
        Ok(AttrStep::new(get_usize(obj, "pos")?, attr, value))
    }
}

/// Set one attribute on the document node itself, which position maps cannot
/// reach.
#[derive(Debug, Clone, PartialEq)]
pub struct DocAttrStep {
    pub attr: String,
    pub value: Value,
}

impl DocAttrStep {
    pub fn new(attr: impl Into<String>, value: Value) -> DocAttrStep {
        DocAttrStep { attr: attr.into(), value }
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        let attrs = with_attr(doc.attrs(), &self.attr, self.value.clone());
        match doc.node_type().create(
            Some(&attrs),
            doc.content().clone(),
            doc.marks().to_vec(),
        ) {
            Ok(updated) => StepResult::Ok(updated),
            Err(err) => StepResult::Failed(err.to_string()),
        }
    }

    pub(crate) fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        let old = doc.attr(&self.attr).cloned().unwrap_or(Value::Null);
        Ok(Step::DocAttr(DocAttrStep::new(self.attr.clone(), old)))
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String("docAttr".into()));
        obj.insert("attr".into(), Value::String(self.attr.clone()));
        obj.insert("value".into(), self.value.clone());
        Value::Object(obj)
    }

    pub(crate) fn from_json(obj: &Map<String, Value>) -> Result<DocAttrStep, StepJsonError> {
        let attr = obj
            .get("attr")
            .and_then(Value::as_str)
            .ok_or_else(|| StepJsonError::InvalidJson("docAttr step without attr name".into()))?;
        let value = obj
            .get("value")
            .cloned()
            .ok_or_else(|| StepJsonError::InvalidJson("docAttr step without value".into()))?;
        Ok(DocAttrStep::new(attr, value))
    }
}
