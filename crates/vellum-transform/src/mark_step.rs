//! Mark steps: adding and removing marks over ranges and on single nodes.

use serde_json::{Map, Value};

use vellum_model::{Fragment, Mark, Node, Schema, Slice};

use crate::map::Mappable;
use crate::step::{get_usize, Step, StepError, StepJsonError, StepResult};

/// Apply `f` to every inline node in the fragment, recursing into children
/// first. `parent` is passed along so `f` can consult mark constraints.
fn map_fragment(
    fragment: &Fragment,
    f: &impl Fn(&Node, &Node) -> Node,
    parent: &Node,
) -> Fragment {
    let mut mapped = Vec::with_capacity(fragment.child_count());
    for child in fragment.children() {
        let mut child = child.clone();
        if child.content().size() > 0 {
            let inner = map_fragment(child.content(), f, &child);
            child = child.copy(inner);
        }
        if child.is_inline() {
            child = f(&child, parent);
        }
        mapped.push(child);
    }
    Fragment::from_vec(mapped)
}

fn mark_json(
    schema: &Schema,
    obj: &Map<String, Value>,
) -> Result<Mark, StepJsonError> {
    let value = obj
        .get("mark")
        .ok_or_else(|| StepJsonError::InvalidJson("mark step without a mark".into()))?;
    Ok(Mark::from_json(schema, value)?)
}

/// Add a mark to all inline content in `[from, to)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AddMarkStep {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

impl AddMarkStep {
    pub fn new(from: usize, to: usize, mark: Mark) -> AddMarkStep {
        AddMarkStep { from, to, mark }
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        let old_slice = match doc.slice(self.from, self.to, false) {
            Ok(slice) => slice,
            Err(err) => return StepResult::Failed(err.to_string()),
        };
        let from_pos = match doc.resolve(self.from) {
            Ok(pos) => pos,
            Err(err) => return StepResult::Failed(err.to_string()),
        };
        let parent = from_pos.node(from_pos.shared_depth(self.to));
        let content = map_fragment(
            old_slice.content(),
            &|node, parent| {
                if !node.is_leaf() || !parent.node_type().allows_mark_type(self.mark.mark_type())
                {
                    return node.clone();
                }
                node.mark(self.mark.add_to_set(node.marks()))
            },
            parent,
        );
        let slice = Slice::new(content, old_slice.open_start(), old_slice.open_end());
        StepResult::from_replace(doc, self.from, self.to, &slice)
    }

    pub(crate) fn invert(&self) -> Step {
        Step::RemoveMark(RemoveMarkStep::new(self.from, self.to, self.mark.clone()))
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        if (from.deleted() && to.deleted()) || from.pos() >= to.pos() {
            return None;
        }
        Some(Step::AddMark(AddMarkStep::new(from.pos(), to.pos(), self.mark.clone())))
    }

    pub(crate) fn merge(&self, other: &AddMarkStep) -> Option<Step> {
        if self.mark == other.mark && self.from <= other.to && self.to >= other.from {
            return Some(Step::AddMark(AddMarkStep::new(
                self.from.min(other.from),
                self.to.max(other.to),
                self.mark.clone(),
            )));
        }
        None
    }

    pub(crate) fn to_json(&self, step_type: &str) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String(step_type.into()));
        obj.insert("mark".into(), self.mark.to_json());
        obj.insert("from".into(), Value::from(self.from as u64));
        obj.insert("to".into(), Value::from(self.to as u64));
        Value::Object(obj)
    }

    pub(crate) fn from_json(
        schema: &Schema,
        obj: &Map<String, Value>,
    ) -> Result<AddMarkStep, StepJsonError> {
        Ok(AddMarkStep {
            from: get_usize(obj, "from")?,
            to: get_usize(obj, "to")?,
            mark: mark_json(schema, obj)?,
        })
    }
}

/// Remove a mark from all inline content in `[from, to)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveMarkStep {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

impl RemoveMarkStep {
    pub fn new(from: usize, to: usize, mark: Mark) -> RemoveMarkStep {
        RemoveMarkStep { from, to, mark }
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        let old_slice = match doc.slice(self.from, self.to, false) {
            Ok(slice) => slice,
            Err(err) => return StepResult::Failed(err.to_string()),
        };
        let content = map_fragment(
            old_slice.content(),
            &|node, _| node.mark(self.mark.remove_from_set(node.marks())),
            doc,
        );
        let slice = Slice::new(content, old_slice.open_start(), old_slice.open_end());
        StepResult::from_replace(doc, self.from, self.to, &slice)
    }

    pub(crate) fn invert(&self) -> Step {
        Step::AddMark(AddMarkStep::new(self.from, self.to, self.mark.clone()))
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        if (from.deleted() && to.deleted()) || from.pos() >= to.pos() {
            return None;
        }
        Some(Step::RemoveMark(RemoveMarkStep::new(
            from.pos(),
            to.pos(),
            self.mark.clone(),
        )))
    }

    pub(crate) fn merge(&self, other: &RemoveMarkStep) -> Option<Step> {
        if self.mark == other.mark && self.from <= other.to && self.to >= other.from {
            return Some(Step::RemoveMark(RemoveMarkStep::new(
                self.from.min(other.from),
                self.to.max(other.to),
                self.mark.clone(),
            )));
        }
        None
    }

    pub(crate) fn to_json(&self, step_type: &str) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String(step_type.into()));
        obj.insert("mark".into(), self.mark.to_json());
        obj.insert("from".into(), Value::from(self.from as u64));
        obj.insert("to".into(), Value::from(self.to as u64));
        Value::Object(obj)
    }

    pub(crate) fn from_json(
        schema: &Schema,
        obj: &Map<String, Value>,
    ) -> Result<RemoveMarkStep, StepJsonError> {
        Ok(RemoveMarkStep {
            from: get_usize(obj, "from")?,
            to: get_usize(obj, "to")?,
            mark: mark_json(schema, obj)?,
        })
    }
}

/// Rebuild a single node with an updated mark set, keeping its content by
/// replacing only its opening token.
fn update_node_marks(doc: &Node, pos: usize, node: &Node, marks: Vec<Mark>) -> StepResult {
    if node.is_text() {
        return StepResult::fail("node mark steps do not apply to text nodes");
    }
    let updated = match node.node_type().create(Some(node.attrs()), Fragment::default(), marks)
    {
        Ok(updated) => updated,
        Err(err) => return StepResult::Failed(err.to_string()),
    };
    let open_end = if node.is_leaf() { 0 } else { 1 };
    StepResult::from_replace(
        doc,
        pos,
        pos + 1,
        &Slice::new(Fragment::from_node(updated), 0, open_end),
    )
}

/// Add a mark to the node at `pos`.
#[derive(Debug, Clone, PartialEq)]
pub struct AddNodeMarkStep {
    pub pos: usize,
    pub mark: Mark,
}

impl AddNodeMarkStep {
    pub fn new(pos: usize, mark: Mark) -> AddNodeMarkStep {
        AddNodeMarkStep { pos, mark }
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        let node = match doc.node_at(self.pos) {
            Some(node) => node,
            None => return StepResult::fail("no node at mark step's position"),
        };
        update_node_marks(doc, self.pos, &node, self.mark.add_to_set(node.marks()))
    }

    pub(crate) fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        if let Some(node) = doc.node_at(self.pos) {
            let new_set = self.mark.add_to_set(node.marks());
            if new_set.len() == node.marks().len() {
                // The mark was already there, or adding it displaced another
                // one; invert to restore the original set.
                for mark in node.marks() {
                    if !mark.is_in_set(&new_set) {
                        return Ok(Step::AddNodeMark(AddNodeMarkStep::new(
                            self.pos,
                            mark.clone(),
                        )));
                    }
                }
                return Ok(Step::AddNodeMark(self.clone()));
            }
        }
        Ok(Step::RemoveNodeMark(RemoveNodeMarkStep::new(self.pos, self.mark.clone())))
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        let pos = mapping.map_result(self.pos, 1);
        if pos.deleted_after() {
            None
        } else {
            Some(Step::AddNodeMark(AddNodeMarkStep::new(pos.pos(), self.mark.clone())))
        }
    }

    pub(crate) fn to_json(&self, step_type: &str) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String(step_type.into()));
        obj.insert("pos".into(), Value::from(self.pos as u64));
        obj.insert("mark".into(), self.mark.to_json());
        Value::Object(obj)
    }

    pub(crate) fn from_json(
        schema: &Schema,
        obj: &Map<String, Value>,
    ) -> Result<AddNodeMarkStep, StepJsonError> {
        Ok(AddNodeMarkStep { pos: get_usize(obj, "pos")?, mark: mark_json(schema, obj)? })
    }
}

/// Remove a mark from the node at `pos`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveNodeMarkStep {
    pub pos: usize,
    pub mark: Mark,
}

impl RemoveNodeMarkStep {
    pub fn new(pos: usize, mark: Mark) -> RemoveNodeMarkStep {
        RemoveNodeMarkStep { pos, mark }
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        let node = match doc.node_at(self.pos) {
            Some(node) => node,
            None => return StepResult::fail("no node at mark step's position"),
        };
        update_node_marks(doc, self.pos, &node, self.mark.remove_from_set(node.marks()))
    }

    pub(crate) fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        match doc.node_at(self.pos) {
            Some(node) if self.mark.is_in_set(node.marks()) => Ok(Step::AddNodeMark(
                AddNodeMarkStep::new(self.pos, self.mark.clone()),
            )),
            // Removing an absent mark is a no-op; so is its inverse.
            _ => Ok(Step::RemoveNodeMark(self.clone())),
        }
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        let pos = mapping.map_result(self.pos, 1);
        if pos.deleted_after() {
            None
        } else {
            Some(Step::RemoveNodeMark(RemoveNodeMarkStep::new(pos.pos(), self.mark.clone())))
        }
    }

    pub(crate) fn to_json(&self, step_type: &str) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String(step_type.into()));
        obj.insert("pos".into(), Value::from(self.pos as u64));
        obj.insert("mark".into(), self.mark.to_json());
        Value::Object(obj)
    }

    pub(crate) fn from_json(
        schema: &Schema,
        obj: &Map<String, Value>,
    ) -> Result<RemoveNodeMarkStep, StepJsonError> {
        Ok(RemoveNodeMarkStep { pos: get_usize(obj, "pos")?, mark: mark_json(schema, obj)? })
    }
}
