//! Edit steps: atomic, invertible, mappable document updates.
//!
//! A [`Step`] is a small value describing one update. Applying it to the
//! document it was made for yields a new document; [`Step::invert`] against
//! that same document yields the undo step; [`Step::map`] rebases it over
//! other people's changes. The JSON encoding is the wire format for
//! collaboration, tagged by `stepType`.

use serde_json::{Map, Value};
use thiserror::Error;

use vellum_model::{ModelError, Node, ReplaceError, ResolveError, Schema, Slice};

use crate::attr_step::{AttrStep, DocAttrStep};
use crate::map::{Mappable, StepMap};
use crate::mark_step::{AddMarkStep, AddNodeMarkStep, RemoveMarkStep, RemoveNodeMarkStep};
use crate::replace_step::{ReplaceAroundStep, ReplaceStep};

/// Inverting a step against a document it was not applied to.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("no node at position {0}")]
    NoNodeAt(usize),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Replace(#[from] ReplaceError),
}

/// Decoding a step from JSON.
#[derive(Debug, Error)]
pub enum StepJsonError {
    #[error("invalid step JSON: {0}")]
    InvalidJson(String),

    #[error("unknown step type '{0}'")]
    UnknownStepType(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Outcome of applying a step. Failure is a value, not an error: a rebased
/// step landing on content that no longer fits is normal.
#[derive(Debug)]
pub enum StepResult {
    Ok(Node),
    Failed(String),
}

impl StepResult {
    /// Apply a replace and fold both resolution and fitting problems into a
    /// failure value.
    pub fn from_replace(doc: &Node, from: usize, to: usize, slice: &Slice) -> StepResult {
        match doc.replace(from, to, slice) {
            Ok(doc) => StepResult::Ok(doc),
            Err(err) => StepResult::Failed(err.to_string()),
        }
    }

    pub fn fail(message: impl Into<String>) -> StepResult {
        StepResult::Failed(message.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StepResult::Ok(_))
    }

    pub fn into_doc(self) -> Result<Node, String> {
        match self {
            StepResult::Ok(doc) => Ok(doc),
            StepResult::Failed(message) => Err(message),
        }
    }
}

/// One atomic document update.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Replace(ReplaceStep),
    ReplaceAround(ReplaceAroundStep),
    AddMark(AddMarkStep),
    RemoveMark(RemoveMarkStep),
    AddNodeMark(AddNodeMarkStep),
    RemoveNodeMark(RemoveNodeMarkStep),
    Attr(AttrStep),
    DocAttr(DocAttrStep),
}

impl Step {
    /// Apply this step to a document.
    pub fn apply(&self, doc: &Node) -> StepResult {
        match self {
            Step::Replace(s) => s.apply(doc),
            Step::ReplaceAround(s) => s.apply(doc),
            Step::AddMark(s) => s.apply(doc),
            Step::RemoveMark(s) => s.apply(doc),
            Step::AddNodeMark(s) => s.apply(doc),
            Step::RemoveNodeMark(s) => s.apply(doc),
            Step::Attr(s) => s.apply(doc),
            Step::DocAttr(s) => s.apply(doc),
        }
    }

    /// The position map describing this step's changes.
    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace(s) => s.get_map(),
            Step::ReplaceAround(s) => s.get_map(),
            _ => StepMap::empty(),
        }
    }

    /// The step that undoes this one. `doc` must be the document this step
    /// was applied to.
    pub fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        match self {
            Step::Replace(s) => s.invert(doc),
            Step::ReplaceAround(s) => s.invert(doc),
            Step::AddMark(s) => Ok(s.invert()),
            Step::RemoveMark(s) => Ok(s.invert()),
            Step::AddNodeMark(s) => s.invert(doc),
            Step::RemoveNodeMark(s) => s.invert(doc),
            Step::Attr(s) => s.invert(doc),
            Step::DocAttr(s) => s.invert(doc),
        }
    }

    /// Rebase this step over other changes. `None` when the content it
    /// applied to is gone.
    pub fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        match self {
            Step::Replace(s) => s.map(mapping),
            Step::ReplaceAround(s) => s.map(mapping),
            Step::AddMark(s) => s.map(mapping),
            Step::RemoveMark(s) => s.map(mapping),
            Step::AddNodeMark(s) => s.map(mapping),
            Step::RemoveNodeMark(s) => s.map(mapping),
            Step::Attr(s) => s.map(mapping),
            Step::DocAttr(s) => Some(Step::DocAttr(s.clone())),
        }
    }

    /// Try to fold two adjacent steps into one.
    pub fn merge(&self, other: &Step) -> Option<Step> {
        match (self, other) {
            (Step::Replace(a), Step::Replace(b)) => a.merge(b),
            (Step::AddMark(a), Step::AddMark(b)) => a.merge(b),
            (Step::RemoveMark(a), Step::RemoveMark(b)) => a.merge(b),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Step::Replace(s) => s.to_json(),
            Step::ReplaceAround(s) => s.to_json(),
            Step::AddMark(s) => s.to_json("addMark"),
            Step::RemoveMark(s) => s.to_json("removeMark"),
            Step::AddNodeMark(s) => s.to_json("addNodeMark"),
            Step::RemoveNodeMark(s) => s.to_json("removeNodeMark"),
            Step::Attr(s) => s.to_json(),
            Step::DocAttr(s) => s.to_json(),
        }
    }

    pub fn from_json(schema: &Schema, json: &Value) -> Result<Step, StepJsonError> {
        let obj = json
            .as_object()
            .ok_or_else(|| StepJsonError::InvalidJson("step must be an object".into()))?;
        let step_type = obj
            .get("stepType")
            .and_then(Value::as_str)
            .ok_or_else(|| StepJsonError::InvalidJson("step is missing stepType".into()))?;
        match step_type {
            "replace" => ReplaceStep::from_json(schema, obj).map(Step::Replace),
            "replaceAround" => ReplaceAroundStep::from_json(schema, obj).map(Step::ReplaceAround),
            "addMark" => AddMarkStep::from_json(schema, obj).map(Step::AddMark),
            "removeMark" => RemoveMarkStep::from_json(schema, obj).map(Step::RemoveMark),
            "addNodeMark" => AddNodeMarkStep::from_json(schema, obj).map(Step::AddNodeMark),
            "removeNodeMark" => {
                RemoveNodeMarkStep::from_json(schema, obj).map(Step::RemoveNodeMark)
            }
            "attr" => AttrStep::from_json(obj).map(Step::Attr),
            "docAttr" => DocAttrStep::from_json(obj).map(Step::DocAttr),
            other => Err(StepJsonError::UnknownStepType(other.to_string())),
        }
    }
}

pub(crate) fn get_usize(obj: &Map<String, Value>, field: &str) -> Result<usize, StepJsonError> {
    obj.get(field)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .ok_or_else(|| {
            StepJsonError::InvalidJson(format!("missing or non-integer field '{field}'"))
        })
}
