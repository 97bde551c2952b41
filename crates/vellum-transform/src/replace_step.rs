//! The two replace step variants.

use serde_json::{Map, Value};

use vellum_model::{Node, Slice};

use crate::map::{Mappable, StepMap};
use crate::step::{get_usize, Step, StepError, StepJsonError, StepResult};

/// Replace `[from, to)` with a slice.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceStep {
    pub from: usize,
    pub to: usize,
    pub slice: Slice,
    /// Structural steps promise not to overwrite content: they only touch
    /// boundary tokens, and refuse to apply when actual content sits in the
    /// replaced range. Lets split/join steps stay valid after rebasing.
    pub structure: bool,
}

impl ReplaceStep {
    pub fn new(from: usize, to: usize, slice: Slice) -> ReplaceStep {
        ReplaceStep { from, to, slice, structure: false }
    }

    pub fn structural(from: usize, to: usize, slice: Slice) -> ReplaceStep {
        ReplaceStep { from, to, slice, structure: true }
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        if self.structure && content_between(doc, self.from, self.to) {
            return StepResult::fail("structure replace would overwrite content");
        }
        StepResult::from_replace(doc, self.from, self.to, &self.slice)
    }

    pub(crate) fn get_map(&self) -> StepMap {
        StepMap::new(vec![self.from, self.to - self.from, self.slice.size()])
    }

    pub(crate) fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        let slice = doc.slice(self.from, self.to, false)?;
        Ok(Step::Replace(ReplaceStep::new(
            self.from,
            self.from + self.slice.size(),
            slice,
        )))
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        if from.deleted_across() && to.deleted_across() {
            return None;
        }
        Some(Step::Replace(ReplaceStep {
            from: from.pos(),
            to: from.pos().max(to.pos()),
            slice: self.slice.clone(),
            structure: self.structure,
        }))
    }

    pub(crate) fn merge(&self, other: &ReplaceStep) -> Option<Step> {
        if self.structure || other.structure {
            return None;
        }
        if self.from + self.slice.size() == other.from
            && self.slice.open_end() == 0
            && other.slice.open_start() == 0
        {
            let slice = if self.slice.size() + other.slice.size() == 0 {
                Slice::default()
            } else {
                Slice::new(
                    self.slice.content().append(other.slice.content().clone()),
                    self.slice.open_start(),
                    other.slice.open_end(),
                )
            };
            Some(Step::Replace(ReplaceStep::new(
                self.from,
                self.to + (other.to - other.from),
                slice,
            )))
        } else if other.to == self.from
            && self.slice.open_start() == 0
            && other.slice.open_end() == 0
        {
            let slice = if self.slice.size() + other.slice.size() == 0 {
                Slice::default()
            } else {
                Slice::new(
                    other.slice.content().append(self.slice.content().clone()),
                    other.slice.open_start(),
                    self.slice.open_end(),
                )
            };
            Some(Step::Replace(ReplaceStep::new(other.from, self.to, slice)))
        } else {
            None
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String("replace".into()));
        obj.insert("from".into(), Value::from(self.from as u64));
        obj.insert("to".into(), Value::from(self.to as u64));
        if self.slice.size() > 0 || self.slice.content().child_count() > 0 {
            obj.insert("slice".into(), self.slice.to_json());
        }
        if self.structure {
            obj.insert("structure".into(), Value::Bool(true));
        }
        Value::Object(obj)
    }

    pub(crate) fn from_json(
        schema: &vellum_model::Schema,
        obj: &Map<String, Value>,
    ) -> Result<ReplaceStep, StepJsonError> {
        let from = get_usize(obj, "from")?;
        let to = get_usize(obj, "to")?;
        if to < from {
            return Err(StepJsonError::InvalidJson("replace step with to < from".into()));
        }
        let slice = match obj.get("slice") {
            Some(value) => Slice::from_json(schema, value)?,
            None => Slice::default(),
        };
        let structure = obj.get("structure").and_then(Value::as_bool).unwrap_or(false);
        Ok(ReplaceStep { from, to, slice, structure })
    }
}

/// Replace the range around a preserved gap: `[from, gapFrom)` and
/// `[gapTo, to)` are replaced by the slice, while the gap's content is moved
/// into the slice at offset `insert`. This is how wrapping, lifting, and
/// markup changes keep the wrapped content untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceAroundStep {
    pub from: usize,
    pub to: usize,
    pub gap_from: usize,
    pub gap_to: usize,
    pub slice: Slice,
    /// Offset in the slice where the gap's content goes.
    pub insert: usize,
    pub structure: bool,
}

impl ReplaceAroundStep {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        from: usize,
        to: usize,
        gap_from: usize,
        gap_to: usize,
        slice: Slice,
        insert: usize,
        structure: bool,
    ) -> ReplaceAroundStep {
        ReplaceAroundStep { from, to, gap_from, gap_to, slice, insert, structure }
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        if self.structure
            && (content_between(doc, self.from, self.gap_from)
                || content_between(doc, self.gap_to, self.to))
        {
            return StepResult::fail("structure gap-replace would overwrite content");
        }
        let gap = match doc.slice(self.gap_from, self.gap_to, false) {
            Ok(gap) => gap,
            Err(err) => return StepResult::Failed(err.to_string()),
        };
        if gap.open_start() > 0 || gap.open_end() > 0 {
            return StepResult::fail("gap is not a flat range");
        }
        let inserted = match self.slice.insert_at(self.insert, gap.content().clone()) {
            Some(inserted) => inserted,
            None => return StepResult::fail("content does not fit in gap"),
        };
        StepResult::from_replace(doc, self.from, self.to, &inserted)
    }

    pub(crate) fn get_map(&self) -> StepMap {
        StepMap::new(vec![
            self.from,
            self.gap_from - self.from,
            self.insert,
            self.gap_to,
            self.to - self.gap_to,
            self.slice.size() - self.insert,
        ])
    }

    pub(crate) fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        let gap = self.gap_to - self.gap_from;
        let slice = doc
            .slice(self.from, self.to, false)?
            .remove_between(self.gap_from - self.from, self.gap_to - self.from)?;
        Ok(Step::ReplaceAround(ReplaceAroundStep {
            from: self.from,
            to: self.from + self.slice.size() + gap,
            gap_from: self.from + self.insert,
            gap_to: self.from + self.insert + gap,
            slice,
            insert: self.gap_from - self.from,
            structure: self.structure,
        }))
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        let gap_from = if self.from == self.gap_from {
            from.pos()
        } else {
            mapping.map(self.gap_from, -1)
        };
        let gap_to = if self.to == self.gap_to {
            to.pos()
        } else {
            mapping.map(self.gap_to, 1)
        };
        if (from.deleted_across() && to.deleted_across())
            || gap_from < from.pos()
            || gap_to > to.pos()
        {
            return None;
        }
        Some(Step::ReplaceAround(ReplaceAroundStep {
            from: from.pos(),
            to: to.pos(),
            gap_from,
            gap_to,
            slice: self.slice.clone(),
            insert: self.insert,
            structure: self.structure,
        }))
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".into(), Value::String("replaceAround".into()));
        obj.insert("from".into(), Value::from(self.from as u64));
        obj.insert("to".into(), Value::from(self.to as u64));
        obj.insert("gapFrom".into(), Value::from(self.gap_from as u64));
        obj.insert("gapTo".into(), Value::from(self.gap_to as u64));
        obj.insert("insert".into(), Value::from(self.insert as u64));
        if self.slice.size() > 0 || self.slice.content().child_count() > 0 {
            obj.insert("slice".into(), self.slice.to_json());
        }
        if self.structure {
            obj.insert("structure".into(), Value::Bool(true));
        }
        Value::Object(obj)
    }

    pub(crate) fn from_json(
        schema: &vellum_model::Schema,
        obj: &Map<String, Value>,
    ) -> Result<ReplaceAroundStep, StepJsonError> {
        let from = get_usize(obj, "from")?;
        let to = get_usize(obj, "to")?;
        let gap_from = get_usize(obj, "gapFrom")?;
        let gap_to = get_usize(obj, "gapTo")?;
        let insert = get_usize(obj, "insert")?;
        if gap_from < from || gap_to < gap_from || to < gap_to {
            return Err(StepJsonError::InvalidJson(
                "replace-around step with misordered positions".into(),
            ));
        }
        let slice = match obj.get("slice") {
            Some(value) => Slice::from_json(schema, value)?,
            None => Slice::default(),
        };
        if insert > slice.size() {
            return Err(StepJsonError::InvalidJson(
                "replace-around insert offset outside slice".into(),
            ));
        }
        let structure = obj.get("structure").and_then(Value::as_bool).unwrap_or(false);
        Ok(ReplaceAroundStep { from, to, gap_from, gap_to, slice, insert, structure })
    }
}

/// Whether actual content (rather than just boundary tokens) sits between
/// two positions.
fn content_between(doc: &Node, from: usize, to: usize) -> bool {
    let from_pos = match doc.resolve(from) {
        Ok(pos) => pos,
        Err(_) => return true,
    };
    let mut dist = to - from;
    let mut depth = from_pos.depth();
    while dist > 0
        && depth > 0
        && from_pos.index_after(depth) == from_pos.node(depth).child_count()
    {
        depth -= 1;
        dist -= 1;
    }
    if dist > 0 {
        let mut next = from_pos
            .node(depth)
            .maybe_child(from_pos.index_after(depth))
            .cloned();
        while dist > 0 {
            match next {
                Some(node) if !node.is_leaf() => {
                    next = node.first_child().cloned();
                    dist -= 1;
                }
                _ => return true,
            }
        }
    }
    false
}
