//! The transform orchestrator: accumulates steps against a document and
//! keeps the corresponding position mapping.

use serde_json::Value;
use thiserror::Error;

use vellum_model::{
    Attrs, ContentMatch, Fragment, Mark, MarkType, Node, NodeRange, NodeType, ResolveError,
    ResolvedPos, Slice,
};

use crate::attr_step::{AttrStep, DocAttrStep};
use crate::fit::{fits_trivially, replace_step};
use crate::map::Mapping;
use crate::mark_step::{AddMarkStep, AddNodeMarkStep, RemoveMarkStep, RemoveNodeMarkStep};
use crate::replace_step::{ReplaceAroundStep, ReplaceStep};
use crate::step::{Step, StepResult};
use crate::structure::{self, Wrapper};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("step failed: {0}")]
    StepFailed(String),
    #[error("no node at position {0}")]
    NoNodeAt(usize),
    #[error("{0} is not a textblock type")]
    NotTextblock(String),
    #[error("invalid content: {0}")]
    InvalidContent(String),
    #[error("wrappers do not form valid content inside {0}")]
    CannotWrap(String),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// A sequence of steps applied to a document, together with the documents
/// they produced and the accumulated position mapping.
pub struct Transform {
    doc: Node,
    steps: Vec<Step>,
    docs: Vec<Node>,
    mapping: Mapping,
}

impl Transform {
    pub fn new(doc: Node) -> Transform {
        Transform { doc, steps: Vec::new(), docs: Vec::new(), mapping: Mapping::default() }
    }

    /// The current document, with all steps applied.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The document the transform started from.
    pub fn before(&self) -> &Node {
        self.docs.first().unwrap_or(&self.doc)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The document each step started from, parallel to `steps`.
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Apply a step, failing the whole transform when it does not apply.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, TransformError> {
        match self.maybe_step(step) {
            StepResult::Ok(_) => Ok(self),
            StepResult::Failed(message) => Err(TransformError::StepFailed(message)),
        }
    }

    /// Apply a step, reporting failure in the result instead of erroring.
    pub fn maybe_step(&mut self, step: Step) -> StepResult {
        let result = step.apply(&self.doc);
        if let StepResult::Ok(doc) = &result {
            self.add_step(step, doc.clone());
        }
        result
    }

    fn add_step(&mut self, step: Step, doc: Node) {
        self.docs.push(std::mem::replace(&mut self.doc, doc));
        self.mapping.append_map(step.get_map(), None);
        self.steps.push(step);
    }

    /// Replace `[from, to)` with a slice, fitting the slice's open sides
    /// into the surrounding structure. Does nothing when the replacement is
    /// a no-op.
    pub fn replace(
        &mut self,
        from: usize,
        to: usize,
        slice: Slice,
    ) -> Result<&mut Self, TransformError> {
        if let Some(step) = replace_step(&self.doc, from, to, slice)? {
            self.step(step)?;
        }
        Ok(self)
    }

    pub fn replace_with(
        &mut self,
        from: usize,
        to: usize,
        content: Fragment,
    ) -> Result<&mut Self, TransformError> {
        self.replace(from, to, Slice::new(content, 0, 0))
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        self.replace(from, to, Slice::default())
    }

    pub fn insert(
        &mut self,
        pos: usize,
        content: Fragment,
    ) -> Result<&mut Self, TransformError> {
        self.replace_with(pos, pos, content)
    }

    /// Replace a range, being smarter about it than plain `replace`: expands
    /// the replaced range or closes the slice when that lets the content fit
    /// better, so that e.g. pasting a paragraph over a selection inside a
    /// paragraph merges the content rather than nesting it.
    pub fn replace_range(
        &mut self,
        from: usize,
        to: usize,
        slice: Slice,
    ) -> Result<&mut Self, TransformError> {
        if slice.size() == 0 && slice.content().child_count() == 0 {
            return self.delete_range(from, to);
        }
        let from_pos = self.doc.resolve(from)?;
        let to_pos = self.doc.resolve(to)?;
        if fits_trivially(&from_pos, &to_pos, &slice) {
            return self.step(Step::Replace(ReplaceStep::new(from, to, slice)));
        }
        let mut target_depths: Vec<i64> =
            covered_depths(&from_pos, &to_pos).into_iter().map(|d| d as i64).collect();
        // The whole document cannot be a replace target.
        if target_depths.last() == Some(&0) {
            target_depths.pop();
        }
        // Negative entries mean replacing from before(-d) to the original
        // `to` rather than expanding over the whole node at that depth.
        let mut preferred_target = -(from_pos.depth() as i64 + 1);
        target_depths.insert(0, preferred_target);
        let mut pos = from_pos.pos() as i64 - 1;
        for d in (1..=from_pos.depth()).rev() {
            if from_pos.node(d).node_type().is_defining() {
                break;
            }
            if target_depths.contains(&(d as i64)) {
                preferred_target = d as i64;
            } else if from_pos.before(d).map(|b| b as i64) == Some(pos) {
                target_depths.insert(1, -(d as i64));
            }
            pos -= 1;
        }
        let preferred_target_index = target_depths
            .iter()
            .position(|&t| t == preferred_target)
            .unwrap_or(0);

        let mut left_nodes: Vec<Node> = Vec::new();
        let mut content = slice.content().clone();
        for i in 0..=slice.open_start() {
            let node = match content.first_child() {
                Some(node) => node.clone(),
                None => break,
            };
            left_nodes.push(node.clone());
            if i == slice.open_start() {
                break;
            }
            content = node.content().clone();
        }

        // Back preferred_depth up over defining nodes directly above it, so
        // that e.g. pasting a blockquote keeps the blockquote.
        let mut preferred_depth = slice.open_start() as i64;
        let mut d = preferred_depth - 1;
        while d >= 0 {
            let left_node = &left_nodes[d as usize];
            let defining = left_node.node_type().is_defining();
            let anchor = (preferred_target.unsigned_abs() as usize) - 1;
            if defining && !left_node.same_markup(from_pos.node(anchor)) {
                preferred_depth = d;
            } else if defining || !left_node.node_type().is_textblock() {
                break;
            }
            d -= 1;
        }

        // Try each open depth of the slice against each target depth,
        // starting from the preferred combination.
        for j in (0..=slice.open_start()).rev() {
            let open_depth =
                ((j as i64 + preferred_depth + 1) % (slice.open_start() as i64 + 1)) as usize;
            let insert = match left_nodes.get(open_depth) {
                Some(node) => node,
                None => continue,
            };
            for i in 0..target_depths.len() {
                let raw = target_depths[(i + preferred_target_index) % target_depths.len()];
                let (target_depth, expand) =
                    if raw < 0 { ((-raw) as usize, false) } else { (raw as usize, true) };
                let parent = from_pos.node(target_depth - 1);
                let index = from_pos.index(target_depth - 1);
                if parent.can_replace_with(index, index, insert.node_type())
                    && parent.node_type().allows_marks(insert.marks())
                {
                    let content = close_fragment(
                        slice.content().clone(),
                        0,
                        slice.open_start(),
                        open_depth,
                        None,
                    );
                    let new_from = from_pos.before(target_depth).unwrap_or(from);
                    let new_to = if expand {
                        to_pos.after(target_depth).unwrap_or(to)
                    } else {
                        to
                    };
                    return self.replace(
                        new_from,
                        new_to,
                        Slice::new(content, open_depth, slice.open_end()),
                    );
                }
            }
        }

        // Nothing fit directly; fall back to plain replaces over widening
        // ranges until one produces a step.
        let start_steps = self.steps.len();
        let mut from = from;
        let mut to = to;
        for i in (0..target_depths.len()).rev() {
            self.replace(from, to, slice.clone())?;
            if self.steps.len() > start_steps {
                break;
            }
            let depth = target_depths[i];
            if depth < 0 {
                continue;
            }
            from = from_pos.before(depth as usize).unwrap_or(from);
            to = to_pos.after(depth as usize).unwrap_or(to);
        }
        Ok(self)
    }

    /// Replace a range with a single node, moving a block node to a position
    /// where it fits when the range is empty.
    pub fn replace_range_with(
        &mut self,
        from: usize,
        to: usize,
        node: Node,
    ) -> Result<&mut Self, TransformError> {
        let mut from = from;
        let mut to = to;
        if !node.is_inline()
            && from == to
            && self.doc.resolve(from)?.parent().content().size() > 0
        {
            if let Some(point) = structure::insert_point(&self.doc, from, node.node_type()) {
                from = point;
                to = point;
            }
        }
        self.replace_range(from, to, Slice::new(Fragment::from_node(node), 0, 0))
    }

    /// Delete a range, expanding it to cover fully covered parent nodes so
    /// that no empty shells are left behind.
    pub fn delete_range(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        let from_pos = self.doc.resolve(from)?;
        let to_pos = self.doc.resolve(to)?;
        let covered = covered_depths(&from_pos, &to_pos);
        for (i, &depth) in covered.iter().enumerate() {
            let last = i == covered.len() - 1;
            if (last && depth == 0)
                || from_pos.node(depth).node_type().content_match().valid_end()
            {
                return self.delete(from_pos.start(depth), to_pos.end(depth));
            }
            if depth > 0
                && (last
                    || from_pos.node(depth - 1).can_replace(
                        from_pos.index(depth - 1),
                        to_pos.index_after(depth - 1),
                        &Fragment::default(),
                    ))
            {
                return self
                    .delete(from_pos.before(depth).unwrap_or(from), to_pos.after(depth).unwrap_or(to));
            }
        }
        // A range ending past a textblock's end but starting at its start
        // deletes the whole block.
        for d in 1..=from_pos.depth().min(to_pos.depth()) {
            if from - from_pos.start(d) == from_pos.depth() - d
                && to > from_pos.end(d)
                && to_pos.end(d) - to != to_pos.depth() - d
                && from_pos.start(d - 1) == to_pos.start(d - 1)
                && from_pos.node(d - 1).can_replace(
                    from_pos.index(d - 1),
                    to_pos.index(d - 1),
                    &Fragment::default(),
                )
            {
                return self.delete(from_pos.before(d).unwrap_or(from), to);
            }
        }
        self.delete(from, to)
    }

    /// Add a mark to all inline content in the range, skipping nodes whose
    /// parent does not allow it.
    pub fn add_mark(
        &mut self,
        from: usize,
        to: usize,
        mark: Mark,
    ) -> Result<&mut Self, TransformError> {
        let mut removed: Vec<RemoveMarkStep> = Vec::new();
        let mut added: Vec<AddMarkStep> = Vec::new();
        self.doc.nodes_between(from, to, &mut |node, pos, parent, _| {
            if !node.is_inline() {
                return true;
            }
            let marks = node.marks();
            let allowed = parent
                .map(|p| p.node_type().allows_mark_type(mark.mark_type()))
                .unwrap_or(false);
            if !mark.is_in_set(marks) && allowed {
                let start = pos.max(from);
                let end = (pos + node.node_size()).min(to);
                let new_set = mark.add_to_set(marks);
                for displaced in marks {
                    if !displaced.is_in_set(&new_set) {
                        match removed.last_mut() {
                            Some(last) if last.to == start && last.mark == *displaced => {
                                last.to = end
                            }
                            _ => removed.push(RemoveMarkStep::new(start, end, displaced.clone())),
                        }
                    }
                }
                match added.last_mut() {
                    Some(last) if last.to == start => last.to = end,
                    _ => added.push(AddMarkStep::new(start, end, mark.clone())),
                }
            }
            true
        });
        for step in removed {
            self.step(Step::RemoveMark(step))?;
        }
        for step in added {
            self.step(Step::AddMark(step))?;
        }
        Ok(self)
    }

    /// Remove marks from all inline content in the range. The filter selects
    /// a single mark, every mark of a type, or all marks.
    pub fn remove_mark(
        &mut self,
        from: usize,
        to: usize,
        filter: MarkFilter,
    ) -> Result<&mut Self, TransformError> {
        struct Matched {
            mark: Mark,
            from: usize,
            to: usize,
            step: usize,
        }
        let mut matched: Vec<Matched> = Vec::new();
        let mut visited = 0usize;
        self.doc.nodes_between(from, to, &mut |node, pos, _, _| {
            if !node.is_inline() {
                return true;
            }
            visited += 1;
            let to_remove: Vec<Mark> = match &filter {
                MarkFilter::Mark(mark) => {
                    if mark.is_in_set(node.marks()) {
                        vec![mark.clone()]
                    } else {
                        Vec::new()
                    }
                }
                MarkFilter::Type(mark_type) => {
                    let mut set = node.marks().to_vec();
                    let mut found = Vec::new();
                    while let Some(mark) = mark_type.is_in_set(&set).cloned() {
                        set = mark.remove_from_set(&set);
                        found.push(mark);
                    }
                    found
                }
                MarkFilter::Any => node.marks().to_vec(),
            };
            if !to_remove.is_empty() {
                let end = (pos + node.node_size()).min(to);
                for mark in to_remove {
                    // Extend a range matched on the directly preceding
                    // inline node instead of starting a new one.
                    match matched
                        .iter_mut()
                        .find(|m| m.step == visited - 1 && m.mark == mark)
                    {
                        Some(m) => {
                            m.to = end;
                            m.step = visited;
                        }
                        None => matched.push(Matched {
                            mark,
                            from: pos.max(from),
                            to: end,
                            step: visited,
                        }),
                    }
                }
            }
            true
        });
        for m in matched {
            self.step(Step::RemoveMark(RemoveMarkStep::new(m.from, m.to, m.mark)))?;
        }
        Ok(self)
    }

    /// Remove children and marks of the node at `pos` that would not be
    /// allowed under the given parent type, and fill up its content when the
    /// remainder does not satisfy that type's content expression.
    pub fn clear_incompatible(
        &mut self,
        pos: usize,
        parent_type: &NodeType,
    ) -> Result<&mut Self, TransformError> {
        let node = self.doc.node_at(pos).ok_or(TransformError::NoNodeAt(pos))?;
        let mut matcher = parent_type.content_match();
        let mut repl_steps: Vec<ReplaceStep> = Vec::new();
        let mut cur = pos + 1;
        for i in 0..node.child_count() {
            let child = node.child(i);
            let end = cur + child.node_size();
            match matcher.match_type(child.node_type()) {
                None => repl_steps.push(ReplaceStep::new(cur, end, Slice::default())),
                Some(next) => {
                    matcher = next;
                    for mark in child.marks() {
                        if !parent_type.allows_mark_type(mark.mark_type()) {
                            self.step(Step::RemoveMark(RemoveMarkStep::new(
                                cur,
                                end,
                                mark.clone(),
                            )))?;
                        }
                    }
                }
            }
            cur = end;
        }
        if !matcher.valid_end() {
            let fill = matcher
                .fill_before(&Fragment::default(), true, 0)
                .unwrap_or_default();
            self.replace(cur, cur, Slice::new(fill, 0, 0))?;
        }
        for step in repl_steps.into_iter().rev() {
            self.step(Step::Replace(step))?;
        }
        Ok(self)
    }

    /// Lift the range's content out of its parent, to the given target depth
    /// (as computed by [`structure::lift_target`]).
    pub fn lift(
        &mut self,
        range: &NodeRange,
        target: usize,
    ) -> Result<&mut Self, TransformError> {
        let from_pos = range.from_pos();
        let to_pos = range.to_pos();
        let depth = range.depth();
        let gap_start = range.start();
        let gap_end = range.end();
        let mut start = gap_start;
        let mut end = gap_end;

        let mut before = Fragment::default();
        let mut open_start = 0;
        let mut splitting = false;
        for d in ((target + 1)..=depth).rev() {
            if splitting || from_pos.index(d) > 0 {
                splitting = true;
                before = Fragment::from_node(from_pos.node(d).copy(before));
                open_start += 1;
            } else {
                start -= 1;
            }
        }
        let mut after = Fragment::default();
        let mut open_end = 0;
        let mut splitting = false;
        for d in ((target + 1)..=depth).rev() {
            let past_end =
                to_pos.after(d + 1).map(|a| a < to_pos.end(d)).unwrap_or(false);
            if splitting || past_end {
                splitting = true;
                after = Fragment::from_node(to_pos.node(d).copy(after));
                open_end += 1;
            } else {
                end += 1;
            }
        }
        let insert = before.size() - open_start;
        self.step(Step::ReplaceAround(ReplaceAroundStep::new(
            start,
            end,
            gap_start,
            gap_end,
            Slice::new(before.append(after), open_start, open_end),
            insert,
            true,
        )))
    }

    /// Wrap the range's content in the given chain of node types (as
    /// computed by [`structure::find_wrapping`]), outermost first.
    pub fn wrap(
        &mut self,
        range: &NodeRange,
        wrappers: &[Wrapper],
    ) -> Result<&mut Self, TransformError> {
        let mut content = Fragment::default();
        for wrapper in wrappers.iter().rev() {
            if content.size() > 0 {
                let valid = wrapper
                    .node_type
                    .content_match()
                    .match_fragment(&content)
                    .map(|m| m.valid_end())
                    .unwrap_or(false);
                if !valid {
                    return Err(TransformError::CannotWrap(
                        wrapper.node_type.name().to_string(),
                    ));
                }
            }
            let node = wrapper
                .node_type
                .create(wrapper.attrs.as_ref(), content, Vec::new())
                .map_err(|err| TransformError::InvalidContent(err.to_string()))?;
            content = Fragment::from_node(node);
        }
        let start = range.start();
        let end = range.end();
        self.step(Step::ReplaceAround(ReplaceAroundStep::new(
            start,
            end,
            start,
            end,
            Slice::new(content, 0, 0),
            wrappers.len(),
            true,
        )))
    }

    /// Convert every textblock in the range to the given type, clearing
    /// content the type does not allow.
    pub fn set_block_type(
        &mut self,
        from: usize,
        to: usize,
        node_type: &NodeType,
        attrs: Option<&Attrs>,
    ) -> Result<&mut Self, TransformError> {
        if !node_type.is_textblock() {
            return Err(TransformError::NotTextblock(node_type.name().to_string()));
        }
        let map_from = self.mapping.len();
        let mut targets: Vec<(usize, Node)> = Vec::new();
        self.doc.nodes_between(from, to, &mut |node, pos, _, _| {
            if node.is_textblock() && !node.has_markup(node_type, attrs, &[]) {
                targets.push((pos, node.clone()));
                return false;
            }
            true
        });
        for (pos, node) in targets {
            let mapped = self.mapping.slice(map_from, self.mapping.len()).map(pos, 1);
            if !can_change_type(&self.doc, mapped, node_type) {
                continue;
            }
            self.clear_incompatible(mapped, node_type)?;
            let mapping = self.mapping.slice(map_from, self.mapping.len());
            let start = mapping.map(pos, 1);
            let end = mapping.map(pos + node.node_size(), 1);
            let created = node_type
                .create(attrs, Fragment::default(), node.marks().to_vec())
                .map_err(|err| TransformError::InvalidContent(err.to_string()))?;
            self.step(Step::ReplaceAround(ReplaceAroundStep::new(
                start,
                end,
                start + 1,
                end - 1,
                Slice::new(Fragment::from_node(created), 0, 0),
                1,
                true,
            )))?;
        }
        Ok(self)
    }

    /// Change the type, attributes, or marks of the node at `pos`, keeping
    /// its content.
    pub fn set_node_markup(
        &mut self,
        pos: usize,
        node_type: Option<&NodeType>,
        attrs: Option<&Attrs>,
        marks: Option<Vec<Mark>>,
    ) -> Result<&mut Self, TransformError> {
        let node = self.doc.node_at(pos).ok_or(TransformError::NoNodeAt(pos))?;
        let node_type = node_type.unwrap_or_else(|| node.node_type());
        let new_node = node_type
            .create(attrs, Fragment::default(), marks.unwrap_or_else(|| node.marks().to_vec()))
            .map_err(|err| TransformError::InvalidContent(err.to_string()))?;
        if node.is_leaf() {
            return self.replace_with(pos, pos + node.node_size(), Fragment::from_node(new_node));
        }
        if !node_type.valid_content(node.content()) {
            return Err(TransformError::InvalidContent(node_type.name().to_string()));
        }
        self.step(Step::ReplaceAround(ReplaceAroundStep::new(
            pos,
            pos + node.node_size(),
            pos + 1,
            pos + node.node_size() - 1,
            Slice::new(Fragment::from_node(new_node), 0, 0),
            1,
            true,
        )))
    }

    pub fn set_node_attribute(
        &mut self,
        pos: usize,
        attr: impl Into<String>,
        value: Value,
    ) -> Result<&mut Self, TransformError> {
        self.step(Step::Attr(AttrStep::new(pos, attr, value)))
    }

    pub fn set_doc_attribute(
        &mut self,
        attr: impl Into<String>,
        value: Value,
    ) -> Result<&mut Self, TransformError> {
        self.step(Step::DocAttr(DocAttrStep::new(attr, value)))
    }

    pub fn add_node_mark(&mut self, pos: usize, mark: Mark) -> Result<&mut Self, TransformError> {
        self.step(Step::AddNodeMark(AddNodeMarkStep::new(pos, mark)))
    }

    pub fn remove_node_mark(
        &mut self,
        pos: usize,
        mark: Mark,
    ) -> Result<&mut Self, TransformError> {
        self.step(Step::RemoveNodeMark(RemoveNodeMarkStep::new(pos, mark)))
    }

    /// Split the node at `pos`, and optionally its ancestors up to `depth`
    /// levels, giving the nodes after the split the given types.
    pub fn split(
        &mut self,
        pos: usize,
        depth: usize,
        types_after: Option<&[Option<Wrapper>]>,
    ) -> Result<&mut Self, TransformError> {
        let resolved = self.doc.resolve(pos)?;
        let mut before = Fragment::default();
        let mut after = Fragment::default();
        let base = resolved
            .depth()
            .checked_sub(depth)
            .ok_or_else(|| TransformError::StepFailed("split deeper than position".into()))?;
        let mut i = depth as i64 - 1;
        for d in ((base + 1)..=resolved.depth()).rev() {
            before = Fragment::from_node(resolved.node(d).copy(before));
            let type_after = types_after
                .and_then(|t| usize::try_from(i).ok().and_then(|j| t.get(j)))
                .and_then(|o| o.as_ref());
            let after_node = match type_after {
                Some(wrapper) => wrapper
                    .node_type
                    .create(wrapper.attrs.as_ref(), after, Vec::new())
                    .map_err(|err| TransformError::InvalidContent(err.to_string()))?,
                None => resolved.node(d).copy(after),
            };
            after = Fragment::from_node(after_node);
            i -= 1;
        }
        self.step(Step::Replace(ReplaceStep::structural(
            pos,
            pos,
            Slice::new(before.append(after), depth, depth),
        )))
    }

    /// Join the nodes around `pos`, removing `depth` levels of boundary
    /// tokens on each side.
    pub fn join(&mut self, pos: usize, depth: usize) -> Result<&mut Self, TransformError> {
        self.step(Step::Replace(ReplaceStep::structural(
            pos - depth,
            pos + depth,
            Slice::default(),
        )))
    }
}

/// Selects which marks [`Transform::remove_mark`] removes.
#[derive(Debug, Clone)]
pub enum MarkFilter {
    Mark(Mark),
    Type(MarkType),
    Any,
}

fn can_change_type(doc: &Node, pos: usize, node_type: &NodeType) -> bool {
    match doc.resolve(pos) {
        Ok(resolved) => {
            let index = resolved.index(resolved.depth());
            resolved.parent().can_replace_with(index, index + 1, node_type)
        }
        Err(_) => false,
    }
}

/// Depths at which the two positions together cover the whole content of
/// their shared ancestor, deepest first.
fn covered_depths(from: &ResolvedPos, to: &ResolvedPos) -> Vec<usize> {
    let mut result = Vec::new();
    let min_depth = from.depth().min(to.depth());
    let mut d = min_depth as i64;
    while d >= 0 {
        let depth = d as usize;
        let start = from.start(depth);
        if start + (from.depth() - depth) < from.pos()
            || to.end(depth) > to.pos() + (to.depth() - depth)
        {
            break;
        }
        if start == to.start(depth) {
            result.push(depth);
        }
        d -= 1;
    }
    result
}

/// Reduce a fragment's open depth from `old_open` to `new_open` by filling
/// out the required content at the now-closed levels.
fn close_fragment(
    fragment: Fragment,
    depth: usize,
    old_open: usize,
    new_open: usize,
    parent: Option<&Node>,
) -> Fragment {
    let mut fragment = fragment;
    if depth < old_open {
        if let Some(first) = fragment.first_child().cloned() {
            let inner =
                close_fragment(first.content().clone(), depth + 1, old_open, new_open, Some(&first));
            fragment = fragment.replace_child(0, first.copy(inner));
        }
    }
    if depth > new_open {
        let matcher: Option<ContentMatch> = parent.and_then(|p| p.content_match_at(0));
        if let Some(matcher) = matcher {
            let start = matcher
                .fill_before(&fragment, false, 0)
                .unwrap_or_default()
                .append(fragment);
            let end_fill = matcher
                .match_fragment(&start)
                .and_then(|m| m.fill_before(&Fragment::default(), true, 0))
                .unwrap_or_default();
            fragment = start.append(end_fill);
        }
    }
    fragment
}
