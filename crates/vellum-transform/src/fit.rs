//! Fitting replacements into the document structure.
//!
//! [`replace_step`] turns an arbitrary "replace this range with that slice"
//! request into a step that produces a schema-valid document. The fitter
//! walks the open slice against the open node boundaries at the edit
//! position, placing what fits, wrapping what can be wrapped, and dropping
//! what cannot be placed at all.

use vellum_model::{
    ContentMatch, Fragment, Node, NodeType, ResolveError, ResolvedPos, Slice,
};

use crate::replace_step::{ReplaceAroundStep, ReplaceStep};
use crate::step::Step;

/// Build a step that replaces `[from, to)` with `slice`, massaging the slice
/// until it fits. `None` when the replacement amounts to nothing.
pub fn replace_step(
    doc: &Node,
    from: usize,
    to: usize,
    slice: Slice,
) -> Result<Option<Step>, ResolveError> {
    if from == to && slice.size() == 0 {
        return Ok(None);
    }
    let from_pos = doc.resolve(from)?;
    let to_pos = doc.resolve(to)?;
    if fits_trivially(&from_pos, &to_pos, &slice) {
        return Ok(Some(Step::Replace(ReplaceStep::new(from, to, slice))));
    }
    Ok(Fitter::new(from_pos, to_pos, slice).and_then(Fitter::fit))
}

/// Whether the slice can be placed as-is, without opening anything.
pub fn fits_trivially(from: &ResolvedPos, to: &ResolvedPos, slice: &Slice) -> bool {
    slice.open_start() == 0
        && slice.open_end() == 0
        && from.start(from.depth()) == to.start(to.depth())
        && from
            .parent()
            .can_replace(from.index(from.depth()), to.index(to.depth()), slice.content())
}

struct Frontier {
    node_type: NodeType,
    match_state: ContentMatch,
}

struct Fittable {
    slice_depth: usize,
    frontier_depth: usize,
    parent: Option<Node>,
    inject: Option<Fragment>,
    wrap: Option<Vec<NodeType>>,
}

struct CloseLevel {
    depth: usize,
    fit: Fragment,
    move_to: ResolvedPos,
}

struct Fitter {
    from: ResolvedPos,
    to: ResolvedPos,
    unplaced: Slice,
    /// Open node types at the insertion side, outermost first, each with the
    /// match state after the content preceding the cut.
    frontier: Vec<Frontier>,
    placed: Fragment,
}

impl Fitter {
    fn new(from: ResolvedPos, to: ResolvedPos, unplaced: Slice) -> Option<Fitter> {
        let mut frontier = Vec::with_capacity(from.depth() + 1);
        for i in 0..=from.depth() {
            let node = from.node(i);
            frontier.push(Frontier {
                node_type: node.node_type().clone(),
                match_state: node.content_match_at(from.index_after(i))?,
            });
        }
        let mut placed = Fragment::default();
        for i in (1..=from.depth()).rev() {
            placed = Fragment::from_node(from.node(i).copy(placed));
        }
        Some(Fitter { from, to, unplaced, frontier, placed })
    }

    fn depth(&self) -> usize {
        self.frontier.len() - 1
    }

    fn fit(mut self) -> Option<Step> {
        while self.unplaced.size() > 0 {
            match self.find_fittable() {
                Some(fit) => self.place_nodes(fit)?,
                None => {
                    if !self.open_more() {
                        self.drop_node();
                    }
                }
            }
        }
        let move_inline = self.must_move_inline();
        let placed_size =
            self.placed.size() as i64 - self.depth() as i64 - self.from.depth() as i64;
        let to = match move_inline {
            Some(pos) => self.close(self.from.doc().resolve(pos).ok()?)?,
            None => self.close(self.to.clone())?,
        };

        let mut content = self.placed;
        let mut open_start = self.from.depth();
        let mut open_end = to.depth();
        while open_start > 0 && open_end > 0 && content.child_count() == 1 {
            content = content.child(0).content().clone();
            open_start -= 1;
            open_end -= 1;
        }
        let slice = Slice::new(content, open_start, open_end);
        if let Some(move_inline) = move_inline {
            return Some(Step::ReplaceAround(ReplaceAroundStep::new(
                self.from.pos(),
                move_inline,
                self.to.pos(),
                self.to.end(self.to.depth()),
                slice,
                placed_size.max(0) as usize,
                false,
            )));
        }
        if slice.size() > 0 || self.from.pos() != self.to.pos() {
            return Some(Step::Replace(ReplaceStep::new(self.from.pos(), to.pos(), slice)));
        }
        None
    }

    /// Search for content in the unplaced slice that can go onto the
    /// frontier. The first pass places or injects directly; the second pass
    /// allows wrapping.
    fn find_fittable(&self) -> Option<Fittable> {
        let start_depth = self.unplaced.open_start();
        for pass in 1..=2 {
            let top = if pass == 1 { start_depth } else { self.unplaced.open_start() };
            for slice_depth in (0..=top).rev() {
                let parent: Option<Node> = if slice_depth > 0 {
                    Some(
                        content_at(self.unplaced.content(), slice_depth - 1)
                            .first_child()?
                            .clone(),
                    )
                } else {
                    None
                };
                let fragment = match &parent {
                    Some(parent) => parent.content().clone(),
                    None => self.unplaced.content().clone(),
                };
                let first = fragment.first_child();
                for frontier_depth in (0..=self.depth()).rev() {
                    let Frontier { node_type, match_state } = &self.frontier[frontier_depth];
                    if pass == 1 {
                        let mut inject = None;
                        let fits = match first {
                            Some(first) => {
                                match_state.match_type(first.node_type()).is_some() || {
                                    inject = match_state.fill_before(
                                        &Fragment::from_node(first.clone()),
                                        false,
                                        0,
                                    );
                                    inject.is_some()
                                }
                            }
                            None => parent.as_ref().is_some_and(|p| {
                                node_type.compatible_content(p.node_type())
                            }),
                        };
                        if fits {
                            return Some(Fittable {
                                slice_depth,
                                frontier_depth,
                                parent: parent.clone(),
                                inject,
                                wrap: None,
                            });
                        }
                    } else if let Some(first) = first {
                        if let Some(wrap) = match_state.find_wrapping(first.node_type()) {
                            return Some(Fittable {
                                slice_depth,
                                frontier_depth,
                                parent: parent.clone(),
                                inject: None,
                                wrap: Some(wrap),
                            });
                        }
                    }
                    if let Some(parent) = &parent {
                        if match_state.match_type(parent.node_type()).is_some() {
                            break;
                        }
                    }
                }
            }
        }
        None
    }

    /// Open the slice one level deeper at the start.
    fn open_more(&mut self) -> bool {
        let content = self.unplaced.content().clone();
        let open_start = self.unplaced.open_start();
        let open_end = self.unplaced.open_end();
        let inner = content_at(&content, open_start);
        let openable = match inner.first_child() {
            Some(first) => !first.is_leaf(),
            None => false,
        };
        if !openable {
            return false;
        }
        let new_open_end = if inner.size() + open_start >= content.size() - open_end {
            open_start + 1
        } else {
            0
        };
        self.unplaced = Slice::new(content, open_start + 1, open_end.max(new_open_end));
        true
    }

    /// Give up on the first unplaced node and drop it.
    fn drop_node(&mut self) {
        let content = self.unplaced.content().clone();
        let open_start = self.unplaced.open_start();
        let open_end = self.unplaced.open_end();
        let inner = content_at(&content, open_start);
        if inner.child_count() <= 1 && open_start > 0 {
            let open_at_end = content.size() - open_start <= open_start + inner.size();
            self.unplaced = Slice::new(
                drop_from_fragment(&content, open_start - 1, 1),
                open_start - 1,
                if open_at_end { open_start - 1 } else { open_end },
            );
        } else {
            self.unplaced =
                Slice::new(drop_from_fragment(&content, open_start, 1), open_start, open_end);
        }
    }

    /// Move the fittable content onto the frontier.
    fn place_nodes(&mut self, fit: Fittable) -> Option<()> {
        let Fittable { slice_depth, frontier_depth, parent, inject, wrap } = fit;
        while self.depth() > frontier_depth {
            self.close_frontier_node();
        }
        if let Some(wrap) = wrap {
            for node_type in wrap {
                self.open_frontier_node(&node_type, None, None)?;
            }
        }
        let slice = self.unplaced.clone();
        let fragment = match &parent {
            Some(parent) => parent.content().clone(),
            None => slice.content().clone(),
        };
        let open_start = slice.open_start() - slice_depth;
        let mut taken = 0;
        let mut add: Vec<Node> = Vec::new();
        let frontier_depth = self.depth();
        let mut match_state = self.frontier[frontier_depth].match_state.clone();
        let node_type = self.frontier[frontier_depth].node_type.clone();
        if let Some(inject) = &inject {
            for child in inject.children() {
                add.push(child.clone());
            }
            match_state = match_state.match_fragment(inject)?;
        }
        // How many levels the placed content stays open at its end.
        let mut open_end_count = (fragment.size() + slice_depth) as i64
            - (slice.content().size() - slice.open_end()) as i64;
        while taken < fragment.child_count() {
            let next = fragment.child(taken);
            let matches = match match_state.match_type(next.node_type()) {
                Some(m) => m,
                None => break,
            };
            taken += 1;
            if taken > 1 || open_start == 0 || next.content().size() > 0 {
                match_state = matches;
                let closed = close_node_start(
                    &next.mark(node_type.allowed_marks(next.marks())),
                    if taken == 1 { open_start as i64 } else { 0 },
                    if taken == fragment.child_count() { open_end_count } else { -1 },
                );
                add.push(closed);
            }
        }
        let to_end = taken == fragment.child_count();
        if !to_end {
            open_end_count = -1;
        }
        self.placed = add_to_fragment(&self.placed, frontier_depth, Fragment::from_vec(add));
        self.frontier[frontier_depth].match_state = match_state;
        if to_end
            && open_end_count < 0
            && parent
                .as_ref()
                .is_some_and(|p| p.node_type() == &self.frontier[self.depth()].node_type)
            && self.frontier.len() > 1
        {
            self.close_frontier_node();
        }
        if open_end_count > 0 {
            let mut cur = fragment.clone();
            for _ in 0..open_end_count {
                let node = cur.last_child()?.clone();
                self.frontier.push(Frontier {
                    node_type: node.node_type().clone(),
                    match_state: node.content_match_at(node.child_count())?,
                });
                cur = node.content().clone();
            }
        }
        self.unplaced = if !to_end {
            Slice::new(
                drop_from_fragment(slice.content(), slice_depth, taken),
                slice.open_start(),
                slice.open_end(),
            )
        } else if slice_depth == 0 {
            Slice::default()
        } else {
            Slice::new(
                drop_from_fragment(slice.content(), slice_depth - 1, 1),
                slice_depth - 1,
                if open_end_count < 0 { slice.open_end() } else { slice_depth - 1 },
            )
        };
        Some(())
    }

    /// When the replaced range ends inside a textblock whose content must
    /// move into the placed textblock, the position after which the moved
    /// content ends.
    fn must_move_inline(&self) -> Option<usize> {
        if !self.to.parent().is_textblock() {
            return None;
        }
        let top = &self.frontier[self.depth()];
        if !top.node_type.is_textblock()
            || content_after_fits(
                &self.to,
                self.to.depth(),
                &top.node_type,
                &top.match_state,
                false,
            )
            .is_none()
        {
            return None;
        }
        if self.to.depth() == self.depth() {
            if let Some(level) = self.find_close_level(&self.to) {
                if level.depth == self.depth() {
                    return None;
                }
            }
        }
        let mut depth = self.to.depth();
        let mut after = self.to.after(depth)?;
        while depth > 1 {
            depth -= 1;
            if after != self.to.end(depth) {
                break;
            }
            after += 1;
        }
        Some(after)
    }

    fn find_close_level(&self, to: &ResolvedPos) -> Option<CloseLevel> {
        'scan: for i in (0..=self.depth().min(to.depth())).rev() {
            let Frontier { node_type, match_state } = &self.frontier[i];
            let drop_inner = i < to.depth()
                && to.end(i + 1) == to.pos() + (to.depth() - (i + 1));
            let fit = match content_after_fits(to, i, node_type, match_state, drop_inner) {
                Some(fit) => fit,
                None => continue,
            };
            for d in (0..i).rev() {
                let Frontier { node_type, match_state } = &self.frontier[d];
                match content_after_fits(to, d, node_type, match_state, true) {
                    Some(matches) if matches.child_count() == 0 => {}
                    _ => continue 'scan,
                }
            }
            let move_to = if drop_inner {
                to.doc().resolve(to.after(i + 1)?).ok()?
            } else {
                to.clone()
            };
            return Some(CloseLevel { depth: i, fit, move_to });
        }
        None
    }

    fn close(&mut self, to: ResolvedPos) -> Option<ResolvedPos> {
        let close = self.find_close_level(&to)?;
        while self.depth() > close.depth {
            self.close_frontier_node();
        }
        if close.fit.child_count() > 0 {
            self.placed = add_to_fragment(&self.placed, close.depth, close.fit);
        }
        let to = close.move_to;
        for d in close.depth + 1..=to.depth() {
            let node = to.node(d).clone();
            let add = node
                .node_type()
                .content_match()
                .fill_before(node.content(), true, to.index(d))?;
            self.open_frontier_node(&node.node_type().clone(), Some(&node), Some(add))?;
        }
        Some(to)
    }

    fn open_frontier_node(
        &mut self,
        node_type: &NodeType,
        attrs_from: Option<&Node>,
        content: Option<Fragment>,
    ) -> Option<()> {
        let depth = self.depth();
        let top = &mut self.frontier[depth];
        top.match_state = top.match_state.match_type(node_type)?;
        let node = match attrs_from {
            Some(source) => node_type
                .create(Some(source.attrs()), content.unwrap_or_default(), Vec::new())
                .ok()?,
            None => node_type.create(None, content.unwrap_or_default(), Vec::new()).ok()?,
        };
        self.placed = add_to_fragment(&self.placed, depth, Fragment::from_node(node));
        self.frontier.push(Frontier {
            node_type: node_type.clone(),
            match_state: node_type.content_match(),
        });
        Some(())
    }

    fn close_frontier_node(&mut self) {
        if let Some(open) = self.frontier.pop() {
            let add = open
                .match_state
                .fill_before(&Fragment::default(), true, 0)
                .unwrap_or_default();
            if add.child_count() > 0 {
                self.placed = add_to_fragment(&self.placed, self.frontier.len(), add);
            }
        }
    }
}

fn drop_from_fragment(fragment: &Fragment, depth: usize, count: usize) -> Fragment {
    if depth == 0 {
        return fragment.cut_by_index(count, fragment.child_count());
    }
    let first = fragment.child(0);
    fragment.replace_child(
        0,
        first.copy(drop_from_fragment(first.content(), depth - 1, count)),
    )
}

fn add_to_fragment(fragment: &Fragment, depth: usize, content: Fragment) -> Fragment {
    if depth == 0 {
        return fragment.append(content);
    }
    let last_index = fragment.child_count() - 1;
    let last = fragment.child(last_index);
    fragment.replace_child(
        last_index,
        last.copy(add_to_fragment(last.content(), depth - 1, content)),
    )
}

fn content_at(fragment: &Fragment, depth: usize) -> Fragment {
    let mut cur = fragment.clone();
    for _ in 0..depth {
        cur = match cur.first_child() {
            Some(first) => first.content().clone(),
            None => return Fragment::default(),
        };
    }
    cur
}

/// Close the open start of a node by filling in required content, recursing
/// down `open_start` levels. A non-negative `open_end` keeps that many end
/// levels open.
fn close_node_start(node: &Node, open_start: i64, open_end: i64) -> Node {
    if open_start <= 0 {
        return node.clone();
    }
    let mut frag = node.content().clone();
    if open_start > 1 {
        let first = frag.child(0).clone();
        let inner_open_end = if frag.child_count() == 1 { open_end - 1 } else { 0 };
        frag = frag.replace_child(0, close_node_start(&first, open_start - 1, inner_open_end));
    }
    let fill = node
        .node_type()
        .content_match()
        .fill_before(&frag, false, 0)
        .unwrap_or_default();
    frag = fill.append(frag);
    if open_end <= 0 {
        let close = node
            .node_type()
            .content_match()
            .match_fragment(&frag)
            .and_then(|m| m.fill_before(&Fragment::default(), true, 0))
            .unwrap_or_default();
        frag = frag.append(close);
    }
    node.copy(frag)
}

fn content_after_fits(
    to: &ResolvedPos,
    depth: usize,
    node_type: &NodeType,
    match_state: &ContentMatch,
    open: bool,
) -> Option<Fragment> {
    let node = to.node(depth);
    let index = if open { to.index_after(depth) } else { to.index(depth) };
    if index == node.child_count() && !node_type.compatible_content(node.node_type()) {
        return None;
    }
    let fit = match_state.fill_before(node.content(), true, index)?;
    if invalid_marks(node_type, node.content(), index) {
        return None;
    }
    Some(fit)
}

fn invalid_marks(node_type: &NodeType, fragment: &Fragment, start: usize) -> bool {
    (start..fragment.child_count()).any(|i| !node_type.allows_marks(fragment.child(i).marks()))
}
