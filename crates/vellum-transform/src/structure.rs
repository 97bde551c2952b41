//! Structural queries: where can content be split, joined, lifted, wrapped,
//! or dropped.
//!
//! All of these are pure functions over a document; the corresponding
//! [`crate::Transform`] methods build the actual steps.

use vellum_model::{Attrs, Fragment, Node, NodeRange, NodeType};

/// A node type plus the attributes to create it with, as used by wrapping.
#[derive(Debug, Clone)]
pub struct Wrapper {
    pub node_type: NodeType,
    pub attrs: Option<Attrs>,
}

impl Wrapper {
    fn plain(node_type: NodeType) -> Wrapper {
        Wrapper { node_type, attrs: None }
    }
}

/// The depth a range can be lifted to, i.e. the shallowest ancestor that can
/// hold the range's content directly.
pub fn lift_target(range: &NodeRange) -> Option<usize> {
    let parent = range.parent();
    let content = parent.content().cut_by_index(range.start_index(), range.end_index());
    let mut depth = range.depth();
    loop {
        let node = range.from_pos().node(depth);
        let index = range.from_pos().index(depth);
        let end_index = range.to_pos().index_after(depth);
        if depth < range.depth() && node.can_replace(index, end_index, &content) {
            return Some(depth);
        }
        if depth == 0 || !can_cut(node, index, end_index) {
            return None;
        }
        depth -= 1;
    }
}

/// Whether children `start..end` could be cut out of `node` while leaving
/// valid content on both sides.
fn can_cut(node: &Node, start: usize, end: usize) -> bool {
    (start == 0 || node.can_replace(start, node.child_count(), &Fragment::default()))
        && (end == node.child_count() || node.can_replace(0, end, &Fragment::default()))
}

/// A chain of wrappers that legally places the range's content inside a node
/// of the given type, or `None` when no such chain exists. The result runs
/// outermost to innermost and includes the target type itself.
pub fn find_wrapping(
    range: &NodeRange,
    node_type: &NodeType,
    attrs: Option<&Attrs>,
) -> Option<Vec<Wrapper>> {
    find_wrapping_inner(range, node_type, attrs, range)
}

pub(crate) fn find_wrapping_inner(
    range: &NodeRange,
    node_type: &NodeType,
    attrs: Option<&Attrs>,
    inner_range: &NodeRange,
) -> Option<Vec<Wrapper>> {
    let around = find_wrapping_outside(range, node_type)?;
    let inside = find_wrapping_inside(inner_range, node_type)?;
    let mut result: Vec<Wrapper> = around.into_iter().map(Wrapper::plain).collect();
    result.push(Wrapper { node_type: node_type.clone(), attrs: attrs.cloned() });
    result.extend(inside.into_iter().map(Wrapper::plain));
    Some(result)
}

fn find_wrapping_outside(range: &NodeRange, node_type: &NodeType) -> Option<Vec<NodeType>> {
    let parent = range.parent();
    let start_index = range.start_index();
    let end_index = range.end_index();
    let around = parent.content_match_at(start_index)?.find_wrapping(node_type)?;
    let outer = around.first().unwrap_or(node_type);
    parent
        .can_replace_with(start_index, end_index, outer)
        .then_some(around)
}

fn find_wrapping_inside(range: &NodeRange, node_type: &NodeType) -> Option<Vec<NodeType>> {
    let parent = range.parent();
    let start_index = range.start_index();
    let end_index = range.end_index();
    let inner = parent.child(start_index);
    let inside = node_type.content_match().find_wrapping(inner.node_type())?;
    let last_type = inside.last().unwrap_or(node_type);
    let mut inner_match = last_type.content_match();
    for i in start_index..end_index {
        inner_match = inner_match.match_type(parent.child(i).node_type())?;
    }
    inner_match.valid_end().then_some(inside)
}

/// Whether splitting at `pos`, `depth` levels up, yields two valid nodes.
/// `types_after` optionally overrides the types of the nodes created after
/// the split, outermost first; `None` entries keep the existing type.
pub fn can_split(
    doc: &Node,
    pos: usize,
    depth: usize,
    types_after: Option<&[Option<Wrapper>]>,
) -> bool {
    let pos = match doc.resolve(pos) {
        Ok(pos) => pos,
        Err(_) => return false,
    };
    let base = match pos.depth().checked_sub(depth) {
        Some(base) => base,
        None => return false,
    };
    let override_at =
        |i: i64| types_after.and_then(|t| usize::try_from(i).ok().and_then(|j| t.get(j))).and_then(|o| o.as_ref());
    let parent = pos.parent();
    let inner_type = types_after
        .and_then(|t| t.last())
        .and_then(|o| o.as_ref())
        .map(|w| w.node_type.clone())
        .unwrap_or_else(|| parent.node_type().clone());
    let rest = parent.content().cut_by_index(pos.index(pos.depth()), parent.child_count());
    if !parent.can_replace(pos.index(pos.depth()), parent.child_count(), &Fragment::default())
        || !inner_type.valid_content(&rest)
    {
        return false;
    }
    // Intermediate levels: every ancestor up to the base must also split
    // into two valid halves.
    let mut d = pos.depth().wrapping_sub(1);
    let mut i = depth as i64 - 2;
    while d as i64 > base as i64 {
        let node = pos.node(d);
        let index = pos.index(d);
        let mut rest = node.content().cut_by_index(index, node.child_count());
        if let Some(override_child) = override_at(i + 1) {
            if rest.child_count() > 0 {
                let created = match override_child.node_type.create(
                    override_child.attrs.as_ref(),
                    Fragment::default(),
                    Vec::new(),
                ) {
                    Ok(node) => node,
                    Err(_) => return false,
                };
                rest = rest.replace_child(0, created);
            }
        }
        let after_type = override_at(i)
            .map(|w| w.node_type.clone())
            .unwrap_or_else(|| node.node_type().clone());
        if !node.can_replace(index + 1, node.child_count(), &Fragment::default())
            || !after_type.valid_content(&rest)
        {
            return false;
        }
        d = d.wrapping_sub(1);
        i -= 1;
    }
    let index = pos.index_after(base);
    let base_type = override_at(0)
        .map(|w| w.node_type.clone())
        .unwrap_or_else(|| pos.node(base + 1).node_type().clone());
    pos.node(base).can_replace_with(index, index, &base_type)
}

/// Whether the two nodes on either side of `pos` can be joined.
pub fn can_join(doc: &Node, pos: usize) -> bool {
    let pos = match doc.resolve(pos) {
        Ok(pos) => pos,
        Err(_) => return false,
    };
    let index = pos.index(pos.depth());
    let (before, after) = (pos.node_before(), pos.node_after());
    match (before, after) {
        (Some(before), Some(after)) => {
            joinable(&before, &after)
                && pos.parent().can_replace(index, index + 1, &Fragment::default())
        }
        _ => false,
    }
}

fn joinable(a: &Node, b: &Node) -> bool {
    !a.is_leaf() && a.can_append(b)
}

/// Find an ancestor boundary at or around `pos` where a join can happen,
/// searching toward `dir` (negative for before, positive for after).
pub fn join_point(doc: &Node, pos: usize, dir: i8) -> Option<usize> {
    let resolved = doc.resolve(pos).ok()?;
    let mut pos = pos;
    let mut d = resolved.depth();
    loop {
        let (before, after, index) = if d == resolved.depth() {
            (
                resolved.node_before(),
                resolved.node_after(),
                resolved.index(d),
            )
        } else if dir > 0 {
            let index = resolved.index(d) + 1;
            (
                Some(resolved.node(d + 1).clone()),
                resolved.node(d).maybe_child(index).cloned(),
                index,
            )
        } else {
            let index = resolved.index(d);
            (
                resolved.node(d).maybe_child(index.wrapping_sub(1)).cloned(),
                Some(resolved.node(d + 1).clone()),
                index,
            )
        };
        if let (Some(before), Some(after)) = (&before, &after) {
            if !before.is_textblock()
                && joinable(before, after)
                && resolved.node(d).can_replace(index, index + 1, &Fragment::default())
            {
                return Some(pos);
            }
        }
        if d == 0 {
            return None;
        }
        pos = if dir < 0 { resolved.before(d)? } else { resolved.after(d)? };
        d -= 1;
    }
}

/// The closest position to `pos` where a node of the given type can be
/// inserted, walking up when the position itself does not allow it.
pub fn insert_point(doc: &Node, pos: usize, node_type: &NodeType) -> Option<usize> {
    let resolved = doc.resolve(pos).ok()?;
    let depth = resolved.depth();
    if resolved
        .parent()
        .can_replace_with(resolved.index(depth), resolved.index(depth), node_type)
    {
        return Some(pos);
    }
    if resolved.parent_offset() == 0 {
        for d in (0..depth).rev() {
            let index = resolved.index(d);
            if resolved.node(d).can_replace_with(index, index, node_type) {
                return resolved.before(d + 1);
            }
            if index > 0 {
                return None;
            }
        }
    }
    if resolved.parent_offset() == resolved.parent().content().size() {
        for d in (0..depth).rev() {
            let index = resolved.index_after(d);
            if resolved.node(d).can_replace_with(index, index, node_type) {
                return resolved.after(d + 1);
            }
            if index < resolved.node(d).child_count() {
                return None;
            }
        }
    }
    None
}

/// A position near `pos` where a dragged slice can be dropped: directly, or
/// by splitting parents toward the closer side, or (second pass) by adding a
/// wrapper.
pub fn drop_point(doc: &Node, pos: usize, slice: &vellum_model::Slice) -> Option<usize> {
    let resolved = doc.resolve(pos).ok()?;
    if slice.content().size() == 0 {
        return Some(pos);
    }
    let mut content = slice.content().clone();
    for _ in 0..slice.open_start() {
        content = content.first_child()?.content().clone();
    }
    let passes = if slice.open_start() == 0 && slice.size() > 0 { 2 } else { 1 };
    for pass in 1..=passes {
        for d in (0..=resolved.depth()).rev() {
            let bias: i8 = if d == resolved.depth() {
                0
            } else if resolved.pos() * 2 <= resolved.start(d + 1) + resolved.end(d + 1) {
                -1
            } else {
                1
            };
            let insert_pos = resolved.index(d) + if bias > 0 { 1 } else { 0 };
            let parent = resolved.node(d);
            let fits = if pass == 1 {
                parent.can_replace(insert_pos, insert_pos, &content)
            } else {
                let first = content.first_child()?;
                parent
                    .content_match_at(insert_pos)
                    .and_then(|m| m.find_wrapping(first.node_type()))
                    .and_then(|wrapping| wrapping.first().cloned())
                    .is_some_and(|outer| {
                        parent.can_replace_with(insert_pos, insert_pos, &outer)
                    })
            };
            if fits {
                return match bias {
                    0 => Some(resolved.pos()),
                    b if b < 0 => resolved.before(d + 1),
                    _ => resolved.after(d + 1),
                };
            }
        }
    }
    None
}
