//! Position maps.
//!
//! Every step publishes a [`StepMap`]: a sorted list of `[start, old size,
//! new size]` ranges describing what it replaced. Mapping a position through
//! one or more of those describes where it ends up after the change, which
//! is the basis for rebasing concurrent edits.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use thiserror::Error;

/// The mapped position was deleted with content before it.
const DEL_BEFORE: u8 = 1;
/// The mapped position was deleted with content after it.
const DEL_AFTER: u8 = 2;
/// The position sat strictly inside a deleted range.
const DEL_ACROSS: u8 = 4;
/// The token on the side the position was associated with went away.
const DEL_SIDE: u8 = 8;

const RECOVER_LOWER: u64 = 0xffff;

fn make_recover(index: usize, offset: usize) -> u64 {
    ((offset as u64) << 16) | index as u64
}

fn recover_index(value: u64) -> usize {
    (value & RECOVER_LOWER) as usize
}

fn recover_offset(value: u64) -> usize {
    (value >> 16) as usize
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("step map ranges come in [start, old size, new size] triples, got {0} values")]
    RangesNotTriples(usize),

    #[error("recover token names range {index}, but the map has {ranges} ranges")]
    RecoverOutOfRange { index: usize, ranges: usize },
}

/// Result of mapping a position, with deletion details and a recovery token
/// for mirror lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pos: usize,
    del_info: u8,
    recover: Option<u64>,
}

impl MapResult {
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Whether the token on the associated side of the position was deleted.
    pub fn deleted(&self) -> bool {
        self.del_info & DEL_SIDE != 0
    }

    pub fn deleted_before(&self) -> bool {
        self.del_info & (DEL_BEFORE | DEL_ACROSS) != 0
    }

    pub fn deleted_after(&self) -> bool {
        self.del_info & (DEL_AFTER | DEL_ACROSS) != 0
    }

    /// Whether the position sat strictly inside a deleted range.
    pub fn deleted_across(&self) -> bool {
        self.del_info & DEL_ACROSS != 0
    }

    pub(crate) fn recover(&self) -> Option<u64> {
        self.recover
    }
}

/// A map of replaced ranges, as produced by a single step.
#[derive(Clone, PartialEq, Eq)]
pub struct StepMap {
    /// `[start, old size, new size]` triples, sorted by start.
    ranges: Arc<Vec<usize>>,
    /// When set, old and new sizes trade places; produced by
    /// [`StepMap::invert`].
    inverted: bool,
}

impl std::fmt::Debug for StepMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.inverted {
            write!(f, "StepMap({:?}, inverted)", self.ranges)
        } else {
            write!(f, "StepMap({:?})", self.ranges)
        }
    }
}

impl StepMap {
    /// Build a map from range triples. Panics on a malformed list; use
    /// [`StepMap::try_new`] for unchecked input.
    pub fn new(ranges: Vec<usize>) -> StepMap {
        assert!(ranges.len() % 3 == 0, "step map ranges must be triples");
        StepMap { ranges: Arc::new(ranges), inverted: false }
    }

    /// Like [`StepMap::new`], but returns an error instead of panicking.
    pub fn try_new(ranges: Vec<usize>) -> Result<StepMap, MapError> {
        if ranges.len() % 3 != 0 {
            return Err(MapError::RangesNotTriples(ranges.len()));
        }
        Ok(StepMap { ranges: Arc::new(ranges), inverted: false })
    }

    /// A map that leaves every position alone. Shared, not reallocated.
    pub fn empty() -> StepMap {
        static EMPTY: Lazy<StepMap> =
            Lazy::new(|| StepMap { ranges: Arc::new(Vec::new()), inverted: false });
        EMPTY.clone()
    }

    /// A map that shifts all positions by `n` (insertion or deletion at the
    /// start of the document).
    pub fn offset(n: i64) -> StepMap {
        if n == 0 {
            StepMap::empty()
        } else if n < 0 {
            StepMap::new(vec![0, (-n) as usize, 0])
        } else {
            StepMap::new(vec![0, 0, n as usize])
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    fn range_count(&self) -> usize {
        self.ranges.len() / 3
    }

    fn old_index(&self) -> usize {
        if self.inverted { 2 } else { 1 }
    }

    fn new_index(&self) -> usize {
        if self.inverted { 1 } else { 2 }
    }

    fn map_inner(&self, pos: usize, assoc: i8) -> MapResult {
        let (old_index, new_index) = (self.old_index(), self.new_index());
        let mut diff: i64 = 0;
        for i in (0..self.ranges.len()).step_by(3) {
            let start = if self.inverted {
                (self.ranges[i] as i64 - diff) as usize
            } else {
                self.ranges[i]
            };
            if start > pos {
                break;
            }
            let old_size = self.ranges[i + old_index];
            let new_size = self.ranges[i + new_index];
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    -1
                } else if pos == end {
                    1
                } else {
                    assoc
                };
                let result = (start as i64 + diff
                    + if side < 0 { 0 } else { new_size as i64 })
                    as usize;
                let anchor = if assoc < 0 { start } else { end };
                let recover =
                    (pos != anchor).then(|| make_recover(i / 3, pos - start));
                let mut del = if pos == start {
                    DEL_AFTER
                } else if pos == end {
                    DEL_BEFORE
                } else {
                    DEL_ACROSS
                };
                let off_side = if assoc < 0 { pos != start } else { pos != end };
                if off_side {
                    del |= DEL_SIDE;
                }
                return MapResult { pos: result, del_info: del, recover };
            }
            diff += new_size as i64 - old_size as i64;
        }
        MapResult { pos: (pos as i64 + diff) as usize, del_info: 0, recover: None }
    }

    /// Map a position through this map. `assoc` says which side the position
    /// sticks to when content is inserted exactly at it.
    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.map_inner(pos, assoc).pos
    }

    /// Map a position, also reporting deletion information.
    pub fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        self.map_inner(pos, assoc)
    }

    /// Recover an exact position inside a replaced range, from a token
    /// produced by [`StepMap::map_result`] on this same map.
    pub fn recover(&self, value: u64) -> Result<usize, MapError> {
        let index = recover_index(value);
        if index >= self.range_count() {
            return Err(MapError::RecoverOutOfRange { index, ranges: self.range_count() });
        }
        Ok(self.recover_unchecked(value))
    }

    fn recover_unchecked(&self, value: u64) -> usize {
        let index = recover_index(value);
        let mut diff: i64 = 0;
        if !self.inverted {
            for i in 0..index {
                diff += self.ranges[i * 3 + 2] as i64 - self.ranges[i * 3 + 1] as i64;
            }
        }
        (self.ranges[index * 3] as i64 + diff) as usize + recover_offset(value)
    }

    /// Whether `pos` touches the range a recover token points into.
    pub fn touches(&self, pos: usize, recover: u64) -> bool {
        let index = recover_index(recover);
        let old_index = self.old_index();
        let new_index = self.new_index();
        let mut diff: i64 = 0;
        for i in (0..self.ranges.len()).step_by(3) {
            let start = if self.inverted {
                (self.ranges[i] as i64 - diff) as usize
            } else {
                self.ranges[i]
            };
            if start > pos {
                break;
            }
            let old_size = self.ranges[i + old_index];
            if pos <= start + old_size && i == index * 3 {
                return true;
            }
            diff += self.ranges[i + new_index] as i64 - old_size as i64;
        }
        false
    }

    /// Call `f` with `(old_start, old_end, new_start, new_end)` for every
    /// replaced range.
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, usize, usize)) {
        let (old_index, new_index) = (self.old_index(), self.new_index());
        let mut diff: i64 = 0;
        for i in (0..self.ranges.len()).step_by(3) {
            let start = self.ranges[i];
            let old_start = if self.inverted { (start as i64 - diff) as usize } else { start };
            let new_start = if self.inverted { start } else { (start as i64 + diff) as usize };
            let old_size = self.ranges[i + old_index];
            let new_size = self.ranges[i + new_index];
            f(old_start, old_start + old_size, new_start, new_start + new_size);
            diff += new_size as i64 - old_size as i64;
        }
    }

    /// A map that undoes this one.
    pub fn invert(&self) -> StepMap {
        StepMap { ranges: self.ranges.clone(), inverted: !self.inverted }
    }
}

/// Anything a position can be mapped through: a single [`StepMap`] or a
/// whole [`Mapping`].
pub trait Mappable {
    fn map(&self, pos: usize, assoc: i8) -> usize;
    fn map_result(&self, pos: usize, assoc: i8) -> MapResult;
}

impl Mappable for StepMap {
    fn map(&self, pos: usize, assoc: i8) -> usize {
        StepMap::map(self, pos, assoc)
    }

    fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        StepMap::map_result(self, pos, assoc)
    }
}

/// A pipeline of step maps, with optional mirror pairs. A map and its mirror
/// cancel out: a position deleted by one is recovered through the other,
/// which is what makes rebasing across an undo/redo pair exact.
#[derive(Clone, Default)]
pub struct Mapping {
    maps: Vec<StepMap>,
    /// Map index to the index of the map that undoes it, in both
    /// directions. `None` until the first mirror is set, so the common
    /// no-mirror case maps with a plain fold.
    mirror: Option<HashMap<usize, usize>>,
    from: usize,
    to: usize,
}

impl std::fmt::Debug for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapping")
            .field("maps", &self.maps.len())
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl Mapping {
    pub fn new() -> Mapping {
        Mapping::default()
    }

    pub fn from_maps(maps: Vec<StepMap>) -> Mapping {
        let to = maps.len();
        Mapping { maps, mirror: None, from: 0, to }
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// A view mapping only through maps `from..to`. The maps are shared with
    /// the original.
    pub fn slice(&self, from: usize, to: usize) -> Mapping {
        Mapping { maps: self.maps.clone(), mirror: self.mirror.clone(), from, to }
    }

    pub fn append_map(&mut self, map: StepMap, mirrors: Option<usize>) {
        self.maps.push(map);
        self.to = self.maps.len();
        if let Some(m) = mirrors {
            self.set_mirror(self.maps.len() - 1, m);
        }
    }

    /// Record that maps `n` and `m` undo each other.
    pub fn set_mirror(&mut self, n: usize, m: usize) {
        let mirror = self.mirror.get_or_insert_with(HashMap::new);
        mirror.insert(n, m);
        mirror.insert(m, n);
    }

    pub fn get_mirror(&self, n: usize) -> Option<usize> {
        self.mirror.as_ref().and_then(|m| m.get(&n).copied())
    }

    /// Append all of `other`'s maps, preserving its mirror pairs.
    pub fn append_mapping(&mut self, other: &Mapping) {
        let start_size = self.maps.len();
        for i in 0..other.maps.len() {
            let mirr = other.get_mirror(i);
            let mirrors = match mirr {
                Some(m) if m < i => Some(start_size + m),
                _ => None,
            };
            self.append_map(other.maps[i].clone(), mirrors);
        }
    }

    /// Append the inverse of `other`, mirroring each of its maps.
    pub fn append_mapping_inverted(&mut self, other: &Mapping) {
        let total_size = self.maps.len() + other.maps.len();
        for i in (0..other.maps.len()).rev() {
            let mirr = other.get_mirror(i);
            let mirrors = match mirr {
                Some(m) if m > i => Some(total_size - m - 1),
                _ => None,
            };
            self.append_map(other.maps[i].invert(), mirrors);
        }
    }

    /// A mapping that undoes this one.
    pub fn invert(&self) -> Mapping {
        let mut inverse = Mapping::new();
        inverse.append_mapping_inverted(self);
        inverse
    }

    /// Map a position through the whole pipeline.
    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        match &self.mirror {
            // No mirrors anywhere, so no recovery can apply and a plain
            // fold gives the same answer.
            None => (self.from..self.to).fold(pos, |p, i| self.maps[i].map(p, assoc)),
            Some(_) => self.map_full(pos, assoc).pos,
        }
    }

    pub fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        self.map_full(pos, assoc)
    }

    fn map_full(&self, pos: usize, assoc: i8) -> MapResult {
        let mut del_info = 0;
        let mut pos = pos;
        let mut i = self.from;
        while i < self.to {
            let result = self.maps[i].map_result(pos, assoc);
            if let Some(recover) = result.recover() {
                if let Some(corr) = self.get_mirror(i) {
                    if corr > i && corr < self.to {
                        // The position fell into a replaced range, but a
                        // later map undoes the replacement; jump straight
                        // there and recover the exact offset.
                        pos = self.maps[corr].recover_unchecked(recover);
                        i = corr + 1;
                        continue;
                    }
                }
            }
            del_info |= result.del_info;
            pos = result.pos;
            i += 1;
        }
        MapResult { pos, del_info, recover: None }
    }
}

impl Mappable for Mapping {
    fn map(&self, pos: usize, assoc: i8) -> usize {
        Mapping::map(self, pos, assoc)
    }

    fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        Mapping::map_result(self, pos, assoc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_is_identity() {
        let map = StepMap::empty();
        assert_eq!(map.map(0, 1), 0);
        assert_eq!(map.map(10, -1), 10);
        assert!(!map.map_result(10, 1).deleted());
    }

    #[test]
    fn offset_zero_is_empty() {
        assert!(StepMap::offset(0).is_empty());
        assert_eq!(StepMap::offset(5).map(0, 1), 5);
        assert_eq!(StepMap::offset(-3).map(7, 1), 4);
    }

    #[test]
    fn empty_maps_share_one_allocation() {
        let a = StepMap::empty();
        let b = StepMap::empty();
        assert!(Arc::ptr_eq(&a.ranges, &b.ranges));
        assert_eq!(StepMap::offset(0), a);
    }

    #[test]
    fn try_new_rejects_partial_triples() {
        assert_eq!(
            StepMap::try_new(vec![1, 2]).unwrap_err(),
            MapError::RangesNotTriples(2)
        );
        assert!(StepMap::try_new(vec![1, 2, 3]).is_ok());
    }

    #[test]
    fn recover_validates_index() {
        let map = StepMap::new(vec![2, 4, 4]);
        assert!(map.recover(make_recover(1, 0)).is_err());
        assert_eq!(map.recover(make_recover(0, 2)).unwrap(), 4);
    }
}
