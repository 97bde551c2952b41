//! Position mapping through single maps and composed pipelines.

use vellum_transform::{Mapping, StepMap};

#[test]
fn deletion_collapses_positions_into_the_gap() {
    let map = StepMap::new(vec![10, 5, 0]);
    assert_eq!(map.map(5, 1), 5);
    assert_eq!(map.map(10, -1), 10);
    assert_eq!(map.map(10, 1), 10);
    assert_eq!(map.map(12, 1), 10);
    assert_eq!(map.map(15, -1), 10);
    assert_eq!(map.map(16, 1), 11);
}

#[test]
fn insertion_shifts_positions_after_it() {
    let map = StepMap::new(vec![10, 0, 5]);
    assert_eq!(map.map(9, 1), 9);
    assert_eq!(map.map(10, -1), 10);
    assert_eq!(map.map(10, 1), 15);
    assert_eq!(map.map(11, 1), 16);
}

#[test]
fn map_result_reports_deletion_details() {
    let map = StepMap::new(vec![10, 5, 0]);
    let inside = map.map_result(12, 1);
    assert_eq!(inside.pos(), 10);
    assert!(inside.deleted());
    assert!(inside.deleted_across());
    assert!(inside.deleted_before());
    assert!(inside.deleted_after());

    let at_start = map.map_result(10, -1);
    assert!(!at_start.deleted());
    assert!(at_start.deleted_after());
    assert!(!at_start.deleted_before());

    let at_end = map.map_result(15, 1);
    assert!(!at_end.deleted());
    assert!(at_end.deleted_before());
    assert!(!at_end.deleted_after());

    assert!(!map.map_result(5, 1).deleted());
}

#[test]
fn invert_swaps_old_and_new_sizes() {
    let map = StepMap::new(vec![2, 4, 0]);
    let inverse = map.invert();
    assert_eq!(inverse.map(0, 1), 0);
    assert_eq!(inverse.map(2, 1), 6);
    assert_eq!(map.map(inverse.map(3, 1), 1), 3);
}

#[test]
fn offset_zero_is_the_empty_map() {
    assert_eq!(StepMap::offset(0), StepMap::empty());
    assert_eq!(StepMap::new(Vec::new()), StepMap::empty());
    assert_eq!(StepMap::offset(3).map(2, 1), 5);
    assert_eq!(StepMap::offset(-2).map(5, 1), 3);
}

#[test]
fn for_each_walks_the_ranges() {
    let map = StepMap::new(vec![2, 4, 1, 10, 0, 3]);
    let mut seen = Vec::new();
    map.for_each(|old_start, old_end, new_start, new_end| {
        seen.push((old_start, old_end, new_start, new_end));
    });
    assert_eq!(seen, vec![(2, 6, 2, 3), (10, 10, 7, 10)]);
}

#[test]
fn mapping_composes_maps_in_order() {
    let mut mapping = Mapping::new();
    mapping.append_map(StepMap::new(vec![2, 0, 4]), None);
    mapping.append_map(StepMap::new(vec![10, 3, 0]), None);
    // 8 shifts to 12, which sits inside the second map's deleted range.
    assert_eq!(mapping.map(8, 1), 10);
    assert_eq!(mapping.map(1, 1), 1);
}

#[test]
fn mapping_without_mirrors_uses_simple_fold() {
    // The fold fast path and the full path must agree when no mirror is set.
    let mut mapping = Mapping::new();
    mapping.append_map(StepMap::new(vec![2, 4, 0]), None);
    mapping.append_map(StepMap::new(vec![2, 0, 4]), None);
    for pos in 0..8 {
        assert_eq!(mapping.map(pos, 1), mapping.map_result(pos, 1).pos());
        assert_eq!(mapping.map(pos, -1), mapping.map_result(pos, -1).pos());
    }
}

#[test]
fn mirror_recovery_round_trips_deleted_positions() {
    let mut mapping = Mapping::new();
    mapping.append_map(StepMap::new(vec![2, 4, 0]), None);
    mapping.append_map(StepMap::new(vec![2, 0, 4]), Some(0));
    assert_eq!(mapping.map(0, 1), 0);
    assert_eq!(mapping.map(2, 1), 2);
    assert_eq!(mapping.map(4, 1), 4);
    assert_eq!(mapping.map(6, 1), 6);
}

#[test]
fn unmirrored_delete_reinsert_does_not_recover() {
    let mut mapping = Mapping::new();
    mapping.append_map(StepMap::new(vec![2, 4, 0]), None);
    mapping.append_map(StepMap::new(vec![2, 0, 4]), None);
    // Without the mirror relation the deleted position collapses to the
    // gap's start, then gets pushed past the unrelated insertion.
    assert_eq!(mapping.map(4, 1), 6);
    assert_eq!(mapping.map(4, -1), 2);
}

#[test]
fn inverted_mapping_undoes_the_original() {
    let mut mapping = Mapping::new();
    mapping.append_map(StepMap::new(vec![2, 0, 4]), None);
    mapping.append_map(StepMap::new(vec![10, 2, 0]), None);
    let inverse = mapping.invert();
    // Positions clear of the deleted range round-trip exactly.
    for pos in [0, 1, 2, 5, 9] {
        assert_eq!(inverse.map(mapping.map(pos, 1), 1), pos);
    }
}

#[test]
fn append_mapping_carries_mirror_pairs_across() {
    let mut inner = Mapping::new();
    inner.append_map(StepMap::new(vec![2, 4, 0]), None);
    inner.append_map(StepMap::new(vec![2, 0, 4]), Some(0));

    let mut outer = Mapping::new();
    outer.append_map(StepMap::new(vec![0, 0, 1]), None);
    outer.append_mapping(&inner);

    assert_eq!(outer.get_mirror(1), Some(2));
    assert_eq!(outer.get_mirror(2), Some(1));
    // Recovery still works at the shifted indexes.
    assert_eq!(outer.map(4, 1), 5);
}

#[test]
fn slice_maps_through_a_subrange() {
    let mut mapping = Mapping::new();
    mapping.append_map(StepMap::new(vec![0, 0, 2]), None);
    mapping.append_map(StepMap::new(vec![0, 0, 3]), None);
    assert_eq!(mapping.map(1, 1), 6);
    assert_eq!(mapping.slice(1, 2).map(1, 1), 4);
    assert_eq!(mapping.slice(0, 1).map(1, 1), 3);
}

#[test]
fn recover_rejects_out_of_range_tokens() {
    let map = StepMap::new(vec![2, 4, 4]);
    let result = map.map_result(4, 1);
    let token = {
        // Rebuild an equivalent token pointing past the only range.
        assert_eq!(result.pos(), 6);
        (2u64 << 16) | 1
    };
    assert!(map.recover(token).is_err());
}
