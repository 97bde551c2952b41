//! Document-level editing operations on the transform orchestrator.

mod common;

use serde_json::json;

use common::{blockquote, code_block, doc, em, em_mark, hr, p, schema, text};
use vellum_model::{attrs, Fragment, Slice};
use vellum_transform::{
    can_join, can_split, drop_point, find_wrapping, insert_point, join_point, lift_target,
    MarkFilter, Step, Transform,
};

#[test]
fn insert_text_inside_a_paragraph() {
    let mut tr = Transform::new(doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]));
    tr.replace_with(2, 2, Fragment::from_node(text("X"))).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![text("aXb")]), p(vec![text("cd")])]));
    assert!(tr.doc_changed());
    assert_eq!(tr.mapping().map(2, 1), 3);
    assert_eq!(tr.mapping().map(2, -1), 2);
}

#[test]
fn delete_across_paragraphs_joins_them() {
    let mut tr = Transform::new(doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]));
    tr.delete(2, 6).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![text("ad")])]));
    assert_eq!(tr.steps().len(), 1);
    assert_eq!(tr.mapping().map(7, 1), 3);
}

#[test]
fn insert_block_between_blocks() {
    let mut tr = Transform::new(doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]));
    tr.insert(4, Fragment::from_node(p(vec![text("x")]))).unwrap();
    assert_eq!(
        *tr.doc(),
        doc(vec![p(vec![text("ab")]), p(vec![text("x")]), p(vec![text("cd")])])
    );
}

#[test]
fn replace_with_open_slice_joins_at_the_edges() {
    let source = doc(vec![p(vec![text("xy")])]);
    let slice = source.slice(1, 3, false).unwrap();
    let mut tr = Transform::new(doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]));
    tr.replace(2, 6, slice).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![text("axyd")])]));
}

#[test]
fn before_keeps_the_starting_document() {
    let start = doc(vec![p(vec![text("ab")])]);
    let mut tr = Transform::new(start.clone());
    tr.delete(1, 3).unwrap();
    assert_eq!(*tr.before(), start);
    assert_eq!(tr.docs().len(), 1);
}

#[test]
fn lift_pulls_a_paragraph_out_of_a_blockquote() {
    let mut tr = Transform::new(doc(vec![blockquote(vec![p(vec![text("ab")])])]));
    let from = tr.doc().resolve(2).unwrap();
    let to = tr.doc().resolve(2).unwrap();
    let range = from.block_range(&to, None).unwrap();
    let target = lift_target(&range).unwrap();
    assert_eq!(target, 0);
    tr.lift(&range, target).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![text("ab")])]));
}

#[test]
fn wrap_puts_a_paragraph_into_a_blockquote() {
    let mut tr = Transform::new(doc(vec![p(vec![text("ab")])]));
    let from = tr.doc().resolve(1).unwrap();
    let to = tr.doc().resolve(3).unwrap();
    let range = from.block_range(&to, None).unwrap();
    let wrappers =
        find_wrapping(&range, schema().node_type("blockquote").as_ref().unwrap(), None).unwrap();
    assert_eq!(wrappers.len(), 1);
    tr.wrap(&range, &wrappers).unwrap();
    assert_eq!(*tr.doc(), doc(vec![blockquote(vec![p(vec![text("ab")])])]));
}

#[test]
fn set_block_type_turns_a_paragraph_into_a_heading() {
    let mut tr = Transform::new(doc(vec![p(vec![text("ab")])]));
    let heading = schema().node_type("heading").unwrap();
    let attrs = attrs! {"level" => 2};
    tr.set_block_type(1, 3, &heading, Some(&attrs)).unwrap();
    let expected = doc(vec![schema()
        .node("heading", Some(&attrs), Fragment::from_node(text("ab")), vec![])
        .unwrap()]);
    assert_eq!(*tr.doc(), expected);
}

#[test]
fn set_node_markup_changes_a_block_in_place() {
    let mut tr = Transform::new(doc(vec![p(vec![text("ab")])]));
    let code = schema().node_type("code_block").unwrap();
    tr.set_node_markup(0, Some(&code), None, None).unwrap();
    assert_eq!(*tr.doc(), doc(vec![code_block(vec![text("ab")])]));
}

#[test]
fn split_divides_a_paragraph() {
    let d = doc(vec![p(vec![text("ab")])]);
    assert!(can_split(&d, 2, 1, None));
    let mut tr = Transform::new(d);
    tr.split(2, 1, None).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![text("a")]), p(vec![text("b")])]));
}

#[test]
fn split_at_document_level_is_rejected() {
    let d = doc(vec![p(vec![text("ab")])]);
    assert!(!can_split(&d, 0, 1, None));
}

#[test]
fn join_merges_two_blockquotes() {
    let d = doc(vec![
        blockquote(vec![p(vec![text("a")])]),
        blockquote(vec![p(vec![text("b")])]),
    ]);
    assert!(can_join(&d, 5));
    let mut tr = Transform::new(d);
    tr.join(5, 1).unwrap();
    assert_eq!(
        *tr.doc(),
        doc(vec![blockquote(vec![p(vec![text("a")]), p(vec![text("b")])])])
    );
}

#[test]
fn join_refuses_textblock_boundary_with_leaf() {
    let d = doc(vec![p(vec![text("a")]), hr()]);
    assert!(!can_join(&d, 3));
}

#[test]
fn add_mark_covers_the_whole_range() {
    let mut tr = Transform::new(doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]));
    tr.add_mark(1, 7, em_mark()).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![em("ab")]), p(vec![em("cd")])]));
    assert_eq!(tr.steps().len(), 2);
}

#[test]
fn add_mark_skips_nodes_that_disallow_it() {
    let mut tr = Transform::new(doc(vec![code_block(vec![text("ab")])]));
    tr.add_mark(1, 3, em_mark()).unwrap();
    assert!(!tr.doc_changed());
}

#[test]
fn remove_mark_by_mark_and_by_wildcard() {
    let marked = doc(vec![p(vec![em("ab")])]);
    let mut tr = Transform::new(marked.clone());
    tr.remove_mark(1, 3, MarkFilter::Mark(em_mark())).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![text("ab")])]));

    let mut tr = Transform::new(marked);
    tr.remove_mark(1, 3, MarkFilter::Any).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![text("ab")])]));
}

#[test]
fn remove_mark_by_type_ignores_other_marks() {
    let strong = schema().mark("strong", None).unwrap();
    let both = schema().text("ab", vec![em_mark(), strong.clone()]);
    let mut tr = Transform::new(doc(vec![p(vec![both])]));
    tr.remove_mark(1, 3, MarkFilter::Type(em_mark().mark_type().clone())).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![schema().text("ab", vec![strong])])]));
}

#[test]
fn set_node_attribute_updates_in_place() {
    let attrs = attrs! {"level" => 1};
    let heading = schema()
        .node("heading", Some(&attrs), Fragment::from_node(text("ab")), vec![])
        .unwrap();
    let mut tr = Transform::new(doc(vec![heading]));
    tr.set_node_attribute(0, "level", json!(3)).unwrap();
    let expected_attrs = attrs! {"level" => 3};
    let expected = doc(vec![schema()
        .node("heading", Some(&expected_attrs), Fragment::from_node(text("ab")), vec![])
        .unwrap()]);
    assert_eq!(*tr.doc(), expected);
}

#[test]
fn set_doc_attribute_fails_for_unknown_attr() {
    let mut tr = Transform::new(doc(vec![p(vec![text("ab")])]));
    assert!(tr.set_doc_attribute("version", json!(2)).is_err());
}

#[test]
fn replace_range_merges_a_pasted_paragraph() {
    let source = doc(vec![p(vec![text("xy")])]);
    let slice = source.slice(1, 3, false).unwrap();
    let mut tr = Transform::new(doc(vec![p(vec![text("ab")])]));
    tr.replace_range(1, 3, slice).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![text("xy")])]));
}

#[test]
fn replace_range_with_splits_text_around_a_leaf_block() {
    let mut tr = Transform::new(doc(vec![p(vec![text("ab")])]));
    tr.replace_range_with(2, 2, hr()).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![text("a")]), hr(), p(vec![text("b")])]));
}

#[test]
fn delete_range_keeps_an_emptiable_parent() {
    let mut tr = Transform::new(doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]));
    tr.delete_range(5, 7).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![text("ab")]), p(vec![])]));
}

#[test]
fn delete_range_removes_a_fully_covered_shell() {
    let mut tr = Transform::new(doc(vec![
        p(vec![text("ab")]),
        blockquote(vec![p(vec![text("cd")])]),
    ]));
    tr.delete_range(5, 9).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![text("ab")])]));
}

#[test]
fn insert_point_walks_up_to_a_valid_parent() {
    let d = doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]);
    let paragraph = schema().node_type("paragraph").unwrap();
    assert_eq!(insert_point(&d, 4, &paragraph), Some(4));
    assert_eq!(insert_point(&d, 3, &paragraph), Some(4));
    assert_eq!(insert_point(&d, 2, &paragraph), None);
}

#[test]
fn join_point_finds_the_blockquote_boundary() {
    let d = doc(vec![
        blockquote(vec![p(vec![text("a")])]),
        blockquote(vec![p(vec![text("b")])]),
    ]);
    assert_eq!(join_point(&d, 5, -1), Some(5));
    let mut tr = Transform::new(d);
    tr.join(5, 1).unwrap();
    assert_eq!(
        *tr.doc(),
        doc(vec![blockquote(vec![p(vec![text("a")]), p(vec![text("b")])])])
    );
}

#[test]
fn drop_point_moves_a_block_out_of_a_textblock() {
    let d = doc(vec![p(vec![text("ab")])]);
    let slice = Slice::new(Fragment::from_node(hr()), 0, 0);
    assert_eq!(drop_point(&d, 2, &slice), Some(0));
    assert_eq!(drop_point(&d, 0, &slice), Some(0));
}

#[test]
fn clear_incompatible_drops_disallowed_marks() {
    let mut tr = Transform::new(doc(vec![p(vec![em("ab")])]));
    let code = schema().node_type("code_block").unwrap();
    tr.clear_incompatible(0, &code).unwrap();
    assert_eq!(*tr.doc(), doc(vec![p(vec![text("ab")])]));
}

#[test]
fn failed_step_leaves_the_transform_untouched() {
    let start = doc(vec![p(vec![text("ab")])]);
    let mut tr = Transform::new(start.clone());
    // A structural replace over actual content must refuse to apply.
    let step = Step::Replace(vellum_transform::ReplaceStep::structural(
        1,
        3,
        Slice::default(),
    ));
    assert!(!tr.maybe_step(step).is_ok());
    assert_eq!(*tr.doc(), start);
    assert!(!tr.doc_changed());
}

#[test]
fn invert_restores_the_previous_document() {
    let original = doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]);
    let mut tr = Transform::new(original.clone());
    tr.delete(2, 6).unwrap();
    let step = &tr.steps()[0];
    let inverse = step.invert(tr.docs().first().unwrap()).unwrap();
    let restored = inverse.apply(tr.doc()).into_doc().unwrap();
    assert_eq!(restored, original);
}

#[test]
fn mapped_step_applies_after_an_earlier_edit() {
    let base = doc(vec![p(vec![text("abcd")])]);
    // One edit inserts text at the front; a concurrent mark step rebases
    // over it.
    let mut tr = Transform::new(base);
    tr.replace_with(1, 1, Fragment::from_node(text("xy"))).unwrap();
    let concurrent = Step::AddMark(vellum_transform::AddMarkStep::new(1, 3, em_mark()));
    let rebased = concurrent.map(tr.mapping()).unwrap();
    let result = rebased.apply(tr.doc()).into_doc().unwrap();
    assert_eq!(result, doc(vec![p(vec![text("xy"), em("ab"), text("cd")])]));
}

#[test]
fn step_on_deleted_content_maps_to_none() {
    let mut tr = Transform::new(doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]));
    tr.delete(4, 8).unwrap();
    let step = Step::AddMark(vellum_transform::AddMarkStep::new(5, 7, em_mark()));
    assert!(step.map(tr.mapping()).is_none());
}
