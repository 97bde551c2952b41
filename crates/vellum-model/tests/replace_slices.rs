use vellum_model::{Fragment, Slice};

mod common;
use common::*;

#[test]
fn delete_within_textblock() {
    let before = doc(vec![p(vec![text("hello")])]);
    let after = before.replace(2, 5, &Slice::default()).unwrap();
    assert_eq!(after, doc(vec![p(vec![text("ho")])]));
}

#[test]
fn insert_text_within_textblock() {
    let before = doc(vec![p(vec![text("hello")])]);
    let slice = Slice::new(Fragment::from_node(text("XY")), 0, 0);
    let after = before.replace(3, 3, &slice).unwrap();
    assert_eq!(after, doc(vec![p(vec![text("heXYllo")])]));
}

#[test]
fn delete_across_paragraphs_joins_them() {
    let before = doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]);
    let after = before.replace(2, 6, &Slice::default()).unwrap();
    assert_eq!(after, doc(vec![p(vec![text("ad")])]));
}

#[test]
fn replace_across_paragraphs_with_open_slice() {
    let before = doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]);
    let slice = Slice::new(
        Fragment::from_vec(vec![p(vec![text("X")]), p(vec![text("Y")])]),
        1,
        1,
    );
    let after = before.replace(2, 6, &slice).unwrap();
    assert_eq!(
        after,
        doc(vec![p(vec![text("aX")]), p(vec![text("Yd")])])
    );
}

#[test]
fn slice_of_document_is_open_at_cut_points() {
    let doc = doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]);
    let slice = doc.slice(2, 6, false).unwrap();
    assert_eq!(slice.open_start(), 1);
    assert_eq!(slice.open_end(), 1);
    assert_eq!(slice.size(), 4);
    assert_eq!(slice.content().child_count(), 2);
}

#[test]
fn slice_then_replace_round_trips() {
    let source = doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]);
    let slice = source.slice(2, 6, false).unwrap();
    let target = doc(vec![p(vec![text("xy")])]);
    let after = target.replace(2, 2, &slice).unwrap();
    assert_eq!(
        after,
        doc(vec![p(vec![text("xb")]), p(vec![text("cy")])])
    );
}

#[test]
fn replace_preserves_marks_outside_range() {
    let before = doc(vec![p(vec![em("abc")])]);
    let after = before.replace(2, 3, &Slice::default()).unwrap();
    assert_eq!(after, doc(vec![p(vec![em("ac")])]));
}

#[test]
fn replace_refuses_slice_deeper_than_position() {
    let target = doc(vec![p(vec![text("xy")])]);
    let slice = Slice::new(
        Fragment::from_node(doc(vec![p(vec![text("z")])])),
        2,
        2,
    );
    assert!(target.replace(2, 2, &slice).is_err());
}

#[test]
fn replace_refuses_invalid_content() {
    // Emptying the document entirely: doc requires block+.
    let before = doc(vec![p(vec![text("ab")])]);
    assert!(before.replace(0, 4, &Slice::default()).is_err());
}

#[test]
fn delete_whole_paragraph_content_keeps_paragraph() {
    let before = doc(vec![p(vec![text("ab")])]);
    let after = before.replace(1, 3, &Slice::default()).unwrap();
    assert_eq!(after, doc(vec![p(vec![])]));
}

#[test]
fn insert_block_between_blocks() {
    let before = doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]);
    let slice = Slice::new(Fragment::from_node(hr()), 0, 0);
    let after = before.replace(4, 4, &slice).unwrap();
    assert_eq!(
        after,
        doc(vec![p(vec![text("ab")]), hr(), p(vec![text("cd")])])
    );
}

#[test]
fn max_open_opens_down_to_leaves() {
    let fragment = Fragment::from_node(blockquote(vec![p(vec![text("x")])]));
    let slice = Slice::max_open(fragment);
    assert_eq!(slice.open_start(), 2);
    assert_eq!(slice.open_end(), 2);
}

#[test]
fn insert_at_descends_into_open_content() {
    let slice = Slice::new(Fragment::from_node(p(vec![text("ab")])), 1, 1);
    let inserted = slice.insert_at(1, Fragment::from_node(text("X"))).unwrap();
    assert_eq!(inserted.content().child(0).text_content(), "aXb");
}

#[test]
fn remove_between_rejects_non_flat_range() {
    let slice = Slice::new(
        Fragment::from_vec(vec![p(vec![text("ab")]), p(vec![text("cd")])]),
        0,
        0,
    );
    assert!(slice.remove_between(2, 6).is_err());
    assert!(slice.remove_between(1, 3).is_ok());
}
