mod common;
use common::*;

// doc(p("ab"), blockquote(p("cd")))
//
//   0   1  2  3   4    5   6  7  8   9    10
//    <p> a  b </p> <bq> <p> c  d </p> </bq>
fn sample() -> vellum_model::Node {
    doc(vec![p(vec![text("ab")]), blockquote(vec![p(vec![text("cd")])])])
}

#[test]
fn node_sizes() {
    let doc = sample();
    assert_eq!(doc.child(0).node_size(), 4);
    assert_eq!(doc.child(1).node_size(), 6);
    assert_eq!(doc.content().size(), 10);
}

#[test]
fn text_sizes_count_chars_not_bytes() {
    let doc = doc(vec![p(vec![text("héllo")])]);
    assert_eq!(doc.child(0).node_size(), 7);
    assert_eq!(doc.content().size(), 7);
}

#[test]
fn resolve_inside_paragraph() {
    let doc = sample();
    let pos = doc.resolve(2).unwrap();
    assert_eq!(pos.depth(), 1);
    assert_eq!(pos.parent().node_type().name(), "paragraph");
    assert_eq!(pos.parent_offset(), 1);
    assert_eq!(pos.start(1), 1);
    assert_eq!(pos.end(1), 3);
    assert_eq!(pos.before(1), Some(0));
    assert_eq!(pos.after(1), Some(4));
    assert_eq!(pos.text_offset(), 1);
}

#[test]
fn resolve_nested() {
    let doc = sample();
    let pos = doc.resolve(7).unwrap();
    assert_eq!(pos.depth(), 2);
    assert_eq!(pos.node(0).node_type().name(), "doc");
    assert_eq!(pos.node(1).node_type().name(), "blockquote");
    assert_eq!(pos.node(2).node_type().name(), "paragraph");
    assert_eq!(pos.start(2), 6);
    assert_eq!(pos.before(2), Some(5));
    assert_eq!(pos.after(2), Some(9));
}

#[test]
fn resolve_rejects_out_of_range() {
    let doc = sample();
    assert!(doc.resolve(10).is_ok());
    assert!(doc.resolve(11).is_err());
}

#[test]
fn node_before_and_after() {
    let doc = sample();
    let boundary = doc.resolve(4).unwrap();
    assert_eq!(boundary.node_before().unwrap().node_type().name(), "paragraph");
    assert_eq!(boundary.node_after().unwrap().node_type().name(), "blockquote");

    let inside_text = doc.resolve(2).unwrap();
    assert_eq!(inside_text.node_before().unwrap().text_str(), "a");
    assert_eq!(inside_text.node_after().unwrap().text_str(), "b");
}

#[test]
fn shared_depth() {
    let doc = sample();
    let pos = doc.resolve(6).unwrap();
    assert_eq!(pos.shared_depth(8), 2);
    assert_eq!(pos.shared_depth(9), 1);
    assert_eq!(pos.shared_depth(2), 0);
}

#[test]
fn block_range_spans_siblings() {
    let doc = sample();
    let from = doc.resolve(2).unwrap();
    let to = doc.resolve(7).unwrap();
    let range = from.block_range(&to, None).unwrap();
    assert_eq!(range.depth(), 0);
    assert_eq!(range.start(), 0);
    assert_eq!(range.end(), 10);
    assert_eq!(range.start_index(), 0);
    assert_eq!(range.end_index(), 2);
}

#[test]
fn block_range_within_one_textblock() {
    let doc = sample();
    let from = doc.resolve(6).unwrap();
    let to = doc.resolve(8).unwrap();
    let range = from.block_range(&to, None).unwrap();
    assert_eq!(range.depth(), 1);
    assert_eq!(range.parent().node_type().name(), "blockquote");
}

#[test]
fn node_at_finds_descendants() {
    let doc = sample();
    assert_eq!(doc.node_at(0).unwrap().node_type().name(), "paragraph");
    assert_eq!(doc.node_at(1).unwrap().text_str(), "ab");
    assert_eq!(doc.node_at(4).unwrap().node_type().name(), "blockquote");
    assert_eq!(doc.node_at(6).unwrap().text_str(), "cd");
}

#[test]
fn text_between_joins_blocks() {
    let doc = sample();
    assert_eq!(doc.text_between(0, 10, "/"), "ab/cd");
    assert_eq!(doc.text_content(), "abcd");
    assert_eq!(doc.text_between(2, 7, "/"), "b/c");
}
