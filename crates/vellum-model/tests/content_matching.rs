use vellum_model::Fragment;

mod common;
use common::*;

#[test]
fn match_walks_the_expression() {
    let doc_type = schema().node_type("doc").unwrap();
    let para = schema().node_type("paragraph").unwrap();
    let m = doc_type.content_match();
    assert!(!m.valid_end());
    let m = m.match_type(&para).unwrap();
    assert!(m.valid_end());
    assert!(m.match_type(&para).is_some());
}

#[test]
fn text_not_allowed_at_block_level() {
    let doc_type = schema().node_type("doc").unwrap();
    let text_type = schema().node_type("text").unwrap();
    assert!(doc_type.content_match().match_type(&text_type).is_none());
}

#[test]
fn valid_content_checks_marks_too() {
    let code = schema().node_type("code_block").unwrap();
    assert!(code.valid_content(&Fragment::from_node(text("x"))));
    assert!(!code.valid_content(&Fragment::from_node(em("x"))));
}

#[test]
fn fill_before_completes_required_content() {
    let doc_type = schema().node_type("doc").unwrap();
    // doc needs block+; an empty fragment must be padded with one block.
    let fill = doc_type
        .content_match()
        .fill_before(&Fragment::default(), true, 0)
        .unwrap();
    assert_eq!(fill.child_count(), 1);
    assert_eq!(fill.child(0).node_type().name(), "paragraph");
}

#[test]
fn fill_before_is_empty_when_content_already_fits() {
    let doc_type = schema().node_type("doc").unwrap();
    let fill = doc_type
        .content_match()
        .fill_before(&Fragment::from_node(p(vec![])), true, 0)
        .unwrap();
    assert_eq!(fill.child_count(), 0);
}

#[test]
fn create_and_fill_builds_minimal_valid_node() {
    let doc_type = schema().node_type("doc").unwrap();
    let node = doc_type.create_and_fill(Fragment::default()).unwrap();
    assert!(node.check().is_ok());
    assert_eq!(node.child_count(), 1);
}

#[test]
fn find_wrapping_discovers_intermediate_nodes() {
    let bq = schema().node_type("blockquote").unwrap();
    let para = schema().node_type("paragraph").unwrap();
    let text_type = schema().node_type("text").unwrap();

    // A paragraph fits into a blockquote directly.
    let direct = bq.content_match().find_wrapping(&para).unwrap();
    assert!(direct.is_empty());

    // Text needs a textblock wrapper to sit inside a blockquote.
    let wrap = bq.content_match().find_wrapping(&text_type).unwrap();
    assert_eq!(wrap.len(), 1);
    assert_eq!(wrap[0].name(), "paragraph");
}

#[test]
fn default_type_skips_types_with_required_attrs() {
    let para = schema().node_type("paragraph").unwrap();
    // inline* matches text, image, and hard_break; text is never a default
    // and image has a required src, so hard_break wins.
    let default = para.content_match().default_type().unwrap();
    assert_eq!(default.name(), "hard_break");

    let doc_default = schema()
        .node_type("doc")
        .unwrap()
        .content_match()
        .default_type()
        .unwrap();
    assert_eq!(doc_default.name(), "paragraph");
}

#[test]
fn compatible_content_overlaps() {
    let para = schema().node_type("paragraph").unwrap();
    let heading = schema().node_type("heading").unwrap();
    let doc_type = schema().node_type("doc").unwrap();
    assert!(para.compatible_content(&heading));
    assert!(!para.compatible_content(&doc_type));
}
