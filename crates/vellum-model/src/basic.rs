//! A ready-made schema for ordinary rich-text documents.
//!
//! Paragraphs, headings, blockquotes, code blocks, images, and the usual
//! inline marks. Serves as the default schema for the command-line tools and
//! as the fixture schema for tests across the workspace.

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::schema::{
    AttrSpec, AttrValidator, MarkSpec, NodeSpec, Schema, SchemaSpec,
};

/// The spec the basic schema is compiled from, for callers that want to
/// extend it.
pub fn spec() -> SchemaSpec {
    let nodes = vec![
        (
            "doc".to_string(),
            NodeSpec { content: Some("block+".into()), ..NodeSpec::default() },
        ),
        (
            "paragraph".to_string(),
            NodeSpec {
                content: Some("inline*".into()),
                group: Some("block".into()),
                ..NodeSpec::default()
            },
        ),
        (
            "blockquote".to_string(),
            NodeSpec {
                content: Some("block+".into()),
                group: Some("block".into()),
                defining: true,
                ..NodeSpec::default()
            },
        ),
        (
            "horizontal_rule".to_string(),
            NodeSpec { group: Some("block".into()), ..NodeSpec::default() },
        ),
        (
            "heading".to_string(),
            NodeSpec {
                content: Some("inline*".into()),
                group: Some("block".into()),
                defining: true,
                attrs: [(
                    "level".to_string(),
                    AttrSpec::with_default(Value::from(1)).validated(AttrValidator::Num),
                )]
                .into(),
                ..NodeSpec::default()
            },
        ),
        (
            "code_block".to_string(),
            NodeSpec {
                content: Some("text*".into()),
                marks: Some("".into()),
                group: Some("block".into()),
                defining: true,
                ..NodeSpec::default()
            },
        ),
        (
            "text".to_string(),
            NodeSpec { group: Some("inline".into()), ..NodeSpec::default() },
        ),
        (
            "image".to_string(),
            NodeSpec {
                inline: true,
                group: Some("inline".into()),
                attrs: [
                    ("src".to_string(), AttrSpec::required().validated(AttrValidator::Str)),
                    (
                        "alt".to_string(),
                        AttrSpec::with_default(Value::Null)
                            .validated(AttrValidator::Nullable(Box::new(AttrValidator::Str))),
                    ),
                    (
                        "title".to_string(),
                        AttrSpec::with_default(Value::Null)
                            .validated(AttrValidator::Nullable(Box::new(AttrValidator::Str))),
                    ),
                ]
                .into(),
                ..NodeSpec::default()
            },
        ),
        (
            "hard_break".to_string(),
            NodeSpec { inline: true, group: Some("inline".into()), ..NodeSpec::default() },
        ),
    ];
    let marks = vec![
        (
            "link".to_string(),
            MarkSpec {
                attrs: [
                    ("href".to_string(), AttrSpec::required().validated(AttrValidator::Str)),
                    (
                        "title".to_string(),
                        AttrSpec::with_default(Value::Null)
                            .validated(AttrValidator::Nullable(Box::new(AttrValidator::Str))),
                    ),
                ]
                .into(),
                ..MarkSpec::default()
            },
        ),
        ("em".to_string(), MarkSpec::default()),
        ("strong".to_string(), MarkSpec::default()),
        ("code".to_string(), MarkSpec::default()),
    ];
    SchemaSpec { nodes, marks, top_node: Some("doc".into()) }
}

static SCHEMA: Lazy<Schema> = Lazy::new(|| {
    match Schema::compile(spec()) {
        Ok(schema) => schema,
        Err(err) => panic!("built-in schema failed to compile: {err}"),
    }
});

/// The compiled basic schema.
pub fn schema() -> &'static Schema {
    &SCHEMA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles() {
        let schema = schema();
        assert_eq!(schema.top_node_type().name(), "doc");
        assert!(schema.node_type("paragraph").is_some());
        assert!(schema.mark_type("em").is_some());
    }

    #[test]
    fn code_block_rejects_marks() {
        let schema = schema();
        let code_block = schema.node_type("code_block").unwrap();
        let em = schema.mark_type("em").unwrap();
        assert!(!code_block.allows_mark_type(&em));
        assert!(schema.node_type("paragraph").unwrap().allows_mark_type(&em));
    }

    #[test]
    fn image_requires_src() {
        let schema = schema();
        assert!(schema.node_type("image").unwrap().has_required_attrs());
        assert!(schema
            .node("image", None, crate::Fragment::default(), vec![])
            .is_err());
    }
}
