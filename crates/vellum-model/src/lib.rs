//! Document model: schema, immutable tree, positions, and replace.
//!
//! Documents are persistent trees of [`Node`]s validated against a
//! [`Schema`]. Every value here is immutable; edits build a new document
//! that shares unchanged subtrees with the old one. Positions are plain
//! integers counting boundary tokens and text characters, resolved on
//! demand into a [`ResolvedPos`].

pub mod basic;
mod content;
mod error;
mod fragment;
mod mark;
mod node;
mod resolve;
mod schema;
mod slice;

pub use content::ContentMatch;
pub use error::{ModelError, ReplaceError, ResolveError, SchemaError};
pub use fragment::{Fragment, Index};
pub use mark::Mark;
pub use node::Node;
pub use resolve::{NodeRange, ResolvedPos};
pub use schema::{
    AttrSpec, AttrValidator, Attrs, MarkSpec, MarkType, NodeSpec, NodeType, Schema, SchemaSpec,
};
pub use slice::Slice;

/// Build an [`Attrs`] map from `"key" => value` pairs. Values go through
/// [`serde_json::json!`], so literals, variables, and nested JSON all work.
#[macro_export]
macro_rules! attrs {
    () => { $crate::Attrs::new() };
    ($($key:literal => $value:tt),+ $(,)?) => {{
        let mut map = $crate::Attrs::new();
        $(map.insert($key.to_string(), ::serde_json::json!($value));)+
        map
    }};
}
