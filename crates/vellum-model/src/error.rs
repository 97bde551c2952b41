//! Error types for the document model.
//!
//! Two failure classes exist and they are deliberately kept apart:
//!
//! - schema construction problems (`SchemaError`) are fatal and surface once,
//!   when the registry is compiled
//! - edit-time problems (`ResolveError`, `ReplaceError`, `ModelError`) are
//!   typed values that callers can branch on; none of them leave partially
//!   built structures behind, since every model value is immutable

use thiserror::Error;

/// Fatal errors raised while compiling a [`crate::Schema`] from its spec.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A content expression referenced a name that is neither a node type nor
    /// a group.
    #[error("unknown name '{name}' in content expression for node '{node}'")]
    UnknownContentName { node: String, name: String },

    /// A content expression could not be parsed.
    #[error("malformed content expression for node '{node}': {reason}")]
    MalformedExpression { node: String, reason: String },

    /// The `marks` spec of a node referenced an unknown mark name or group.
    #[error("unknown mark name '{name}' in marks spec for node '{node}'")]
    UnknownMarkName { node: String, name: String },

    /// The `excludes` spec of a mark referenced an unknown mark name or group.
    #[error("unknown mark name '{name}' in excludes spec for mark '{mark}'")]
    UnknownExcludedMark { mark: String, name: String },

    /// The configured top node does not exist.
    #[error("schema is missing its top node type '{0}'")]
    UnknownTopNode(String),

    /// The spec is missing a text node type.
    #[error("every schema needs a 'text' node type")]
    MissingTextType,

    /// Two node or mark types share a name.
    #[error("duplicate type name '{0}' in schema spec")]
    DuplicateName(String),

    /// An attribute default does not pass the attribute's own validator.
    #[error("default for attribute '{attr}' of '{owner}' fails its validator")]
    InvalidDefault { owner: String, attr: String },
}

/// A position could not be resolved inside a document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("position {pos} outside of document of size {size}")]
    OutOfRange { pos: usize, size: usize },
}

/// The low-level replace algorithm refused a slice.
///
/// These correspond to structurally impossible replaces; higher layers treat
/// them as a refusal, not a crash.
#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error("inserted content deeper than insertion position")]
    InsertTooDeep,

    #[error("inconsistent open depths: from depth {from_depth} - open start {open_start} != to depth {to_depth} - open end {open_end}")]
    InconsistentOpenDepths {
        from_depth: usize,
        open_start: usize,
        to_depth: usize,
        open_end: usize,
    },

    #[error("cannot join {0} onto {1}")]
    CannotJoin(String, String),

    #[error("invalid content for node {0}")]
    InvalidContent(String),

    #[error("removing a non-flat range from a slice")]
    NonFlatRemove,

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Edit-time model errors: invalid attributes, bad JSON input, content that
/// does not satisfy a node type's content expression.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    #[error("unknown mark type '{0}'")]
    UnknownMarkType(String),

    #[error("unknown attribute '{attr}' for '{owner}'")]
    UnknownAttr { owner: String, attr: String },

    #[error("missing required attribute '{attr}' for '{owner}'")]
    MissingAttr { owner: String, attr: String },

    #[error("invalid value for attribute '{attr}' of '{owner}'")]
    InvalidAttr { owner: String, attr: String },

    #[error("invalid content for node type '{0}'")]
    InvalidContent(String),

    #[error("node type '{0}' does not allow mark '{1}'")]
    DisallowedMark(String, String),

    #[error("text nodes must have a non-empty text field")]
    EmptyText,

    #[error("text nodes are created with Schema::text, not NodeType::create")]
    TextNodeCreate,

    #[error("invalid document JSON: {0}")]
    InvalidJson(String),
}
