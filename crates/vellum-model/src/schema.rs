//! The schema registry: node types, mark types, attribute specs.
//!
//! A [`Schema`] is compiled once from a [`SchemaSpec`] and then shared
//! read-only by every document, resolved position, and transform derived from
//! it. Compilation is strict and fail-fast: malformed content expressions,
//! unknown group references, and invalid attribute defaults are all
//! [`SchemaError`]s, never edit-time surprises.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::content::{compile_content, ContentMatch, Dfa};
use crate::error::{ModelError, SchemaError};
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::node::Node;

/// Attribute values, keyed by attribute name. Stored behind `Arc` on nodes
/// and marks so unchanged attribute sets are shared across document versions.
pub type Attrs = BTreeMap<String, Value>;

/// Closed set of attribute validators, evaluated generically.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValidator {
    /// Any JSON string.
    Str,
    /// Any JSON number.
    Num,
    /// A JSON boolean.
    Bool,
    /// One of a fixed set of string literals.
    OneOf(Vec<String>),
    /// `null`, or a value passing the inner validator.
    Nullable(Box<AttrValidator>),
}

impl AttrValidator {
    pub fn check(&self, value: &Value) -> bool {
        match self {
            AttrValidator::Str => value.is_string(),
            AttrValidator::Num => value.is_number(),
            AttrValidator::Bool => value.is_boolean(),
            AttrValidator::OneOf(options) => value
                .as_str()
                .is_some_and(|s| options.iter().any(|o| o == s)),
            AttrValidator::Nullable(inner) => value.is_null() || inner.check(value),
        }
    }
}

/// Spec for one attribute of a node or mark type.
#[derive(Debug, Clone, Default)]
pub struct AttrSpec {
    /// Value used when the attribute is not given. Attributes without a
    /// default are required.
    pub default: Option<Value>,
    pub validate: Option<AttrValidator>,
}

impl AttrSpec {
    pub fn required() -> AttrSpec {
        AttrSpec::default()
    }

    pub fn with_default(value: Value) -> AttrSpec {
        AttrSpec { default: Some(value), validate: None }
    }

    pub fn validated(mut self, validator: AttrValidator) -> AttrSpec {
        self.validate = Some(validator);
        self
    }
}

/// Spec for one node type.
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    /// Content expression; empty or absent for leaf types.
    pub content: Option<String>,
    /// Allowed marks: `"_"` for all, `""` for none, or a space-separated list
    /// of mark names and groups. Defaults to all for nodes with inline
    /// content and none otherwise.
    pub marks: Option<String>,
    /// Space-separated group memberships (e.g. `"block"`).
    pub group: Option<String>,
    pub inline: bool,
    /// Defining nodes keep their identity when content is replaced around
    /// them (used by the range-replace heuristics).
    pub defining: bool,
    pub attrs: BTreeMap<String, AttrSpec>,
}

/// Spec for one mark type.
#[derive(Debug, Clone, Default)]
pub struct MarkSpec {
    pub attrs: BTreeMap<String, AttrSpec>,
    /// Marks that may not coexist with this one: `"_"` for all, `""` for
    /// none, or a space-separated list. Defaults to the mark itself.
    pub excludes: Option<String>,
    pub group: Option<String>,
}

/// The input to [`Schema::compile`]. Node order defines content-expression
/// resolution order; mark order defines mark rank (canonical sort order).
#[derive(Debug, Clone, Default)]
pub struct SchemaSpec {
    pub nodes: Vec<(String, NodeSpec)>,
    pub marks: Vec<(String, MarkSpec)>,
    /// Name of the top node type; defaults to `"doc"`.
    pub top_node: Option<String>,
}

pub(crate) struct NodeData {
    pub(crate) name: String,
    pub(crate) attrs: Vec<(String, AttrSpec)>,
    pub(crate) default_attrs: Option<Arc<Attrs>>,
    pub(crate) inline: bool,
    pub(crate) is_text: bool,
    pub(crate) defining: bool,
    pub(crate) leaf: bool,
    pub(crate) dfa: Arc<Dfa>,
    pub(crate) inline_content: bool,
    /// `None` = all marks allowed.
    pub(crate) mark_set: Option<Vec<usize>>,
}

pub(crate) struct MarkData {
    pub(crate) name: String,
    pub(crate) attrs: Vec<(String, AttrSpec)>,
    pub(crate) default_attrs: Option<Arc<Attrs>>,
    pub(crate) excluded: Vec<usize>,
    pub(crate) rank: usize,
}

pub(crate) struct SchemaInner {
    nodes: Vec<NodeData>,
    marks: Vec<MarkData>,
    node_index: HashMap<String, usize>,
    mark_index: HashMap<String, usize>,
    top: usize,
    text: usize,
}

/// Immutable registry of node and mark types. Cheap to clone; all clones
/// share one compiled registry.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Schema {}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("nodes", &self.inner.nodes.iter().map(|n| &n.name).collect::<Vec<_>>())
            .field("marks", &self.inner.marks.iter().map(|m| &m.name).collect::<Vec<_>>())
            .finish()
    }
}

fn compute_defaults(
    owner: &str,
    attrs: &[(String, AttrSpec)],
) -> Result<Option<Arc<Attrs>>, SchemaError> {
    let mut defaults = Attrs::new();
    for (name, spec) in attrs {
        match &spec.default {
            Some(value) => {
                if let Some(validator) = &spec.validate {
                    if !validator.check(value) {
                        return Err(SchemaError::InvalidDefault {
                            owner: owner.to_string(),
                            attr: name.clone(),
                        });
                    }
                }
                defaults.insert(name.clone(), value.clone());
            }
            None => return Ok(None),
        }
    }
    Ok(Some(Arc::new(defaults)))
}

impl Schema {
    /// Compile a spec into an immutable schema.
    pub fn compile(spec: SchemaSpec) -> Result<Schema, SchemaError> {
        let top_name = spec.top_node.clone().unwrap_or_else(|| "doc".to_string());

        // Name and group resolution tables for content expressions.
        let mut node_index: HashMap<String, usize> = HashMap::new();
        let mut lookup: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, (name, node_spec)) in spec.nodes.iter().enumerate() {
            if node_index.insert(name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateName(name.clone()));
            }
            lookup.entry(name.clone()).or_default().push(i);
            if let Some(groups) = &node_spec.group {
                for group in groups.split_whitespace() {
                    lookup.entry(group.to_string()).or_default().push(i);
                }
            }
        }
        let top = *node_index
            .get(&top_name)
            .ok_or(SchemaError::UnknownTopNode(top_name))?;
        let text = *node_index.get("text").ok_or(SchemaError::MissingTextType)?;

        let mut mark_index: HashMap<String, usize> = HashMap::new();
        let mut mark_lookup: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, (name, mark_spec)) in spec.marks.iter().enumerate() {
            if node_index.contains_key(name) || mark_index.insert(name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateName(name.clone()));
            }
            mark_lookup.entry(name.clone()).or_default().push(i);
            if let Some(groups) = &mark_spec.group {
                for group in groups.split_whitespace() {
                    mark_lookup.entry(group.to_string()).or_default().push(i);
                }
            }
        }

        let mut nodes: Vec<NodeData> = Vec::with_capacity(spec.nodes.len());
        for (name, node_spec) in &spec.nodes {
            let is_text = name == "text";
            let content = node_spec.content.as_deref().unwrap_or("");
            let dfa = Arc::new(compile_content(name, content, &lookup)?);
            let attrs: Vec<(String, AttrSpec)> = node_spec
                .attrs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let default_attrs = compute_defaults(name, &attrs)?;
            nodes.push(NodeData {
                name: name.clone(),
                attrs,
                default_attrs,
                inline: node_spec.inline || is_text,
                is_text,
                defining: node_spec.defining,
                leaf: content.trim().is_empty(),
                dfa,
                inline_content: false,
                mark_set: None,
            });
        }

        // Inline-content flag needs every node's inline flag, so it runs as a
        // second pass.
        for i in 0..nodes.len() {
            let inline_content = match nodes[i].dfa.states[0].edges.first() {
                Some(&(term, _)) => nodes[term].inline,
                None => false,
            };
            nodes[i].inline_content = inline_content;
        }

        // Allowed-mark sets.
        for (i, (name, node_spec)) in spec.nodes.iter().enumerate() {
            let mark_set = match node_spec.marks.as_deref() {
                Some("_") => None,
                Some("") => Some(Vec::new()),
                Some(list) => {
                    let mut set = Vec::new();
                    for item in list.split_whitespace() {
                        let members = mark_lookup.get(item).ok_or_else(|| {
                            SchemaError::UnknownMarkName {
                                node: name.clone(),
                                name: item.to_string(),
                            }
                        })?;
                        for &m in members {
                            if !set.contains(&m) {
                                set.push(m);
                            }
                        }
                    }
                    Some(set)
                }
                None if nodes[i].inline_content => None,
                None => Some(Vec::new()),
            };
            nodes[i].mark_set = mark_set;
        }

        let mut marks: Vec<MarkData> = Vec::with_capacity(spec.marks.len());
        for (rank, (name, mark_spec)) in spec.marks.iter().enumerate() {
            let attrs: Vec<(String, AttrSpec)> = mark_spec
                .attrs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let default_attrs = compute_defaults(name, &attrs)?;
            let excluded = match mark_spec.excludes.as_deref() {
                Some("") => Vec::new(),
                Some("_") => (0..spec.marks.len()).collect(),
                Some(list) => {
                    let mut set = Vec::new();
                    for item in list.split_whitespace() {
                        let members = mark_lookup.get(item).ok_or_else(|| {
                            SchemaError::UnknownExcludedMark {
                                mark: name.clone(),
                                name: item.to_string(),
                            }
                        })?;
                        for &m in members {
                            if !set.contains(&m) {
                                set.push(m);
                            }
                        }
                    }
                    set
                }
                None => vec![rank],
            };
            marks.push(MarkData { name: name.clone(), attrs, default_attrs, excluded, rank });
        }

        Ok(Schema {
            inner: Arc::new(SchemaInner { nodes, marks, node_index, mark_index, top, text }),
        })
    }

    /// Look up a node type by name.
    pub fn node_type(&self, name: &str) -> Option<NodeType> {
        self.inner
            .node_index
            .get(name)
            .map(|&index| NodeType { schema: self.clone(), index })
    }

    /// Look up a mark type by name.
    pub fn mark_type(&self, name: &str) -> Option<MarkType> {
        self.inner
            .mark_index
            .get(name)
            .map(|&index| MarkType { schema: self.clone(), index })
    }

    /// The schema's top node type (usually `doc`).
    pub fn top_node_type(&self) -> NodeType {
        NodeType { schema: self.clone(), index: self.inner.top }
    }

    /// Create a text node.
    pub fn text(&self, text: impl Into<String>, marks: Vec<Mark>) -> Node {
        let node_type = NodeType { schema: self.clone(), index: self.inner.text };
        Node::new_text(node_type, text.into(), marks)
    }

    /// Convenience constructor: look up a type by name and create a node.
    pub fn node(
        &self,
        name: &str,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Result<Node, ModelError> {
        let node_type = self
            .node_type(name)
            .ok_or_else(|| ModelError::UnknownNodeType(name.to_string()))?;
        node_type.create(attrs, content, marks)
    }

    /// Create a mark, filling attribute defaults.
    pub fn mark(&self, name: &str, attrs: Option<&Attrs>) -> Result<Mark, ModelError> {
        let mark_type = self
            .mark_type(name)
            .ok_or_else(|| ModelError::UnknownMarkType(name.to_string()))?;
        mark_type.create(attrs)
    }

    pub(crate) fn node_data(&self, index: usize) -> &NodeData {
        &self.inner.nodes[index]
    }

    pub(crate) fn mark_data(&self, index: usize) -> &MarkData {
        &self.inner.marks[index]
    }

    pub(crate) fn node_dfa(&self, index: usize) -> &Dfa {
        &self.inner.nodes[index].dfa
    }

    pub(crate) fn node_name(&self, index: usize) -> &str {
        &self.inner.nodes[index].name
    }

    pub(crate) fn node_type_at(&self, index: usize) -> NodeType {
        NodeType { schema: self.clone(), index }
    }
}

/// Validate given attributes against the declared specs, filling defaults.
fn compute_attrs(
    owner: &str,
    specs: &[(String, AttrSpec)],
    defaults: &Option<Arc<Attrs>>,
    given: Option<&Attrs>,
) -> Result<Arc<Attrs>, ModelError> {
    let given = match given {
        Some(g) if !g.is_empty() => g,
        _ => {
            return match defaults {
                Some(d) => Ok(d.clone()),
                None => {
                    let attr = specs
                        .iter()
                        .find(|(_, s)| s.default.is_none())
                        .map(|(n, _)| n.clone())
                        .unwrap_or_default();
                    Err(ModelError::MissingAttr { owner: owner.to_string(), attr })
                }
            };
        }
    };
    for key in given.keys() {
        if !specs.iter().any(|(name, _)| name == key) {
            return Err(ModelError::UnknownAttr {
                owner: owner.to_string(),
                attr: key.clone(),
            });
        }
    }
    let mut built = Attrs::new();
    for (name, spec) in specs {
        let value = match given.get(name) {
            Some(v) => v.clone(),
            None => spec.default.clone().ok_or_else(|| ModelError::MissingAttr {
                owner: owner.to_string(),
                attr: name.clone(),
            })?,
        };
        if let Some(validator) = &spec.validate {
            if !validator.check(&value) {
                return Err(ModelError::InvalidAttr {
                    owner: owner.to_string(),
                    attr: name.clone(),
                });
            }
        }
        built.insert(name.clone(), value);
    }
    Ok(Arc::new(built))
}

/// Handle to a node type inside a schema. Cheap to clone and compare.
#[derive(Clone)]
pub struct NodeType {
    pub(crate) schema: Schema,
    pub(crate) index: usize,
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.index == other.index
    }
}

impl Eq for NodeType {}

impl std::fmt::Debug for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeType({})", self.name())
    }
}

impl NodeType {
    fn data(&self) -> &NodeData {
        self.schema.node_data(self.index)
    }

    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_text(&self) -> bool {
        self.data().is_text
    }

    pub fn is_inline(&self) -> bool {
        self.data().inline
    }

    pub fn is_block(&self) -> bool {
        !self.data().inline
    }

    pub fn is_leaf(&self) -> bool {
        self.data().leaf
    }

    /// A block node with inline content.
    pub fn is_textblock(&self) -> bool {
        let data = self.data();
        !data.inline && data.inline_content
    }

    pub fn inline_content(&self) -> bool {
        self.data().inline_content
    }

    pub fn is_defining(&self) -> bool {
        self.data().defining
    }

    pub fn has_required_attrs(&self) -> bool {
        self.data().attrs.iter().any(|(_, spec)| spec.default.is_none())
    }

    /// Start state of this type's content automaton.
    pub fn content_match(&self) -> ContentMatch {
        ContentMatch { schema: self.schema.clone(), type_index: self.index, state: 0 }
    }

    /// Whether `fragment` fully satisfies this type's content expression and
    /// mark constraints.
    pub fn valid_content(&self, fragment: &Fragment) -> bool {
        match self.content_match().match_fragment(fragment) {
            Some(result) if result.valid_end() => (0..fragment.child_count())
                .all(|i| self.allows_marks(fragment.child(i).marks())),
            _ => false,
        }
    }

    /// Whether content valid in `other` could appear in this type.
    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self == other || self.content_match().compatible(&other.content_match())
    }

    pub fn allows_mark_type(&self, mark_type: &MarkType) -> bool {
        match &self.data().mark_set {
            None => true,
            Some(set) => set.contains(&mark_type.index),
        }
    }

    pub fn allows_marks(&self, marks: &[Mark]) -> bool {
        marks.iter().all(|m| self.allows_mark_type(m.mark_type()))
    }

    /// Filter a mark set down to the marks this type allows.
    pub fn allowed_marks(&self, marks: &[Mark]) -> Vec<Mark> {
        marks
            .iter()
            .filter(|m| self.allows_mark_type(m.mark_type()))
            .cloned()
            .collect()
    }

    pub(crate) fn compute_attrs(&self, given: Option<&Attrs>) -> Result<Arc<Attrs>, ModelError> {
        let data = self.data();
        compute_attrs(&data.name, &data.attrs, &data.default_attrs, given)
    }

    /// Create a node of this type, validating attributes and filling
    /// defaults. Content validity is not checked; use
    /// [`NodeType::create_checked`] for that.
    pub fn create(
        &self,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Result<Node, ModelError> {
        if self.is_text() {
            return Err(ModelError::TextNodeCreate);
        }
        Ok(Node::new(self.clone(), self.compute_attrs(attrs)?, content, marks))
    }

    /// Like [`NodeType::create`], but also checks the content expression and
    /// mark constraints.
    pub fn create_checked(
        &self,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Result<Node, ModelError> {
        if !self.valid_content(&content) {
            return Err(ModelError::InvalidContent(self.name().to_string()));
        }
        self.create(attrs, content, marks)
    }

    /// Create a node with default attributes, growing `content` at both ends
    /// until it satisfies the content expression. `None` when that is not
    /// possible (required attributes, unfillable content).
    pub fn create_and_fill(&self, content: Fragment) -> Option<Node> {
        let attrs = self.data().default_attrs.clone()?;
        let content = if content.size() > 0 {
            let before = self.content_match().fill_before(&content, false, 0)?;
            before.append(content)
        } else {
            content
        };
        let matched = self.content_match().match_fragment(&content)?;
        let after = matched.fill_before(&Fragment::default(), true, 0)?;
        Some(Node::new(self.clone(), attrs, content.append(after), Vec::new()))
    }
}

/// Handle to a mark type inside a schema.
#[derive(Clone)]
pub struct MarkType {
    pub(crate) schema: Schema,
    pub(crate) index: usize,
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.index == other.index
    }
}

impl Eq for MarkType {}

impl std::fmt::Debug for MarkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MarkType({})", self.name())
    }
}

impl MarkType {
    fn data(&self) -> &MarkData {
        self.schema.mark_data(self.index)
    }

    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// Position in the canonical mark ordering.
    pub fn rank(&self) -> usize {
        self.data().rank
    }

    /// Whether this mark type rules out `other` in the same set. A mark
    /// always excludes itself unless its spec says otherwise.
    pub fn excludes(&self, other: &MarkType) -> bool {
        self.data().excluded.contains(&other.index)
    }

    /// Create a mark of this type, validating attributes.
    pub fn create(&self, attrs: Option<&Attrs>) -> Result<Mark, ModelError> {
        let data = self.data();
        let attrs = compute_attrs(&data.name, &data.attrs, &data.default_attrs, attrs)?;
        Ok(Mark::new(self.clone(), attrs))
    }

    /// The first mark of this type in `set`.
    pub fn is_in_set<'a>(&self, set: &'a [Mark]) -> Option<&'a Mark> {
        set.iter().find(|m| m.mark_type() == self)
    }
}
