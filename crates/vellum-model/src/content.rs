//! Content expression compilation and matching.
//!
//! A node type's `content` expression (for example `"paragraph block*"` or
//! `"(heading | paragraph)+"`) is parsed into an expression tree, lowered to a
//! nondeterministic automaton, and then converted to a deduplicated
//! deterministic automaton at schema-compile time. Matching existing content
//! and computing fill-in content are both walks over that automaton, so they
//! never re-parse anything and never fail on a well-formed document.

use std::collections::{HashMap, VecDeque};

use crate::error::SchemaError;
use crate::fragment::Fragment;
use crate::node::Node;
use crate::schema::{NodeType, Schema};

/// Compiled deterministic automaton for one content expression.
///
/// Edge terms and targets are node type indices into the owning schema, which
/// keeps the automaton free of reference cycles back into the schema.
#[derive(Debug)]
pub(crate) struct Dfa {
    pub(crate) states: Vec<DfaState>,
}

#[derive(Debug)]
pub(crate) struct DfaState {
    pub(crate) valid_end: bool,
    /// `(node type index, target state)`, sorted by type index.
    pub(crate) edges: Vec<(usize, usize)>,
}

impl Dfa {
    /// The automaton for an empty content expression: a single accepting
    /// state with no edges. Used for leaf node types.
    pub(crate) fn empty() -> Dfa {
        Dfa {
            states: vec![DfaState { valid_end: true, edges: Vec::new() }],
        }
    }
}

/// A state in a node type's compiled content automaton.
///
/// Obtained from [`NodeType::content_match`] and advanced with
/// [`ContentMatch::match_type`]. Values are cheap to clone.
#[derive(Clone)]
pub struct ContentMatch {
    pub(crate) schema: Schema,
    pub(crate) type_index: usize,
    pub(crate) state: usize,
}

impl std::fmt::Debug for ContentMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentMatch")
            .field("type", &self.schema.node_name(self.type_index))
            .field("state", &self.state)
            .field("valid_end", &self.valid_end())
            .finish()
    }
}

impl PartialEq for ContentMatch {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
            && self.type_index == other.type_index
            && self.state == other.state
    }
}

impl ContentMatch {
    fn dfa(&self) -> &Dfa {
        self.schema.node_dfa(self.type_index)
    }

    fn at(&self, state: usize) -> ContentMatch {
        ContentMatch { schema: self.schema.clone(), type_index: self.type_index, state }
    }

    /// True when the automaton may stop here.
    pub fn valid_end(&self) -> bool {
        self.dfa().states[self.state].valid_end
    }

    /// Match one node type, returning the next state or `None` when the type
    /// is not a legal continuation.
    pub fn match_type(&self, node_type: &NodeType) -> Option<ContentMatch> {
        let edges = &self.dfa().states[self.state].edges;
        edges
            .iter()
            .find(|(term, _)| *term == node_type.index)
            .map(|&(_, to)| self.at(to))
    }

    /// Match all children of a fragment in order.
    pub fn match_fragment(&self, fragment: &Fragment) -> Option<ContentMatch> {
        self.match_fragment_range(fragment, 0, fragment.child_count())
    }

    /// Match children `start..end` of a fragment in order.
    pub fn match_fragment_range(
        &self,
        fragment: &Fragment,
        start: usize,
        end: usize,
    ) -> Option<ContentMatch> {
        let mut cur = self.clone();
        for i in start..end {
            cur = cur.match_type(fragment.child(i).node_type())?;
        }
        Some(cur)
    }

    /// Whether the node types matched by this state are inline.
    pub fn inline_content(&self) -> bool {
        match self.dfa().states[self.state].edges.first() {
            Some(&(term, _)) => self.schema.node_type_at(term).is_inline(),
            None => false,
        }
    }

    /// Number of outgoing edges from this state.
    pub fn edge_count(&self) -> usize {
        self.dfa().states[self.state].edges.len()
    }

    /// The node type of edge `i`, or `None` when out of range.
    pub fn edge(&self, i: usize) -> Option<NodeType> {
        self.dfa().states[self.state]
            .edges
            .get(i)
            .map(|&(term, _)| self.schema.node_type_at(term))
    }

    /// The first matchable node type that can be created without explicit
    /// attributes; what insertion code uses as the "default" block type.
    pub fn default_type(&self) -> Option<NodeType> {
        self.dfa().states[self.state].edges.iter().find_map(|&(term, _)| {
            let node_type = self.schema.node_type_at(term);
            (!node_type.is_text() && !node_type.has_required_attrs()).then_some(node_type)
        })
    }

    /// Whether two match states accept at least one common node type.
    pub fn compatible(&self, other: &ContentMatch) -> bool {
        self.dfa().states[self.state].edges.iter().any(|&(term, _)| {
            other.dfa().states[other.state]
                .edges
                .iter()
                .any(|&(other_term, _)| term == other_term)
        })
    }

    /// Compute the minimal content needed in front of `after` (starting at
    /// child `start_index`) so that this state matches it. When `to_end` is
    /// set, the combined match must also reach a valid end state. Returns
    /// `None` when no amount of default content makes the fit work.
    pub fn fill_before(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
    ) -> Option<Fragment> {
        let mut seen = vec![self.state];
        self.fill_search(after, to_end, start_index, &mut seen, &mut Vec::new())
    }

    fn fill_search(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
        seen: &mut Vec<usize>,
        types: &mut Vec<NodeType>,
    ) -> Option<Fragment> {
        if let Some(finished) =
            self.match_fragment_range(after, start_index, after.child_count())
        {
            if !to_end || finished.valid_end() {
                let filled: Option<Vec<Node>> = types
                    .iter()
                    .map(|t| t.create_and_fill(Fragment::default()))
                    .collect();
                if let Some(nodes) = filled {
                    return Some(Fragment::from_vec(nodes));
                }
            }
        }
        let edges = self.dfa().states[self.state].edges.clone();
        for (term, to) in edges {
            let node_type = self.schema.node_type_at(term);
            if node_type.is_text() || node_type.has_required_attrs() || seen.contains(&to) {
                continue;
            }
            seen.push(to);
            types.push(node_type);
            if let Some(found) = self.at(to).fill_search(after, to_end, start_index, seen, types) {
                return Some(found);
            }
            types.pop();
        }
        None
    }

    /// Breadth-first search for a chain of wrapper node types whose content
    /// expressions connect this state to `target`. An empty result means the
    /// target fits directly.
    pub fn find_wrapping(&self, target: &NodeType) -> Option<Vec<NodeType>> {
        struct Link {
            node_type: Option<NodeType>,
            via: Option<usize>,
            match_state: ContentMatch,
        }

        let mut seen: Vec<usize> = Vec::new();
        let mut links = vec![Link { node_type: None, via: None, match_state: self.clone() }];
        let mut active: VecDeque<usize> = VecDeque::from([0]);

        while let Some(current) = active.pop_front() {
            let match_state = links[current].match_state.clone();
            if match_state.match_type(target).is_some() {
                let mut result = Vec::new();
                let mut link = current;
                while let Some(node_type) = links[link].node_type.clone() {
                    result.push(node_type);
                    link = links[link].via.unwrap_or(0);
                }
                result.reverse();
                return Some(result);
            }
            let edges = match_state.dfa().states[match_state.state].edges.clone();
            for (term, to) in edges {
                let node_type = match_state.schema.node_type_at(term);
                let enterable = !node_type.is_leaf()
                    && !node_type.has_required_attrs()
                    && !seen.contains(&term)
                    && (links[current].node_type.is_none()
                        || match_state.at(to).valid_end());
                if enterable {
                    seen.push(term);
                    links.push(Link {
                        node_type: Some(node_type.clone()),
                        via: Some(current),
                        match_state: node_type.content_match(),
                    });
                    active.push_back(links.len() - 1);
                }
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Expression parsing
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Expr {
    Choice(Vec<Expr>),
    Seq(Vec<Expr>),
    Star(Box<Expr>),
    Plus(Box<Expr>),
    Opt(Box<Expr>),
    /// One or more node type indices (several when the token named a group).
    Name(Vec<usize>),
}

struct TokenStream<'a> {
    node: &'a str,
    tokens: Vec<String>,
    pos: usize,
}

impl<'a> TokenStream<'a> {
    fn new(node: &'a str, expr: &str) -> TokenStream<'a> {
        let mut tokens = Vec::new();
        let mut word = String::new();
        for ch in expr.chars() {
            match ch {
                '(' | ')' | '|' | '+' | '*' | '?' => {
                    if !word.is_empty() {
                        tokens.push(std::mem::take(&mut word));
                    }
                    tokens.push(ch.to_string());
                }
                c if c.is_whitespace() => {
                    if !word.is_empty() {
                        tokens.push(std::mem::take(&mut word));
                    }
                }
                c => word.push(c),
            }
        }
        if !word.is_empty() {
            tokens.push(word);
        }
        TokenStream { node, tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|s| s.as_str())
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn err(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::MalformedExpression { node: self.node.to_string(), reason: reason.into() }
    }
}

/// Parse and compile a content expression into a deterministic automaton.
///
/// `lookup` maps node type names and group names to the member type indices.
pub(crate) fn compile_content(
    node: &str,
    expr: &str,
    lookup: &HashMap<String, Vec<usize>>,
) -> Result<Dfa, SchemaError> {
    if expr.trim().is_empty() {
        return Ok(Dfa::empty());
    }
    let mut stream = TokenStream::new(node, expr);
    let parsed = parse_expr(&mut stream, lookup)?;
    if stream.peek().is_some() {
        return Err(stream.err("unexpected trailing tokens"));
    }
    let mut nfa = Nfa::new();
    let out = nfa.compile(&parsed, 0);
    Ok(nfa.to_dfa(out))
}

fn parse_expr(
    stream: &mut TokenStream,
    lookup: &HashMap<String, Vec<usize>>,
) -> Result<Expr, SchemaError> {
    let mut alternatives = vec![parse_expr_seq(stream, lookup)?];
    while stream.eat("|") {
        alternatives.push(parse_expr_seq(stream, lookup)?);
    }
    Ok(if alternatives.len() == 1 {
        alternatives.pop().unwrap()
    } else {
        Expr::Choice(alternatives)
    })
}

fn parse_expr_seq(
    stream: &mut TokenStream,
    lookup: &HashMap<String, Vec<usize>>,
) -> Result<Expr, SchemaError> {
    let mut exprs = vec![parse_expr_subscript(stream, lookup)?];
    while matches!(stream.peek(), Some(tok) if tok != ")" && tok != "|") {
        exprs.push(parse_expr_subscript(stream, lookup)?);
    }
    Ok(if exprs.len() == 1 { exprs.pop().unwrap() } else { Expr::Seq(exprs) })
}

fn parse_expr_subscript(
    stream: &mut TokenStream,
    lookup: &HashMap<String, Vec<usize>>,
) -> Result<Expr, SchemaError> {
    let mut expr = parse_expr_atom(stream, lookup)?;
    loop {
        if stream.eat("+") {
            expr = Expr::Plus(Box::new(expr));
        } else if stream.eat("*") {
            expr = Expr::Star(Box::new(expr));
        } else if stream.eat("?") {
            expr = Expr::Opt(Box::new(expr));
        } else {
            break;
        }
    }
    Ok(expr)
}

fn parse_expr_atom(
    stream: &mut TokenStream,
    lookup: &HashMap<String, Vec<usize>>,
) -> Result<Expr, SchemaError> {
    if stream.eat("(") {
        let expr = parse_expr(stream, lookup)?;
        if !stream.eat(")") {
            return Err(stream.err("missing closing parenthesis"));
        }
        return Ok(expr);
    }
    match stream.peek() {
        Some(tok) if !matches!(tok, ")" | "|" | "+" | "*" | "?") => {
            let name = tok.to_string();
            stream.pos += 1;
            match lookup.get(&name) {
                Some(members) if !members.is_empty() => Ok(Expr::Name(members.clone())),
                _ => Err(SchemaError::UnknownContentName {
                    node: stream.node.to_string(),
                    name,
                }),
            }
        }
        Some(tok) => Err(stream.err(format!("unexpected token '{tok}'"))),
        None => Err(stream.err("unexpected end of expression")),
    }
}

// ---------------------------------------------------------------------------
// NFA construction and subset conversion
// ---------------------------------------------------------------------------

struct Nfa {
    /// Per node: outgoing edges `(term, target)`; `term == None` is epsilon.
    nodes: Vec<Vec<(Option<usize>, usize)>>,
}

impl Nfa {
    fn new() -> Nfa {
        Nfa { nodes: vec![Vec::new()] }
    }

    fn node(&mut self) -> usize {
        self.nodes.push(Vec::new());
        self.nodes.len() - 1
    }

    fn edge(&mut self, from: usize, to: usize, term: Option<usize>) {
        self.nodes[from].push((term, to));
    }

    /// Compile `expr` starting at node `from`; returns the exit node.
    fn compile(&mut self, expr: &Expr, from: usize) -> usize {
        match expr {
            Expr::Name(terms) => {
                let out = self.node();
                for &term in terms {
                    self.edge(from, out, Some(term));
                }
                out
            }
            Expr::Seq(exprs) => {
                let mut cur = from;
                for e in exprs {
                    cur = self.compile(e, cur);
                }
                cur
            }
            Expr::Choice(exprs) => {
                let out = self.node();
                for e in exprs {
                    let branch_out = self.compile(e, from);
                    self.edge(branch_out, out, None);
                }
                out
            }
            Expr::Opt(inner) => {
                let out = self.node();
                let inner_out = self.compile(inner, from);
                self.edge(inner_out, out, None);
                self.edge(from, out, None);
                out
            }
            Expr::Plus(inner) => {
                let entry = self.node();
                self.edge(from, entry, None);
                let inner_out = self.compile(inner, entry);
                let out = self.node();
                self.edge(inner_out, out, None);
                self.edge(out, entry, None);
                out
            }
            Expr::Star(inner) => {
                let entry = self.node();
                self.edge(from, entry, None);
                let inner_out = self.compile(inner, entry);
                let out = self.node();
                self.edge(inner_out, out, None);
                self.edge(out, entry, None);
                self.edge(entry, out, None);
                out
            }
        }
    }

    fn closure(&self, start: &[usize]) -> Vec<usize> {
        let mut result: Vec<usize> = Vec::new();
        let mut stack: Vec<usize> = start.to_vec();
        while let Some(n) = stack.pop() {
            if result.contains(&n) {
                continue;
            }
            result.push(n);
            for &(term, to) in &self.nodes[n] {
                if term.is_none() {
                    stack.push(to);
                }
            }
        }
        result.sort_unstable();
        result
    }

    /// Subset construction; equivalent match states collapse to one DFA
    /// state, which keeps ambiguous expressions small.
    fn to_dfa(&self, accept: usize) -> Dfa {
        let mut states: Vec<DfaState> = Vec::new();
        let mut index: HashMap<Vec<usize>, usize> = HashMap::new();
        let mut work: Vec<Vec<usize>> = Vec::new();

        let start = self.closure(&[0]);
        index.insert(start.clone(), 0);
        states.push(DfaState { valid_end: start.contains(&accept), edges: Vec::new() });
        work.push(start);

        while let Some(set) = work.pop() {
            let state_id = index[&set];
            let mut by_term: HashMap<usize, Vec<usize>> = HashMap::new();
            for &n in &set {
                for &(term, to) in &self.nodes[n] {
                    if let Some(t) = term {
                        by_term.entry(t).or_default().push(to);
                    }
                }
            }
            let mut terms: Vec<usize> = by_term.keys().copied().collect();
            terms.sort_unstable();
            let mut edges = Vec::with_capacity(terms.len());
            for term in terms {
                let targets = self.closure(&by_term[&term]);
                let target_id = match index.get(&targets) {
                    Some(&id) => id,
                    None => {
                        let id = states.len();
                        index.insert(targets.clone(), id);
                        states.push(DfaState {
                            valid_end: targets.contains(&accept),
                            edges: Vec::new(),
                        });
                        work.push(targets);
                        id
                    }
                };
                edges.push((term, target_id));
            }
            states[state_id].edges = edges;
        }
        Dfa { states }
    }
}
