//! Document builders shared by the integration tests. All of them use the
//! basic schema and panic on invalid input, which is what a test wants.

#![allow(dead_code)]

use vellum_model::{basic, Fragment, Mark, Node, Schema};

pub fn schema() -> &'static Schema {
    basic::schema()
}

fn node(name: &str, children: Vec<Node>) -> Node {
    schema()
        .node(name, None, Fragment::from_vec(children), vec![])
        .unwrap_or_else(|e| panic!("building {name}: {e}"))
}

pub fn doc(children: Vec<Node>) -> Node {
    node("doc", children)
}

pub fn p(children: Vec<Node>) -> Node {
    node("paragraph", children)
}

pub fn blockquote(children: Vec<Node>) -> Node {
    node("blockquote", children)
}

pub fn h1(children: Vec<Node>) -> Node {
    node("heading", children)
}

pub fn code_block(children: Vec<Node>) -> Node {
    node("code_block", children)
}

pub fn hr() -> Node {
    node("horizontal_rule", vec![])
}

pub fn text(s: &str) -> Node {
    schema().text(s, vec![])
}

pub fn marked(s: &str, marks: &[&str]) -> Node {
    let marks: Vec<Mark> = marks
        .iter()
        .map(|name| schema().mark(name, None).unwrap())
        .collect();
    schema().text(s, marks)
}

pub fn em(s: &str) -> Node {
    marked(s, &["em"])
}

pub fn strong(s: &str) -> Node {
    marked(s, &["strong"])
}

pub fn em_mark() -> Mark {
    schema().mark("em", None).unwrap()
}

pub fn strong_mark() -> Mark {
    schema().mark("strong", None).unwrap()
}
