//! Stylesheet syntax tree.
//!
//! Enough structure for the scoping stages to find selectors, declarations
//! and at-rules, and to print the result back. Produced by
//! [`parser`](super::parser); offsets point into the source for diagnostics.

use std::fmt::{self, Write};

/// A parsed stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    /// Top-level nodes in source order.
    pub nodes: Vec<Node>,
}

/// One node of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// `selector { ... }`
    Rule(Rule),
    /// `@name params;` or `@name params { ... }`
    AtRule(AtRule),
    /// `prop: value`
    Decl(Declaration),
    /// `/* text */`
    Comment(String),
}

/// A qualified rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Selector text, trimmed.
    pub selector: String,
    /// Block contents.
    pub nodes: Vec<Node>,
    /// Byte offset of the selector in the source.
    pub offset: usize,
}

/// An at-rule, with or without a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    /// Name without the `@`.
    pub name: String,
    /// Prelude text, trimmed.
    pub params: String,
    /// Block contents; `None` for statement at-rules.
    pub nodes: Option<Vec<Node>>,
    /// Byte offset of the `@` in the source.
    pub offset: usize,
}

/// A declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Property name, trimmed.
    pub prop: String,
    /// Value text including any `!important`, trimmed.
    pub value: String,
    /// Byte offset of the property in the source.
    pub offset: usize,
}

impl Stylesheet {
    /// Visit every node depth-first, parents before children.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Node)) {
        for_each_node_mut(&mut self.nodes, &mut f);
    }

    /// Print the stylesheet back to CSS text.
    pub fn to_css(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            // Writing into a String cannot fail.
            let _ = write_node(&mut out, node, 0);
        }
        out
    }
}

impl Node {
    /// Offset of the node in the source, if it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Rule(rule) => Some(rule.offset),
            Self::AtRule(at) => Some(at.offset),
            Self::Decl(decl) => Some(decl.offset),
            Self::Comment(_) => None,
        }
    }
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

fn for_each_node_mut(nodes: &mut [Node], f: &mut impl FnMut(&mut Node)) {
    for node in nodes {
        f(node);
        match node {
            Node::Rule(rule) => for_each_node_mut(&mut rule.nodes, f),
            Node::AtRule(AtRule {
                nodes: Some(children),
                ..
            }) => for_each_node_mut(children, f),
            _ => {}
        }
    }
}

fn write_node(out: &mut String, node: &Node, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    match node {
        Node::Rule(rule) => {
            writeln!(out, "{indent}{} {{", rule.selector)?;
            for child in &rule.nodes {
                write_node(out, child, depth + 1)?;
            }
            writeln!(out, "{indent}}}")
        }
        Node::AtRule(at) => {
            write!(out, "{indent}@{}", at.name)?;
            if !at.params.is_empty() {
                write!(out, " {}", at.params)?;
            }
            match &at.nodes {
                None => writeln!(out, ";"),
                Some(children) => {
                    writeln!(out, " {{")?;
                    for child in children {
                        write_node(out, child, depth + 1)?;
                    }
                    writeln!(out, "{indent}}}")
                }
            }
        }
        Node::Decl(decl) => writeln!(out, "{indent}{}: {};", decl.prop, decl.value),
        Node::Comment(text) => writeln!(out, "{indent}/*{text}*/"),
    }
}
