//! Template AST node model.
//!
//! Parsing happens upstream in the host toolchain, which ships each
//! template's AST as JSON. This module is the Rust shape of that wire
//! format. The opcode pass only inspects these nodes; it never constructs
//! or rewrites them.

use serde::{Deserialize, Serialize};

/// One entry in a template's child list.
///
/// Plain text arrives as a bare JSON string. Every other node kind is an
/// object tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Text(String),
    Expr(ExprNode),
}

/// Tagged template nodes. A `type` tag outside this set is a parser defect
/// and fails deserialization outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExprNode {
    #[serde(rename = "element")]
    Element(ElementNode),
    #[serde(rename = "block")]
    Block(BlockNode),
    #[serde(rename = "mustache")]
    Mustache(MustacheNode),
    #[serde(rename = "ID")]
    Id(IdNode),
    #[serde(rename = "STRING")]
    StringLiteral(StringNode),
    #[serde(rename = "BOOLEAN")]
    BooleanLiteral(BooleanNode),
    #[serde(rename = "INTEGER")]
    IntegerLiteral(IntegerNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub tag: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Helper invocations attached directly to the element tag.
    #[serde(default)]
    pub helpers: Vec<MustacheNode>,
    #[serde(default)]
    pub children: Vec<Node>,
}

/// An attribute name and its value expression. The value is a nested
/// template fragment: an ordered mix of text and mustaches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    #[serde(default)]
    pub value: Vec<Node>,
}

/// A block invocation: `helper` describes the invocation, `children` is the
/// primary body and `inverse` the else body. Either body may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockNode {
    pub helper: MustacheNode,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub inverse: Vec<Node>,
}

/// A mustache invocation. `is_helper` and `eligible_helper` are computed by
/// the upstream parser from the invocation's syntax and are consumed here
/// as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MustacheNode {
    pub id: Path,
    #[serde(default)]
    pub params: Vec<Node>,
    #[serde(default)]
    pub hash: Option<Hash>,
    #[serde(default = "default_escaped")]
    pub escaped: bool,
    #[serde(default)]
    pub is_helper: bool,
    #[serde(default)]
    pub eligible_helper: bool,
}

fn default_escaped() -> bool {
    true
}

/// A dotted path reference: segments plus the joined form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Path {
    #[serde(default)]
    pub parts: Vec<String>,
    #[serde(default)]
    pub string: String,
}

impl Path {
    pub fn from_parts(parts: Vec<String>) -> Self {
        let string = parts.join(".");
        Self { parts, string }
    }
}

/// Named arguments of an invocation, in source order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hash {
    #[serde(default)]
    pub pairs: Vec<HashPair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashPair {
    pub name: String,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdNode {
    pub id: Path,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringNode {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanNode {
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegerNode {
    pub value: i64,
}
