//! Opcode vocabulary for compiled templates.
//!
//! The opcode stream is the contract between this pass and its two
//! consumers: the attribute compiler and the runtime. Serialized tags and
//! the positional meaning of every payload field are load-bearing; renaming
//! either breaks the downstream stages silently.
//!
//! ## Stream shape
//!
//! One compile produces a main opcode sequence plus a table of nested
//! sub-programs (block bodies, inverse bodies, attribute values). Opcodes
//! never reference a program by pointer, only by its index into that table,
//! and the table is append-only for the duration of a compile, so indices
//! are stable once assigned.

use serde::{Deserialize, Serialize};

/// One instruction in the flat output sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Opcode {
    /// Literal text content.
    #[serde(rename = "content")]
    Content { value: String },

    #[serde(rename = "openElement")]
    OpenElement { tag: String },

    #[serde(rename = "closeElement")]
    CloseElement,

    /// An attribute whose compiled value program lives at `program` in the
    /// program table.
    #[serde(rename = "attribute")]
    Attribute { name: String, program: usize },

    /// Program references for the invocation that follows. Blocks carry
    /// their primary and inverse indices; plain helpers and node-helpers
    /// never have a body and carry explicit nulls.
    #[serde(rename = "program")]
    Program {
        program: Option<usize>,
        inverse: Option<usize>,
    },

    /// A path argument pushed for the pending invocation.
    #[serde(rename = "id")]
    Id { parts: Vec<String> },

    /// A string argument pushed for the pending invocation.
    #[serde(rename = "string")]
    StringLiteral { value: String },

    /// A boolean or integer argument pushed for the pending invocation.
    #[serde(rename = "literal")]
    Literal { value: LiteralValue },

    /// Hash plumbing: a pair's key name, or the trailing pair count.
    #[serde(rename = "stackLiteral")]
    StackLiteral { value: StackValue },

    /// A definite helper invocation.
    #[serde(rename = "helper", rename_all = "camelCase")]
    Helper {
        name: String,
        param_count: usize,
        escaped: bool,
    },

    /// A helper invocation attached directly to an element tag.
    #[serde(rename = "nodeHelper", rename_all = "camelCase")]
    NodeHelper { name: String, param_count: usize },

    /// A plain value reference with no helper semantics.
    #[serde(rename = "dynamic")]
    Dynamic { parts: Vec<String>, escaped: bool },

    /// A reference whose helper-vs-value nature is deferred to the runtime.
    #[serde(rename = "ambiguous")]
    Ambiguous { name: String, escaped: bool },

    #[serde(rename = "appendText")]
    AppendText,

    #[serde(rename = "appendHTML")]
    AppendHtml,

    /// Terminal append for block invocations.
    #[serde(rename = "appendFragment")]
    AppendFragment,
}

/// Payload of a `literal` opcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Boolean(bool),
    Integer(i64),
}

/// Payload of a `stackLiteral` opcode: a hash key name or a pair count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StackValue {
    Count(usize),
    Name(String),
}

/// A complete opcode sequence for one nested scope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub opcodes: Vec<Opcode>,
}

/// Result of one compile invocation: the main program plus the program
/// table its opcodes index into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileOutput {
    pub opcodes: Vec<Opcode>,
    pub children: Vec<Program>,
}
