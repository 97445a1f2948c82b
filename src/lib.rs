//! # Weft Template Opcode Compiler
//!
//! Lowers parsed Weft template ASTs into the flat opcode streams consumed
//! by the attribute compiler and the runtime. The upstream parser and the
//! downstream stages live in the host toolchain; this crate is the pass in
//! between.
//!
//! ## Ground Truth
//!
//! 1. **Opcode order is the contract**: the stream is a depth-first,
//!    left-to-right linearization of the template and is never reordered.
//! 2. **Programs resolve by index**: nested scopes (block bodies, inverse
//!    bodies, attribute values) live in a per-compile program table and are
//!    referenced only by their stable integer index.
//! 3. **Helper resolution is three-valued**: a mustache compiles as a
//!    plain value, a definite helper, or an ambiguous reference left to the
//!    runtime; the promote-then-demote classification in `compiler.rs` is
//!    the single authority for that decision.
//! 4. **Malformed ASTs fail fast**: there is no partial compilation and no
//!    best-effort recovery; a bad node aborts the compile with a coded
//!    error.

mod ast;
mod attr;
mod cache;
mod compiler;
mod discovery;
mod opcode;
mod validate;

pub use ast::*;
pub use attr::*;
pub use cache::{CacheEntry, IncrementalCache};
pub use compiler::*;
pub use discovery::{
    discover_templates, discover_templates_with_cache, find_template_files, TemplateManifest,
};
pub use opcode::*;
pub use validate::*;

#[cfg(test)]
mod classification_tests;
