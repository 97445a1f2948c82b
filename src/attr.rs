//! Attribute value sub-compilation seam.

use crate::opcode::Program;
use crate::validate::CompilerError;

/// Downstream compiler for attribute value programs.
///
/// An attribute's value expression is lowered to an opcode program first;
/// that program is then handed here, and whatever comes back occupies the
/// attribute's slot in the program table. The opcode pass owes its
/// collaborator nothing beyond the intermediate program.
pub trait AttributeCompiler {
    fn compile_attribute(&self, program: Program) -> Result<Program, CompilerError>;
}

/// Keeps the raw opcode program as the attribute's compiled form.
pub struct PassthroughAttributeCompiler;

impl AttributeCompiler for PassthroughAttributeCompiler {
    fn compile_attribute(&self, program: Program) -> Result<Program, CompilerError> {
        Ok(program)
    }
}
