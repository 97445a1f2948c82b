//! Opcode compilation pass for Weft templates.
//!
//! Lowers a parsed template AST into a flat opcode stream plus a side table
//! of nested sub-programs, consumed by the attribute compiler and the
//! runtime. The walk is a single depth-first, left-to-right pass; nothing
//! reorders opcodes after emission.
//!
//! ## Key Invariants
//!
//! 1. **Program indices are stable**: a sub-program's index is assigned at
//!    push time (`children.len() - 1`) and never changes afterwards.
//! 2. **Element ordering**: all attributes compile first, then all
//!    node-helpers, then children. This ordering is observable downstream.
//! 3. **Block pushes come in pairs**: primary body first, inverse second,
//!    both always pushed even when empty, so the primary index is strictly
//!    less than the inverse index.
//! 4. **Promotion before demotion**: an eligible mustache is promoted to a
//!    helper when its name is known; demotion to a plain value applies only
//!    under `knownHelpersOnly`, and only after the lookup misses.
//! 5. **One append per mustache**: every mustache node appends exactly one
//!    `appendText`/`appendHTML` opcode after its value or helper opcodes.
//!
//! `compile` resets the instance's program table on entry; callers that
//! need the table from an earlier invocation must copy it first.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::ast::{Attribute, BlockNode, ElementNode, ExprNode, MustacheNode, Node};
use crate::attr::{AttributeCompiler, PassthroughAttributeCompiler};
use crate::opcode::{CompileOutput, LiteralValue, Opcode, Program, StackValue};
use crate::validate::{validate_template, CompilerError, INV_EMPTY_HELPER_PATH, INV_PARAM_KIND, INV_PARSE};

lazy_static! {
    /// Helpers the compiler can resolve statically without being told.
    static ref BUILTIN_HELPERS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("helperMissing");
        s.insert("blockHelperMissing");
        s.insert("each");
        s.insert("if");
        s.insert("unless");
        s.insert("with");
        s.insert("log");
        s
    };
}

/// Caller-facing compiler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Additional helper names the host application registers. Entries are
    /// merged over the built-in set at construction.
    #[serde(default)]
    pub known_helpers: HashMap<String, bool>,
    /// Closed-world mode: an eligible name missing from the merged table is
    /// forced to compile as a plain value lookup instead of staying
    /// ambiguous.
    #[serde(default)]
    pub known_helpers_only: bool,
}

/// How a mustache invocation compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A plain value reference.
    Simple,
    /// Statically unresolvable; the runtime decides.
    Ambiguous,
    /// A definite helper call.
    Helper,
}

pub struct OpcodeCompiler {
    options: CompilerOptions,
    known_helpers: HashMap<String, bool>,
    known_helpers_only: bool,
    /// Program table for the current compile. Opcodes reference entries by
    /// index only.
    pub children: Vec<Program>,
    attribute_compiler: Box<dyn AttributeCompiler>,
}

impl OpcodeCompiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self::with_attribute_compiler(options, Box::new(PassthroughAttributeCompiler))
    }

    pub fn with_attribute_compiler(
        options: CompilerOptions,
        attribute_compiler: Box<dyn AttributeCompiler>,
    ) -> Self {
        let mut known_helpers: HashMap<String, bool> = BUILTIN_HELPERS
            .iter()
            .map(|name| (name.to_string(), true))
            .collect();
        // Caller entries land on top of the built-ins and are never removed.
        for (name, known) in &options.known_helpers {
            known_helpers.insert(name.clone(), *known);
        }
        let known_helpers_only = options.known_helpers_only;

        OpcodeCompiler {
            options,
            known_helpers,
            known_helpers_only,
            children: Vec::new(),
            attribute_compiler,
        }
    }

    /// Compile a template's child list into an opcode sequence. The program
    /// table accumulates on `self.children` as a side effect and is reset at
    /// the top of every call, so repeat invocations are independent.
    pub fn compile(&mut self, nodes: &[Node]) -> Result<Vec<Opcode>, CompilerError> {
        self.children.clear();
        let mut opcodes = Vec::new();
        self.process_children(nodes, &mut opcodes)?;
        Ok(opcodes)
    }

    fn process_children(
        &mut self,
        nodes: &[Node],
        out: &mut Vec<Opcode>,
    ) -> Result<(), CompilerError> {
        for node in nodes {
            match node {
                Node::Text(value) => out.push(Opcode::Content {
                    value: value.clone(),
                }),
                Node::Expr(ExprNode::Element(element)) => self.element(element, out)?,
                Node::Expr(ExprNode::Block(block)) => self.block(block, out)?,
                Node::Expr(ExprNode::Mustache(mustache)) => self.mustache(mustache, out)?,
                // Remaining kinds are the literal dispatch targets, shared
                // with argument processing.
                other => self.process_param(other, out)?,
            }
        }
        Ok(())
    }

    fn element(&mut self, element: &ElementNode, out: &mut Vec<Opcode>) -> Result<(), CompilerError> {
        out.push(Opcode::OpenElement {
            tag: element.tag.clone(),
        });
        for attribute in &element.attributes {
            self.attribute(attribute, out)?;
        }
        for helper in &element.helpers {
            self.node_helper(helper, out)?;
        }
        self.process_children(&element.children, out)?;
        out.push(Opcode::CloseElement);
        Ok(())
    }

    /// An attribute's value expression is a template fragment in its own
    /// right. A peer compiler instance lowers it, the attribute compiler
    /// takes over from there, and the finished program occupies one slot in
    /// this instance's table.
    fn attribute(
        &mut self,
        attribute: &Attribute,
        out: &mut Vec<Opcode>,
    ) -> Result<(), CompilerError> {
        let mut value_compiler = OpcodeCompiler::new(self.options.clone());
        let opcodes = value_compiler.compile(&attribute.value)?;
        let program = self
            .attribute_compiler
            .compile_attribute(Program { opcodes })?;
        self.children.push(program);
        out.push(Opcode::Attribute {
            name: attribute.name.clone(),
            program: self.children.len() - 1,
        });
        Ok(())
    }

    fn node_helper(
        &mut self,
        mustache: &MustacheNode,
        out: &mut Vec<Opcode>,
    ) -> Result<(), CompilerError> {
        // Node helpers never have a body.
        out.push(Opcode::Program {
            program: None,
            inverse: None,
        });
        self.process_params(&mustache.params, out)?;
        self.process_hash(mustache.hash.as_ref(), out)?;
        out.push(Opcode::NodeHelper {
            name: helper_name(mustache)?,
            param_count: mustache.params.len(),
        });
        Ok(())
    }

    fn block(&mut self, block: &BlockNode, out: &mut Vec<Opcode>) -> Result<(), CompilerError> {
        // Both bodies compile even when empty; their programs are pushed
        // back to back, primary first.
        let program = self.compile_body(&block.children)?;
        let inverse = self.compile_body(&block.inverse)?;

        self.children.push(Program { opcodes: program });
        let program_id = self.children.len() - 1;
        self.children.push(Program { opcodes: inverse });
        let inverse_id = self.children.len() - 1;

        out.push(Opcode::Program {
            program: Some(program_id),
            inverse: Some(inverse_id),
        });
        self.process_params(&block.helper.params, out)?;
        self.process_hash(block.helper.hash.as_ref(), out)?;
        out.push(Opcode::Helper {
            name: block.helper.id.string.clone(),
            param_count: block.helper.params.len(),
            escaped: block.helper.escaped,
        });
        out.push(Opcode::AppendFragment);
        Ok(())
    }

    fn compile_body(&mut self, nodes: &[Node]) -> Result<Vec<Opcode>, CompilerError> {
        let mut opcodes = Vec::new();
        self.process_children(nodes, &mut opcodes)?;
        Ok(opcodes)
    }

    fn mustache(
        &mut self,
        mustache: &MustacheNode,
        out: &mut Vec<Opcode>,
    ) -> Result<(), CompilerError> {
        match self.classify(mustache) {
            Classification::Helper => {
                out.push(Opcode::Program {
                    program: None,
                    inverse: None,
                });
                self.process_params(&mustache.params, out)?;
                self.process_hash(mustache.hash.as_ref(), out)?;
                out.push(Opcode::Helper {
                    name: helper_name(mustache)?,
                    param_count: mustache.params.len(),
                    escaped: mustache.escaped,
                });
            }
            Classification::Ambiguous => out.push(Opcode::Ambiguous {
                name: mustache.id.string.clone(),
                escaped: mustache.escaped,
            }),
            Classification::Simple => out.push(Opcode::Dynamic {
                parts: mustache.id.parts.clone(),
                escaped: mustache.escaped,
            }),
        }

        out.push(if mustache.escaped {
            Opcode::AppendText
        } else {
            Opcode::AppendHtml
        });
        Ok(())
    }

    /// Decide whether a mustache compiles as a value, a helper, or stays
    /// ambiguous. Promotion is checked first: an eligible name found in the
    /// known-helper table becomes a definite helper. Demotion applies only
    /// under `knownHelpersOnly`, and only after the lookup misses. Otherwise
    /// the parser's flags stand and the ambiguity survives to runtime.
    pub fn classify(&self, mustache: &MustacheNode) -> Classification {
        let mut is_helper = mustache.is_helper;
        let mut eligible_helper = mustache.eligible_helper;

        if !is_helper && eligible_helper {
            let known = mustache
                .id
                .parts
                .first()
                .map(|name| self.is_known_helper(name))
                .unwrap_or(false);
            if known {
                is_helper = true;
            } else if self.known_helpers_only {
                eligible_helper = false;
            }
        }

        if is_helper {
            Classification::Helper
        } else if eligible_helper {
            Classification::Ambiguous
        } else {
            Classification::Simple
        }
    }

    fn is_known_helper(&self, name: &str) -> bool {
        self.known_helpers.get(name).copied().unwrap_or(false)
    }

    fn process_params(&self, params: &[Node], out: &mut Vec<Opcode>) -> Result<(), CompilerError> {
        for param in params {
            self.process_param(param, out)?;
        }
        Ok(())
    }

    fn process_param(&self, param: &Node, out: &mut Vec<Opcode>) -> Result<(), CompilerError> {
        match param {
            Node::Expr(ExprNode::Id(id)) => out.push(Opcode::Id {
                parts: id.id.parts.clone(),
            }),
            Node::Expr(ExprNode::StringLiteral(string)) => out.push(Opcode::StringLiteral {
                value: string.value.clone(),
            }),
            Node::Expr(ExprNode::BooleanLiteral(boolean)) => out.push(Opcode::Literal {
                value: LiteralValue::Boolean(boolean.value),
            }),
            Node::Expr(ExprNode::IntegerLiteral(integer)) => out.push(Opcode::Literal {
                value: LiteralValue::Integer(integer.value),
            }),
            _ => {
                return Err(CompilerError::with_details(
                    INV_PARAM_KIND,
                    "Unsupported argument node in invocation.",
                    None,
                    vec!["Arguments must be ID, STRING, BOOLEAN, or INTEGER nodes.".to_string()],
                ));
            }
        }
        Ok(())
    }

    /// Hash pairs compile as value-then-name pushes with a trailing pair
    /// count; an absent hash compiles to the bare count `0`.
    fn process_hash(
        &self,
        hash: Option<&crate::ast::Hash>,
        out: &mut Vec<Opcode>,
    ) -> Result<(), CompilerError> {
        match hash {
            Some(hash) => {
                for pair in &hash.pairs {
                    self.process_param(&pair.value, out)?;
                    out.push(Opcode::StackLiteral {
                        value: StackValue::Name(pair.name.clone()),
                    });
                }
                out.push(Opcode::StackLiteral {
                    value: StackValue::Count(hash.pairs.len()),
                });
            }
            None => out.push(Opcode::StackLiteral {
                value: StackValue::Count(0),
            }),
        }
        Ok(())
    }
}

/// The invocation name is the first path segment. An invocation with no
/// segments is parser breakage, not something to paper over.
fn helper_name(mustache: &MustacheNode) -> Result<String, CompilerError> {
    mustache.id.parts.first().cloned().ok_or_else(|| {
        CompilerError::new(INV_EMPTY_HELPER_PATH, "Helper invocation has an empty path.")
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate and compile a template's child list.
pub fn compile_template(
    nodes: &[Node],
    options: CompilerOptions,
) -> Result<CompileOutput, CompilerError> {
    if let Some(error) = validate_template(nodes) {
        return Err(error);
    }
    let mut compiler = OpcodeCompiler::new(options);
    let opcodes = compiler.compile(nodes)?;
    Ok(CompileOutput {
        opcodes,
        children: compiler.children,
    })
}

/// JSON boundary: the host toolchain ships the AST (and optionally the
/// compiler options) serialized.
pub fn compile_template_json(
    ast_json: &str,
    options_json: Option<&str>,
) -> Result<CompileOutput, CompilerError> {
    let nodes: Vec<Node> = serde_json::from_str(ast_json).map_err(|e| {
        CompilerError::new(INV_PARSE, &format!("Failed to parse template AST: {}", e))
    })?;
    let options: CompilerOptions = match options_json {
        Some(json) => serde_json::from_str(json).map_err(|e| {
            CompilerError::new(INV_PARSE, &format!("Failed to parse compiler options: {}", e))
        })?,
        None => CompilerOptions::default(),
    };
    compile_template(&nodes, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Path;

    #[test]
    fn test_builtin_helper_table() {
        let compiler = OpcodeCompiler::new(CompilerOptions::default());
        for name in [
            "helperMissing",
            "blockHelperMissing",
            "each",
            "if",
            "unless",
            "with",
            "log",
        ] {
            assert!(compiler.is_known_helper(name), "missing builtin {}", name);
        }
        assert!(!compiler.is_known_helper("customHelper"));
    }

    #[test]
    fn test_caller_helpers_merge_over_builtins() {
        let mut options = CompilerOptions::default();
        options
            .known_helpers
            .insert("customHelper".to_string(), true);
        let compiler = OpcodeCompiler::new(options);
        assert!(compiler.is_known_helper("customHelper"));
        assert!(compiler.is_known_helper("if"));
    }

    #[test]
    fn test_compile_resets_program_table() {
        let block = Node::Expr(ExprNode::Block(BlockNode {
            helper: MustacheNode {
                id: Path::from_parts(vec!["if".to_string()]),
                params: vec![simple_param()],
                hash: None,
                escaped: true,
                is_helper: true,
                eligible_helper: true,
            },
            children: vec![],
            inverse: vec![],
        }));
        let mut compiler = OpcodeCompiler::new(CompilerOptions::default());
        compiler.compile(std::slice::from_ref(&block)).unwrap();
        assert_eq!(compiler.children.len(), 2);
        compiler.compile(std::slice::from_ref(&block)).unwrap();
        assert_eq!(compiler.children.len(), 2);
    }

    fn simple_param() -> Node {
        Node::Expr(ExprNode::Id(crate::ast::IdNode {
            id: Path::from_parts(vec!["truthy".to_string()]),
        }))
    }

    #[test]
    fn test_json_entry_point_rejects_unknown_types() {
        let error =
            compile_template_json(r#"[{ "type": "comment", "value": "x" }]"#, None).unwrap_err();
        assert_eq!(error.code, INV_PARSE);
    }

    #[test]
    fn test_json_entry_point_compiles_text() {
        let output = compile_template_json(r#"["a", "b"]"#, None).unwrap();
        assert_eq!(output.opcodes.len(), 2);
        assert!(output.children.is_empty());
    }

    #[test]
    fn test_json_options_round_trip() {
        let output = compile_template_json(
            r#"[{ "type": "mustache",
                 "id": { "parts": ["shout"], "string": "shout" },
                 "eligibleHelper": true }]"#,
            Some(r#"{ "knownHelpers": { "shout": true } }"#),
        )
        .unwrap();
        assert!(matches!(
            output.opcodes.first(),
            Some(Opcode::Program { program: None, inverse: None })
        ));
    }
}
