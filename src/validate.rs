use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ast::{Attribute, BlockNode, ElementNode, ExprNode, MustacheNode, Node};

// ═══════════════════════════════════════════════════════════════════════════════
// INVARIANT CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const INV_PARAM_KIND: &str = "W-ERR-AST-001";
pub const INV_EMPTY_HELPER_PATH: &str = "W-ERR-AST-002";
pub const INV_BAD_HELPER_NAME: &str = "W-ERR-AST-003";
pub const INV_PARSE: &str = "PARSE_ERROR";

lazy_static! {
    /// Shape of a helper name segment. Dashes are legal in helper names;
    /// `@`-prefixed segments are loop metadata references.
    static ref NAME_SEGMENT_RE: Regex =
        Regex::new(r"^[@A-Za-z_$][A-Za-z0-9_$-]*$").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        INV_PARAM_KIND => {
            "Invocation arguments are paths or literals; structure never nests inside an argument list."
        }
        INV_EMPTY_HELPER_PATH => "Every helper invocation names its helper with a non-empty path.",
        INV_BAD_HELPER_NAME => "Helper names are single well-formed identifier segments.",
        INV_PARSE => "Template ASTs arrive as well-formed JSON in the documented node vocabulary.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// A fatal compilation error. There is no recoverable class: a malformed
/// AST means the upstream parser is broken, and compilation stops at the
/// first defect rather than emitting a partial opcode stream. Source
/// locations belong to the upstream parser and are attached by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerError {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str) -> Self {
        Self::with_details(code, message, None, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        context: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            context,
            hints,
        }
    }
}

impl std::fmt::Display for CompilerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for CompilerError {}

// ═══════════════════════════════════════════════════════════════════════════════
// VALIDATION FUNCTIONS (Return Option, not Result)
// ═══════════════════════════════════════════════════════════════════════════════

/// Structural validation of a template's child list, run before the opcode
/// walk. Checks the shapes the walk itself would only trip over mid-stream:
/// argument kinds, helper path presence, helper name tokens.
pub fn validate_template(nodes: &[Node]) -> Option<CompilerError> {
    for node in nodes {
        if let Some(error) = check_node(node) {
            return Some(error);
        }
    }
    None
}

fn check_node(node: &Node) -> Option<CompilerError> {
    match node {
        Node::Text(_) => None,
        Node::Expr(ExprNode::Element(element)) => check_element(element),
        Node::Expr(ExprNode::Block(block)) => check_block(block),
        Node::Expr(ExprNode::Mustache(mustache)) => check_mustache(mustache),
        // Bare literals are legal children; they carry no structure to check.
        Node::Expr(_) => None,
    }
}

fn check_element(element: &ElementNode) -> Option<CompilerError> {
    for attribute in &element.attributes {
        if let Some(error) = check_attribute(attribute) {
            return Some(error);
        }
    }
    for helper in &element.helpers {
        if let Some(error) = check_invocation(helper) {
            return Some(error);
        }
        if let Some(error) = check_arguments(helper) {
            return Some(error);
        }
    }
    validate_template(&element.children)
}

fn check_attribute(attribute: &Attribute) -> Option<CompilerError> {
    validate_template(&attribute.value)
}

fn check_block(block: &BlockNode) -> Option<CompilerError> {
    if let Some(error) = check_invocation(&block.helper) {
        return Some(error);
    }
    if let Some(error) = check_arguments(&block.helper) {
        return Some(error);
    }
    if let Some(error) = validate_template(&block.children) {
        return Some(error);
    }
    validate_template(&block.inverse)
}

fn check_mustache(mustache: &MustacheNode) -> Option<CompilerError> {
    if mustache.is_helper {
        if let Some(error) = check_invocation(mustache) {
            return Some(error);
        }
    }
    check_arguments(mustache)
}

/// A node sitting in helper position must actually name a helper.
fn check_invocation(mustache: &MustacheNode) -> Option<CompilerError> {
    let name = match mustache.id.parts.first() {
        Some(name) => name,
        None => {
            return Some(CompilerError::with_details(
                INV_EMPTY_HELPER_PATH,
                "Helper invocation has an empty path.",
                Some(format!("{{{{{}}}}}", mustache.id.string)),
                vec!["The upstream parser dropped the helper's path segments.".to_string()],
            ));
        }
    };

    if !NAME_SEGMENT_RE.is_match(name) {
        return Some(CompilerError::with_details(
            INV_BAD_HELPER_NAME,
            &format!("Invalid helper name \"{}\".", name),
            Some(name.clone()),
            vec![],
        ));
    }

    None
}

fn check_arguments(mustache: &MustacheNode) -> Option<CompilerError> {
    for param in &mustache.params {
        if let Some(error) = check_argument_kind(param) {
            return Some(error);
        }
    }
    if let Some(hash) = &mustache.hash {
        for pair in &hash.pairs {
            if let Some(error) = check_argument_kind(&pair.value) {
                return Some(error);
            }
        }
    }
    None
}

fn check_argument_kind(node: &Node) -> Option<CompilerError> {
    match node {
        Node::Expr(ExprNode::Id(_))
        | Node::Expr(ExprNode::StringLiteral(_))
        | Node::Expr(ExprNode::BooleanLiteral(_))
        | Node::Expr(ExprNode::IntegerLiteral(_)) => None,
        other => Some(CompilerError::with_details(
            INV_PARAM_KIND,
            &format!("Unsupported argument node: {}.", argument_kind_name(other)),
            None,
            vec!["Arguments must be ID, STRING, BOOLEAN, or INTEGER nodes.".to_string()],
        )),
    }
}

fn argument_kind_name(node: &Node) -> &'static str {
    match node {
        Node::Text(_) => "text",
        Node::Expr(ExprNode::Element(_)) => "element",
        Node::Expr(ExprNode::Block(_)) => "block",
        Node::Expr(ExprNode::Mustache(_)) => "mustache",
        Node::Expr(ExprNode::Id(_)) => "ID",
        Node::Expr(ExprNode::StringLiteral(_)) => "STRING",
        Node::Expr(ExprNode::BooleanLiteral(_)) => "BOOLEAN",
        Node::Expr(ExprNode::IntegerLiteral(_)) => "INTEGER",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Hash, HashPair, Path};

    fn mustache(parts: &[&str]) -> MustacheNode {
        MustacheNode {
            id: Path::from_parts(parts.iter().map(|p| p.to_string()).collect()),
            params: vec![],
            hash: None,
            escaped: true,
            is_helper: false,
            eligible_helper: false,
        }
    }

    #[test]
    fn test_plain_template_passes() {
        let nodes = vec![
            Node::Text("hello".to_string()),
            Node::Expr(ExprNode::Mustache(mustache(&["name"]))),
        ];
        assert!(validate_template(&nodes).is_none());
    }

    #[test]
    fn test_block_with_empty_helper_path_is_flagged() {
        let block = BlockNode {
            helper: mustache(&[]),
            children: vec![],
            inverse: vec![],
        };
        let error = validate_template(&[Node::Expr(ExprNode::Block(block))]).unwrap();
        assert_eq!(error.code, INV_EMPTY_HELPER_PATH);
    }

    #[test]
    fn test_structural_argument_is_flagged() {
        let mut invocation = mustache(&["if"]);
        invocation.is_helper = true;
        invocation.params = vec![Node::Expr(ExprNode::Mustache(mustache(&["nested"])))];
        let error = validate_template(&[Node::Expr(ExprNode::Mustache(invocation))]).unwrap();
        assert_eq!(error.code, INV_PARAM_KIND);
    }

    #[test]
    fn test_bad_helper_name_is_flagged() {
        let block = BlockNode {
            helper: mustache(&["no spaces"]),
            children: vec![],
            inverse: vec![],
        };
        let error = validate_template(&[Node::Expr(ExprNode::Block(block))]).unwrap();
        assert_eq!(error.code, INV_BAD_HELPER_NAME);
    }

    #[test]
    fn test_hash_values_are_checked() {
        let mut invocation = mustache(&["each"]);
        invocation.is_helper = true;
        invocation.hash = Some(Hash {
            pairs: vec![HashPair {
                name: "key".to_string(),
                value: Node::Text("oops".to_string()),
            }],
        });
        let error = validate_template(&[Node::Expr(ExprNode::Mustache(invocation))]).unwrap();
        assert_eq!(error.code, INV_PARAM_KIND);
    }

    #[test]
    fn test_dashed_and_at_names_are_accepted() {
        assert!(NAME_SEGMENT_RE.is_match("my-helper"));
        assert!(NAME_SEGMENT_RE.is_match("@index"));
        assert!(NAME_SEGMENT_RE.is_match("_private"));
        assert!(!NAME_SEGMENT_RE.is_match("9lives"));
    }
}
