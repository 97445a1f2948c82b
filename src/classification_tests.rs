#[cfg(test)]
mod tests {
    use crate::ast::{ExprNode, MustacheNode, Node, Path};
    use crate::compiler::{Classification, CompilerOptions, OpcodeCompiler};
    use crate::opcode::Opcode;

    fn mustache(name: &str, is_helper: bool, eligible_helper: bool) -> MustacheNode {
        MustacheNode {
            id: Path::from_parts(vec![name.to_string()]),
            params: vec![],
            hash: None,
            escaped: true,
            is_helper,
            eligible_helper,
        }
    }

    fn classify_with(options: CompilerOptions, node: &MustacheNode) -> Classification {
        OpcodeCompiler::new(options).classify(node)
    }

    #[test]
    fn test_known_name_promotes_eligible_mustache() {
        let node = mustache("if", false, true);
        assert_eq!(
            classify_with(CompilerOptions::default(), &node),
            Classification::Helper
        );
    }

    #[test]
    fn test_unknown_name_stays_ambiguous_in_open_world() {
        let node = mustache("maybeHelper", false, true);
        assert_eq!(
            classify_with(CompilerOptions::default(), &node),
            Classification::Ambiguous
        );
    }

    #[test]
    fn test_unknown_name_demotes_under_known_helpers_only() {
        let node = mustache("maybeHelper", false, true);
        let options = CompilerOptions {
            known_helpers_only: true,
            ..Default::default()
        };
        assert_eq!(classify_with(options, &node), Classification::Simple);
    }

    #[test]
    fn test_definite_helper_flag_wins_without_lookup() {
        // An unknown name under closed-world rules still compiles as a
        // helper when the parser already settled it.
        let node = mustache("definitelyAHelper", true, true);
        let options = CompilerOptions {
            known_helpers_only: true,
            ..Default::default()
        };
        assert_eq!(classify_with(options, &node), Classification::Helper);
    }

    #[test]
    fn test_plain_reference_is_simple() {
        let node = mustache("name", false, false);
        assert_eq!(
            classify_with(CompilerOptions::default(), &node),
            Classification::Simple
        );
    }

    #[test]
    fn test_caller_registered_helper_promotes() {
        let node = mustache("shout", false, true);
        let mut options = CompilerOptions::default();
        options.known_helpers.insert("shout".to_string(), true);
        assert_eq!(classify_with(options, &node), Classification::Helper);
    }

    #[test]
    fn test_caller_entry_can_shadow_builtin() {
        // Merge keeps caller values as given, so registering a built-in
        // name as false turns the lookup into a miss.
        let node = mustache("if", false, true);
        let mut options = CompilerOptions::default();
        options.known_helpers.insert("if".to_string(), false);
        assert_eq!(classify_with(options, &node), Classification::Ambiguous);
    }

    #[test]
    fn test_empty_path_never_promotes() {
        let node = MustacheNode {
            id: Path::default(),
            params: vec![],
            hash: None,
            escaped: true,
            is_helper: false,
            eligible_helper: true,
        };
        let options = CompilerOptions {
            known_helpers_only: true,
            ..Default::default()
        };
        assert_eq!(classify_with(options, &node), Classification::Simple);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CLASSIFICATION AS SEEN IN THE OPCODE STREAM
    // ═══════════════════════════════════════════════════════════════════════

    fn compile_one(options: CompilerOptions, node: MustacheNode) -> Vec<Opcode> {
        OpcodeCompiler::new(options)
            .compile(&[Node::Expr(ExprNode::Mustache(node))])
            .unwrap()
    }

    #[test]
    fn test_helper_classification_emits_helper_opcode() {
        let opcodes = compile_one(CompilerOptions::default(), mustache("each", false, true));
        assert!(matches!(opcodes[0], Opcode::Program { program: None, inverse: None }));
        assert!(opcodes
            .iter()
            .any(|op| matches!(op, Opcode::Helper { name, .. } if name == "each")));
    }

    #[test]
    fn test_ambiguous_classification_emits_ambiguous_opcode() {
        let opcodes = compile_one(CompilerOptions::default(), mustache("title", false, true));
        assert_eq!(
            opcodes[0],
            Opcode::Ambiguous {
                name: "title".to_string(),
                escaped: true
            }
        );
    }

    #[test]
    fn test_simple_classification_emits_dynamic_opcode() {
        let options = CompilerOptions {
            known_helpers_only: true,
            ..Default::default()
        };
        let opcodes = compile_one(options, mustache("title", false, true));
        assert_eq!(
            opcodes[0],
            Opcode::Dynamic {
                parts: vec!["title".to_string()],
                escaped: true
            }
        );
    }
}
