//! The `parse → optimise → emit` pipeline (spec §2's data-flow summary).
//!
//! Owns the arena and interner for a single compilation: both outlive the
//! parse and fold passes (symbols, interned identifiers and `ConstString`
//! literals borrow from them throughout), and are dropped once the IR text
//! has been produced.

use ifjcode_base::{Arena, CompilerError, Interner, Result};
use ifjcode_syntax::fold::fold_program;
use ifjcode_syntax::stmt_parser::parse_program;

use crate::emitter::emit_program;

/// Compiles IFJcode20-family source text to stack-machine IR text.
///
/// Mirrors spec.md §2's component chain: the recursive-descent statement
/// parser (which drives the scanner and the precedence expression parser)
/// builds the typed AST/CFG and symbol tables; the constant folder rewrites
/// the AST in place; the emitter lowers the folded CFG to IR. The first
/// pass to fail short-circuits the rest, matching §7's "first non-success
/// wins" exit-code rule — `?` gives this for free since each pass returns
/// as soon as it hits an error.
pub fn compile_source(source: &str) -> Result<String> {
    let arena: Arena<u8> = Arena::new();
    let mut interner = Interner::new();

    log::debug!("parsing {} byte(s) of source", source.len());
    let program = parse_program(source, &arena, &mut interner)?;
    log::debug!("parsed {} function(s)", program.functions.len());

    log::debug!("folding constants");
    fold_program(&program.functions)?;

    log::debug!("emitting IR");
    let ir = emit_program(&program, &interner)?;
    log::trace!("emitted {} byte(s) of IR", ir.len());

    Ok(ir)
}

/// Compiles and maps any failure to its process exit code, the shape the
/// CLI driver needs (spec §6: "Exit code is the compiler result code").
pub fn compile_to_exit(source: &str) -> std::result::Result<String, CompilerError> {
    compile_source(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifjcode_base::ExitCode;

    #[test]
    fn hello_world_emits_preamble_write_and_exit() {
        let src = "package main\nfunc main() {\n\tprint(\"hi\")\n}\n";
        let ir = compile_source(src).unwrap();
        assert!(ir.starts_with(".IFJcode20\n"));
        assert!(ir.contains("WRITE string@hi"));
        assert_eq!(ir.matches("WRITE string@hi").count(), 1);
        assert!(ir.contains("EXIT int@0"));
    }

    #[test]
    fn arithmetic_is_folded_before_emission() {
        let src = "package main\nfunc main() {\n\ta := 1 + 2 + 3\n\tprint(a)\n}\n";
        let ir = compile_source(src).unwrap();
        assert!(ir.contains("int@6"));
        assert!(!ir.contains("ADDS"));
    }

    #[test]
    fn short_circuit_and_never_calls_the_right_operand() {
        let src = "package main\nfunc crash() bool {\n\tprint(\"boom\")\n\treturn true\n}\nfunc main() {\n\tif false && crash() {\n\t\tprint(\"x\")\n\t}\n}\n";
        let ir = compile_source(src).unwrap();
        assert!(!ir.contains("CALL crash"));
    }

    #[test]
    fn multi_return_call_pops_targets_in_declared_order() {
        let src = "package main\nfunc two() (int, int) {\n\treturn 1, 2\n}\nfunc main() {\n\ta, b := two()\n\tprint(a, b)\n}\n";
        let ir = compile_source(src).unwrap();
        let call_idx = ir.find("CALL two").unwrap();
        let rest = &ir[call_idx..];
        let pops: Vec<&str> = rest.lines().filter(|l| l.starts_with("POPS")).take(2).collect();
        assert_eq!(pops.len(), 2);
        assert!(pops[0].contains("_a"));
        assert!(pops[1].contains("_b"));
    }

    #[test]
    fn type_mismatch_is_reported_as_type_incompatibility() {
        let src = "package main\nfunc main() {\n\ta := 1\n\tb := \"x\"\n\tc := a + b\n}\n";
        let err = compile_source(src).unwrap_err();
        assert_eq!(err.code, ExitCode::TypeIncompatibility);
    }

    #[test]
    fn undefined_function_is_reported() {
        let src = "package main\nfunc main() {\n\tfoo()\n}\n";
        let err = compile_source(src).unwrap_err();
        assert_eq!(err.code, ExitCode::UndefinedOrRedefined);
    }

    #[test]
    fn division_by_zero_literal_is_reported() {
        let src = "package main\nfunc main() {\n\ta := 1 / 0\n\tprint(a)\n}\n";
        let err = compile_source(src).unwrap_err();
        assert_eq!(err.code, ExitCode::DivisionByZero);
    }

    #[test]
    fn shadowed_variables_get_distinct_frame_names() {
        let src = "package main\nfunc main() {\n\tfor x := 0; x < 3; x = x + 1 {\n\t\tx := \"inner\"\n\t\tprint(x)\n\t}\n}\n";
        let ir = compile_source(src).unwrap();
        let names: std::collections::HashSet<&str> = ir
            .lines()
            .filter(|l| l.contains("_x"))
            .filter_map(|l| l.split_whitespace().last())
            .collect();
        assert!(names.len() >= 2, "expected distinct renamed `x` operands, got {:?}", names);
    }
}
