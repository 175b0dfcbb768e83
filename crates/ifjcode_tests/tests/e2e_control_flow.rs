mod common;

use common::compile_ok;

#[test]
fn if_else_emits_both_branch_labels() {
    let ir = compile_ok(
        "package main\nfunc main() {\n\ta := 1\n\tif a < 0 {\n\t\tprint(\"neg\")\n\t} else {\n\t\tprint(\"nonneg\")\n\t}\n}\n",
    );
    assert!(ir.matches("LABEL").count() >= 3, "expected function label plus at least two branch labels, got:\n{ir}");
}

#[test]
fn else_if_chain_parses_and_lowers() {
    let ir = compile_ok(
        "package main\nfunc classify(n int) {\n\tif n < 0 {\n\t\tprint(\"neg\")\n\t} else if n == 0 {\n\t\tprint(\"zero\")\n\t} else {\n\t\tprint(\"pos\")\n\t}\n}\nfunc main() {\n\tclassify(5)\n}\n",
    );
    assert!(ir.contains("JUMPIFEQ") || ir.contains("JUMPIFNEQ"));
}

#[test]
fn for_loop_lowers_to_a_backward_jump() {
    let ir = compile_ok(
        "package main\nfunc main() {\n\ts := 0\n\tfor i := 0; i < 5; i = i + 1 {\n\t\ts = s + i\n\t}\n\tprint(s)\n}\n",
    );
    let jumps = ir.lines().filter(|l| l.starts_with("JUMP ")).count();
    assert!(jumps >= 1, "expected the loop's back-edge JUMP, got:\n{ir}");
}

#[test]
fn shadowed_loop_variable_gets_a_distinct_frame_name() {
    let ir = compile_ok(
        "package main\nfunc main() {\n\tfor x := 0; x < 3; x = x + 1 {\n\t\tx := \"inner\"\n\t\tprint(x)\n\t}\n}\n",
    );
    let renamed: std::collections::HashSet<&str> = ir
        .lines()
        .filter(|l| l.contains("_x"))
        .filter_map(|l| l.split_whitespace().last())
        .collect();
    assert!(renamed.len() >= 2, "expected two distinct renamed `x` bindings, got {renamed:?}");
}

#[test]
fn short_circuit_or_never_evaluates_the_right_operand_when_left_is_true() {
    let ir = compile_ok(
        "package main\nfunc crash() bool {\n\tprint(\"boom\")\n\treturn false\n}\nfunc main() {\n\tif true || crash() {\n\t\tprint(\"ok\")\n\t}\n}\n",
    );
    assert!(!ir.contains("CALL crash"), "true || x must short-circuit without calling x:\n{ir}");
}

#[test]
fn short_circuit_and_with_a_live_left_operand_still_checks_the_right_one() {
    let ir = compile_ok(
        "package main\nfunc main() {\n\ta := 1\n\tif a > 0 && a < 10 {\n\t\tprint(\"in range\")\n\t}\n}\n",
    );
    assert!(ir.contains("JUMPIFEQ") || ir.contains("LTS") || ir.contains("GTS"));
}
