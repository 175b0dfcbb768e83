mod common;

use common::compile_ok;

#[test]
fn arithmetic_is_constant_folded_before_emission() {
    let ir = compile_ok("package main\nfunc main() {\n\ta := 1 + 2 + 3\n\tprint(a)\n}\n");
    assert!(ir.contains("int@6"));
    assert!(!ir.contains("ADDS"));
}

#[test]
fn compound_add_assign_reads_and_writes_the_same_variable() {
    let ir = compile_ok("package main\nfunc main() {\n\ta := 1\n\ta += 4\n\tprint(a)\n}\n");
    assert!(ir.contains("int@5"), "`a += 4` on a folded `a := 1` should constant-fold to 5:\n{ir}");
}

#[test]
fn compound_assign_on_a_runtime_value_lowers_to_an_arithmetic_op() {
    let ir = compile_ok(
        "package main\nfunc main() {\n\ta := inputi()\n\ta *= 2\n\tprint(a)\n}\n",
    );
    assert!(ir.contains("MULS") || ir.contains("MUL"), "expected a runtime multiply, got:\n{ir}");
}

#[test]
fn float_division_preserves_a_c99_hex_float_literal() {
    let ir = compile_ok("package main\nfunc main() {\n\ta := 1.5\n\tprint(a)\n}\n");
    assert!(ir.contains("float@0x"), "expected a C99 hex-float literal, got:\n{ir}");
}

#[test]
fn string_concatenation_uses_concat_not_arithmetic_add() {
    let ir = compile_ok(
        "package main\nfunc main() {\n\ta := \"foo\"\n\tb := \"bar\"\n\tc := a + b\n\tprint(c)\n}\n",
    );
    assert!(ir.contains("CONCAT"), "expected a CONCAT for string `+`, got:\n{ir}");
}
