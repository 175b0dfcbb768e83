mod common;

use common::{assert_contains_in_order, compile_ok};

#[test]
fn multi_return_values_pop_in_the_declared_target_order() {
    let ir = compile_ok(
        "package main\nfunc two() (int, int) {\n\treturn 1, 2\n}\nfunc main() {\n\ta, b := two()\n\tprint(a, b)\n}\n",
    );
    assert_contains_in_order(&ir, &["CALL", "two", "POPS"]);
}

#[test]
fn named_returns_are_readable_as_locals_inside_the_body() {
    let ir = compile_ok(
        "package main\nfunc split(n int) (half int, rem int) {\n\thalf = n / 2\n\trem = n - half * 2\n\treturn\n}\nfunc main() {\n\ta, b := split(7)\n\tprint(a, b)\n}\n",
    );
    assert!(ir.contains("LABEL"), "expected a function label for split, got:\n{ir}");
}

#[test]
fn forward_reference_to_a_later_function_compiles() {
    let ir = compile_ok(
        "package main\nfunc main() {\n\thelper()\n}\nfunc helper() {\n\tprint(\"later\")\n}\n",
    );
    assert!(ir.contains("CALL") && ir.contains("helper"));
}

#[test]
fn recursive_call_lowers_like_any_other_call() {
    let ir = compile_ok(
        "package main\nfunc fact(n int) int {\n\tif n < 2 {\n\t\treturn 1\n\t}\n\treturn n * fact(n - 1)\n}\nfunc main() {\n\tprint(fact(5))\n}\n",
    );
    assert!(ir.contains("CALL") && ir.contains("fact"));
}

#[test]
fn nested_user_call_as_an_argument_does_not_clobber_the_outer_frame() {
    let ir = compile_ok(
        "package main\nfunc bar(n int) int {\n\treturn n + 1\n}\nfunc foo(n int) int {\n\treturn n * 2\n}\nfunc main() {\n\tprint(foo(bar(3)))\n}\n",
    );
    let call_bar = ir.find("CALL bar").expect("expected a call to bar");
    let last_createframe = ir
        .rfind("CREATEFRAME")
        .expect("expected at least one CREATEFRAME");
    assert!(
        last_createframe > call_bar,
        "foo's CREATEFRAME must follow bar's CALL, not precede it (it would tear down \
         bar's own temporary frame before bar runs):\n{ir}"
    );
}

#[test]
fn unreferenced_function_is_still_emitted() {
    let ir = compile_ok(
        "package main\nfunc main() {\n\tprint(\"hi\")\n}\nfunc never_called() {\n\tprint(\"dead\")\n}\n",
    );
    assert!(ir.contains("never_called"), "unreferenced functions are not dead-code eliminated");
}
