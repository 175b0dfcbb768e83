mod common;

use common::assert_fails_with;
use ifjcode_base::ExitCode;

#[test]
fn unterminated_string_is_a_lexical_error() {
    assert_fails_with(
        "package main\nfunc main() {\n\ta := \"unterminated\n}\n",
        ExitCode::Lexical,
    );
}

#[test]
fn missing_eol_between_statements_is_a_syntax_error() {
    assert_fails_with(
        "package main\nfunc main() {\n\ta := 1 b := 2\n}\n",
        ExitCode::SyntaxOrEol,
    );
}

#[test]
fn calling_an_undefined_function_is_undefined_or_redefined() {
    assert_fails_with("package main\nfunc main() {\n\tfoo()\n}\n", ExitCode::UndefinedOrRedefined);
}

#[test]
fn redefining_a_variable_with_a_second_define_is_undefined_or_redefined() {
    assert_fails_with(
        "package main\nfunc main() {\n\ta := 1\n\ta := 2\n\tprint(a)\n}\n",
        ExitCode::UndefinedOrRedefined,
    );
}

#[test]
fn assigning_a_different_type_than_a_variables_declared_type_is_type_incompatible() {
    assert_fails_with(
        "package main\nfunc main() {\n\ta := 1\n\ta = \"x\"\n\tprint(a)\n}\n",
        ExitCode::TypeIncompatibility,
    );
}

#[test]
fn adding_an_int_to_a_string_is_type_incompatible() {
    assert_fails_with(
        "package main\nfunc main() {\n\ta := 1\n\tb := \"x\"\n\tc := a + b\n\tprint(c)\n}\n",
        ExitCode::TypeIncompatibility,
    );
}

#[test]
fn calling_a_function_with_the_wrong_argument_count_is_wrong_params_or_returns() {
    assert_fails_with(
        "package main\nfunc one(n int) {\n\tprint(n)\n}\nfunc main() {\n\tone(1, 2)\n}\n",
        ExitCode::WrongParamsOrReturns,
    );
}

#[test]
fn constant_folded_division_by_zero_is_its_own_exit_code() {
    assert_fails_with(
        "package main\nfunc main() {\n\ta := 1 / 0\n\tprint(a)\n}\n",
        ExitCode::DivisionByZero,
    );
}
