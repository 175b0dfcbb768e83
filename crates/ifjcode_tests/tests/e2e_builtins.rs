mod common;

use common::compile_ok;

#[test]
fn print_writes_each_argument() {
    let ir = compile_ok("package main\nfunc main() {\n\tprint(\"a\", \"b\")\n}\n");
    assert_eq!(ir.matches("WRITE").count(), 2);
}

#[test]
fn len_of_a_string_literal_is_read_through_strlen() {
    let ir = compile_ok("package main\nfunc main() {\n\tn := len(\"hello\")\n\tprint(n)\n}\n");
    assert!(ir.contains("STRLEN"));
}

#[test]
fn int2float_and_float2int_round_trip_through_dedicated_ops() {
    let ir = compile_ok(
        "package main\nfunc main() {\n\ta := int2float(3)\n\tb := float2int(a)\n\tprint(a, b)\n}\n",
    );
    assert!(ir.contains("INT2FLOATS") || ir.contains("INT2FLOAT"));
    assert!(ir.contains("FLOAT2INTS") || ir.contains("FLOAT2INT"));
}

#[test]
fn chr_and_ord_return_a_value_and_an_error_flag() {
    let ir = compile_ok(
        "package main\nfunc main() {\n\ts, ok1 := chr(65)\n\tn, ok2 := ord(s, 0)\n\tprint(s, ok1, n, ok2)\n}\n",
    );
    assert!(ir.contains("INT2CHAR"));
    assert!(ir.contains("STRLEN"));
}

#[test]
fn substr_clamps_the_requested_range() {
    let ir = compile_ok(
        "package main\nfunc main() {\n\ts, ok := substr(\"hello\", 1, 3)\n\tprint(s, ok)\n}\n",
    );
    assert!(ir.contains("GETCHAR") || ir.contains("CONCAT"));
}

#[test]
fn inputi_returns_an_int_and_an_error_flag() {
    let ir = compile_ok("package main\nfunc main() {\n\tn, ok := inputi()\n\tprint(n, ok)\n}\n");
    assert!(ir.contains("READ"));
}
