use ifjcode_base::ExitCode;
use ifjcode_compile::compile_source;

/// Compiles `src` and returns the emitted IR, panicking with the diagnostic
/// message if compilation fails.
pub fn compile_ok(src: &str) -> String {
    compile_source(src).unwrap_or_else(|e| panic!("expected successful compile, got: {e}"))
}

/// Compiles `src` and asserts it fails with exactly `code`.
pub fn assert_fails_with(src: &str, code: ExitCode) {
    match compile_source(src) {
        Ok(ir) => panic!("expected exit code {code}, compiled successfully:\n{ir}"),
        Err(e) => assert_eq!(e.code, code, "wrong exit code for: {}", e.message),
    }
}

/// Asserts every needle in `needles` appears somewhere in `ir`, in order.
pub fn assert_contains_in_order(ir: &str, needles: &[&str]) {
    let mut rest = ir;
    for needle in needles {
        let idx = rest
            .find(needle)
            .unwrap_or_else(|| panic!("expected to find {needle:?} in remaining IR:\n{rest}"));
        rest = &rest[idx + needle.len()..];
    }
}
