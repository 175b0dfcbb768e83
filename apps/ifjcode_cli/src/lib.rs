//! IFJcode20 compiler CLI — standalone binary library half.
//!
//! The binary (`src/main.rs`) is a thin wrapper around [`run`]: read all of
//! standard input, compile it, write the IR to standard output or the
//! diagnostic to standard error, and return the process exit code (spec
//! §6: "No arguments; reads source from standard input; writes IR to
//! standard output; writes diagnostics to standard error. Exit code is the
//! compiler result code"). Splitting the binary this way keeps `run`
//! testable without spawning a subprocess.

use std::io::{Read, Write};

use ifjcode_compile::{compile_source, format_diagnostic};

/// Reads source from `input`, compiles it, and writes IR to `output` or a
/// diagnostic line to `errors`. Returns the process exit code.
pub fn run<R: Read, W: Write, E: Write>(mut input: R, mut output: W, mut errors: E) -> i32 {
    let mut source = String::new();
    if let Err(e) = input.read_to_string(&mut source) {
        let _ = writeln!(errors, "ifjcode20: error[99]: failed to read standard input: {e}");
        return ifjcode_base::ExitCode::Internal.as_i32();
    }

    match compile_source(&source) {
        Ok(ir) => {
            if let Err(e) = output.write_all(ir.as_bytes()) {
                let _ = writeln!(errors, "ifjcode20: error[99]: failed to write IR: {e}");
                return ifjcode_base::ExitCode::Internal.as_i32();
            }
            0
        }
        Err(err) => {
            log::debug!("compilation failed with exit code {}", err.code);
            let _ = writeln!(errors, "{}", format_diagnostic(&err));
            err.code.as_i32()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_str(src: &str) -> (i32, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run(src.as_bytes(), &mut out, &mut err);
        (code, String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    #[test]
    fn success_writes_ir_and_exits_zero() {
        let (code, out, err) = run_str("package main\nfunc main() {\n\tprint(\"hi\")\n}\n");
        assert_eq!(code, 0);
        assert!(out.starts_with(".IFJcode20"));
        assert!(err.is_empty());
    }

    #[test]
    fn forward_reference_resolved_before_end_of_program_compiles_cleanly() {
        let (code, _out, err) = run_str(
            "package main\nfunc main() {\n\thelper()\n}\nfunc helper() {\n\tprint(\"later\")\n}\n",
        );
        assert_eq!(code, 0, "stderr was: {err}");
    }

    #[test]
    fn truly_undefined_function_is_an_error() {
        let (code, out, err) = run_str("package main\nfunc main() {\n}\nfunc helper() {\n\tnever_defined()\n}\n");
        assert_eq!(code, 3);
        assert!(out.is_empty());
        assert!(err.starts_with("ifjcode20: error[3]:"));
    }
}
