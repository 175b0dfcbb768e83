//! Diagnostic formatting for the compiler's stderr output (spec §6/§7).
//!
//! The original emits `"<module>: error: <message>"`-shaped lines to
//! stderr and latches the first non-success exit code; this crate's
//! `CompilerError` already carries that code, so formatting is just
//! rendering the message the same way.

use ifjcode_base::CompilerError;

/// Renders a [`CompilerError`] as a single stderr line, e.g.
/// `ifjcode20: error[5]: cannot assign a value of type string to a
/// variable of type int`.
pub fn format_diagnostic(err: &CompilerError) -> String {
    format!("ifjcode20: error[{}]: {}", err.code, err.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifjcode_base::ExitCode;

    #[test]
    fn formats_code_and_message() {
        let err = CompilerError::type_incompatibility("bad types");
        let line = format_diagnostic(&err);
        assert_eq!(line, "ifjcode20: error[5]: bad types");
    }

    #[test]
    fn internal_error_code_is_99() {
        let err = CompilerError::internal("oops");
        assert_eq!(err.code, ExitCode::Internal);
        assert!(format_diagnostic(&err).contains("error[99]"));
    }
}
