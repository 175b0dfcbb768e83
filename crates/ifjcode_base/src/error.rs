//! Compiler-wide error taxonomy and process exit codes.
//!
//! The exit code values are pinned exactly to the original compiler's
//! `return_codes.h` taxonomy: a test harness feeding this compiler a corpus
//! of programs distinguishes failure classes by exit code alone, so these
//! numbers are part of the contract, not an implementation detail.

use std::fmt;

/// A single compiler-wide error, carrying the process exit code it maps to.
#[derive(Debug, Clone)]
pub struct CompilerError {
    pub code: ExitCode,
    pub message: String,
}

impl CompilerError {
    pub fn new(code: ExitCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn lexical(message: impl Into<String>) -> Self {
        Self::new(ExitCode::Lexical, message)
    }

    pub fn syntax_or_eol(message: impl Into<String>) -> Self {
        Self::new(ExitCode::SyntaxOrEol, message)
    }

    pub fn undefined_or_redefined(message: impl Into<String>) -> Self {
        Self::new(ExitCode::UndefinedOrRedefined, message)
    }

    pub fn wrong_type_of_new_variable(message: impl Into<String>) -> Self {
        Self::new(ExitCode::WrongTypeOfNewVariable, message)
    }

    pub fn type_incompatibility(message: impl Into<String>) -> Self {
        Self::new(ExitCode::TypeIncompatibility, message)
    }

    pub fn wrong_params_or_returns(message: impl Into<String>) -> Self {
        Self::new(ExitCode::WrongParamsOrReturns, message)
    }

    pub fn semantic_general(message: impl Into<String>) -> Self {
        Self::new(ExitCode::SemanticGeneral, message)
    }

    pub fn division_by_zero(message: impl Into<String>) -> Self {
        Self::new(ExitCode::DivisionByZero, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ExitCode::Internal, message)
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompilerError {}

/// Process exit codes, matching the original compiler's taxonomy exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Lexical = 1,
    SyntaxOrEol = 2,
    UndefinedOrRedefined = 3,
    WrongTypeOfNewVariable = 4,
    TypeIncompatibility = 5,
    WrongParamsOrReturns = 6,
    SemanticGeneral = 7,
    DivisionByZero = 9,
    Internal = 99,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

pub type Result<T> = std::result::Result<T, CompilerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_values_match_taxonomy() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::Lexical.as_i32(), 1);
        assert_eq!(ExitCode::SyntaxOrEol.as_i32(), 2);
        assert_eq!(ExitCode::UndefinedOrRedefined.as_i32(), 3);
        assert_eq!(ExitCode::WrongTypeOfNewVariable.as_i32(), 4);
        assert_eq!(ExitCode::TypeIncompatibility.as_i32(), 5);
        assert_eq!(ExitCode::WrongParamsOrReturns.as_i32(), 6);
        assert_eq!(ExitCode::SemanticGeneral.as_i32(), 7);
        assert_eq!(ExitCode::DivisionByZero.as_i32(), 9);
        assert_eq!(ExitCode::Internal.as_i32(), 99);
    }

    #[test]
    fn constructors_set_expected_codes() {
        assert_eq!(CompilerError::lexical("x").code, ExitCode::Lexical);
        assert_eq!(
            CompilerError::division_by_zero("x").code,
            ExitCode::DivisionByZero
        );
        assert_eq!(CompilerError::internal("x").code, ExitCode::Internal);
    }

    #[test]
    fn display_shows_message_not_code() {
        let err = CompilerError::semantic_general("oops");
        assert_eq!(err.to_string(), "oops");
    }
}
