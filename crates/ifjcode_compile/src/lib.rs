//! Top-level compilation pipeline (spec §2 "driver chains parse → optimise
//! → emit") and the IR emitter (component F, `emitter`).
//!
//! [`compile::compile_source`] is the crate's single entry point: parse →
//! fold → emit, returning either the finished IR text or the
//! [`ifjcode_base::CompilerError`] (and its exit code) the first failing
//! pass produced. The CLI binary in `apps/ifjcode_cli` is a thin wrapper
//! around this function.

pub mod compile;
pub mod diagnostic;
pub mod emitter;

pub use compile::compile_source;
pub use diagnostic::format_diagnostic;
