//! Shared primitives used across the IFJcode20 compiler crates: bump
//! allocation, string interning, source spans/positions, and the
//! compiler-wide error/exit-code taxonomy.

pub mod arena;
pub mod error;
pub mod intern;
pub mod span;

pub use arena::Arena;
pub use error::{CompilerError, ExitCode, Result};
pub use intern::{Interner, Symbol, SymbolEq};
pub use span::{Position, Span};
