//! Scanner, symbol table, typed AST, CFG, and the expression/statement
//! parsers for the IFJcode20 source language (spec components A–E, G).
//!
//! [`stmt_parser::parse_program`] is the crate's single entry point: it
//! drives the scanner through [`cursor::TokenCursor`], delegates expression
//! grammar to [`expr_parser`], and returns a [`stmt_parser::Program`] — every
//! function's [`cfg::CfgFunction`] plus the process-wide global
//! [`symtable::SymbolTable`] — ready for [`fold::fold_program`] and then the
//! IR emitter in `ifjcode_compile`.

pub mod ast;
pub mod builtins;
pub mod cfg;
pub mod cursor;
pub mod expr_parser;
pub mod fold;
pub mod lexer;
pub mod stmt_parser;
pub mod symtable;
pub mod token;
pub mod types;

pub use stmt_parser::{parse_program, Program};
