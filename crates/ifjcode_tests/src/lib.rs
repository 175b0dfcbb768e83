//! Integration test suite for the IFJcode20 toolchain.
//!
//! This crate exists only to run the end-to-end tests under `tests/`; all
//! test code lives in `tests/*.rs` and drives the public
//! [`ifjcode_compile::compile_source`] API with full source strings,
//! asserting on the emitted IR text or the returned exit code. Per-module
//! unit tests stay colocated with the code they cover (`ifjcode_base`,
//! `ifjcode_syntax`, `ifjcode_compile`'s own `#[cfg(test)]` modules); this
//! crate is for behavior that only shows up once parsing, folding and
//! emission run together.
