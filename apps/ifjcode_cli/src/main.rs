//! IFJcode20 compiler — standalone binary.
//!
//! Thin wrapper around [`ifjcode_cli::run`]: stdin in, IR on stdout or a
//! diagnostic on stderr, process exit code out. `RUST_LOG=debug` surfaces
//! the pass-boundary trace (`parse → fold → emit`) on stderr alongside the
//! diagnostic, same convention as the rest of the toolchain's crates.

use std::io;

fn main() {
    env_logger::init();
    let code = ifjcode_cli::run(io::stdin(), io::stdout(), io::stderr());
    std::process::exit(code);
}
