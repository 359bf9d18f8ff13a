//! # Puffnotes CLI
//!
//! The binary is thin: the CLI lives in `src/cli/`, and this file only calls
//! `cli::run()` and turns an error into an exit code.
//!
//! ## Workspace Structure
//!
//! - `crates/puffnotesapp/`: the library. Storage, the editor state machines,
//!   autosave, beautify, configuration. No terminal I/O.
//! - `crates/puffnotes/`: this CLI, depending on `puffnotesapp`.
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/puffnotes/src/cli/)                      │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Dispatch and handlers (commands.rs, interactive.rs)      │
//! │  - Terminal output (render.rs, styles.rs)                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Library (crates/puffnotesapp/src/)                         │
//! │  - Editor and session actor                                 │
//! │  - NoteStore implementations, Groq client                   │
//! │  - Returns Results and Notices, never prints                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Logging
//!
//! `tracing` output goes to stderr. `PUFFNOTES_LOG` takes an env-filter
//! directive (default `warn`); `-v` switches to `debug`.
//!
//! ## Testing Approach
//!
//! - Library behavior is tested in the library crate.
//! - Here: clap parsing and rendering in unit tests, and whole commands in
//!   `tests/cli_e2e.rs` against a temporary data directory.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
