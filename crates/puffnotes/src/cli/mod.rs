//! # CLI Behavior
//!
//! This is **one possible front end** for puffnotes, not the application
//! itself. For the overall architecture, see the crate-level documentation
//! in [`crate`].
//!
//! ### Naked Execution (`puffnotes`)
//!
//! Running `puffnotes` with no arguments lists the notes.
//!
//! ### Creating Notes (`puffnotes new NAME [TEXT]`)
//!
//! Text comes from the trailing words, or from stdin when it is piped:
//!
//! - `puffnotes new groceries eggs milk`
//! - `pbpaste | puffnotes new lecture-3`
//!
//! On the local backend a taken name gets the first free suffix, so creating
//! `untitled` twice leaves `untitled.md` and `untitled-1.md`.
//!
//! ### Beautify (`puffnotes beautify NAME`)
//!
//! Prints the AI version without touching the note. `--accept` replaces the
//! note with it and saves. The user's own key (`puffnotes key set`) is tried
//! before the shared default key.
//!
//! ## Module Structure
//!
//! - `commands`: Dispatch and one-shot handlers
//! - `interactive`: The `edit` line session on top of the editor actor
//! - `render`: Output formatting
//! - `setup`: Argument parsing via clap
//! - `styles`: Terminal styles

mod commands;
mod interactive;
mod render;
pub mod setup;
mod styles;

pub use commands::run;
