//! # Puffnotes Architecture
//!
//! Puffnotes is a **local-first markdown notes library**. One note is open at
//! a time; it is saved automatically a moment after the user stops typing,
//! to a local directory or to a Google Drive folder. An optional AI pass
//! ("beautify") turns rough notes into a polished version the user can accept
//! or throw away.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Front end (the `puffnotes` CLI, or any other UI)           │
//! │  - Sends commands, renders snapshots and notices            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Session (session.rs)                                       │
//! │  - One tokio task owning the editor                         │
//! │  - Timers, spawned saves and beautify requests              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Editor (editor.rs, document.rs, autosave.rs, beautify/)    │
//! │  - Plain state machines, time passed in explicitly          │
//! │  - Produces jobs, applies their reports                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (store/)                                           │
//! │  - NoteStore trait: LocalStore, DriveStore, MemStore        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No Terminal in the Core
//!
//! Nothing in this crate prints. Outcomes are `Result`s, snapshots and
//! [`notice::Notice`]s, and the front end decides what the user sees.
//!
//! ## Testing Strategy
//!
//! - The editor is tested directly, passing instants by hand.
//! - The session is tested on a paused tokio clock against [`store::memory::MemStore`].
//! - The HTTP stores and clients are tested against an in-process server.
//!
//! ## Module Overview
//!
//! - [`model`]: Names, identifiers and listed entries
//! - [`store`]: Storage abstraction and implementations
//! - [`naming`]: Free-name probing for first saves
//! - [`document`]: The open note and its save state
//! - [`autosave`]: Debouncer and save jobs
//! - [`beautify`]: The AI transform session and the Groq client
//! - [`editor`]: Everything above, put together
//! - [`session`]: The editor on its own task
//! - [`notice`]: User-facing notices
//! - [`config`]: Configuration management
//! - [`prefs`]: Persisted preferences (API key, onboarding)
//! - [`preview`]: Markdown to HTML
//! - [`init`]: Building a context from configuration
//! - [`error`]: Error types

pub mod autosave;
pub mod beautify;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod init;
pub mod model;
pub mod naming;
pub mod notice;
pub mod prefs;
pub mod preview;
pub mod session;
pub mod store;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
