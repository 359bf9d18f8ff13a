//! # Storage Layer
//!
//! This module defines the storage abstraction for puffnotes. The [`NoteStore`]
//! trait lets the editor work against any backing store of named text notes,
//! and the active implementation is injected once per session as
//! `Arc<dyn NoteStore>`.
//!
//! ## Storage Roots
//!
//! Every store is bound to a single root and never reaches outside it:
//!
//! - **Local**: a directory granted through a [`local::FolderPicker`].
//! - **Drive**: a `(bearer token, folder id)` pair. The folder is looked up by
//!   name and created if absent, once per sign-in.
//!
//! Binding is a consent step. A user who dismisses the picker or the sign-in
//! prompt produces [`BindOutcome::Cancelled`], which callers treat as a silent
//! no-op rather than an error. Binding can be repeated when a previous root
//! stops working.
//!
//! ## Atomicity
//!
//! `write_document` must never leave a truncated note visible. The local store
//! writes to a hidden temporary file and renames it into place; the drive
//! store sends content and metadata in a single multipart request.
//!
//! ## Naming
//!
//! Stores differ in who picks identifiers (see [`NamingPolicy`]):
//!
//! - The local store uses the file name as identifier, so a first save must
//!   probe for a free name (see [`crate::naming`]).
//! - The drive store gets a fresh id for every create, so duplicate names are
//!   harmless and no probing happens.
//!
//! ## Implementations
//!
//! - [`local::LocalStore`]: notes as `.md` files in a directory.
//! - [`drive::DriveStore`]: notes in a Google Drive folder over HTTPS.
//! - [`memory::MemStore`]: in-memory store for tests, with failure and latency
//!   simulation.

use crate::error::Result;
use crate::model::{BackingId, DocumentEntry};
use async_trait::async_trait;

pub mod drive;
pub mod local;
pub mod memory;

/// Result of asking the user for a storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    /// The user dismissed the prompt. Not an error.
    Cancelled,
}

/// Who assigns identifiers on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingPolicy {
    /// The identifier is the file name; first saves probe for a free name
    /// and renames move the file.
    NameIsId,
    /// The store assigns a fresh identifier per create; renames update the
    /// entry in place.
    StoreAssigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Local,
    Drive,
    Memory,
}

impl StoreKind {
    pub fn label(&self) -> &'static str {
        match self {
            StoreKind::Local => "local",
            StoreKind::Drive => "drive",
            StoreKind::Memory => "memory",
        }
    }
}

/// Abstract interface for note storage.
///
/// All methods take `&self`: stores keep their bound root behind interior
/// mutability so that a save running in the background and the editor can
/// share one instance.
#[async_trait]
pub trait NoteStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    fn naming(&self) -> NamingPolicy;

    /// Whether a root is currently bound.
    fn is_bound(&self) -> bool;

    /// Obtain consent for a root and bind to it. Re-invocable.
    async fn bind_root(&self) -> Result<BindOutcome>;

    /// List all notes under the root.
    /// Fails with `StorageUnavailable` when no root is bound.
    async fn list_documents(&self) -> Result<Vec<DocumentEntry>>;

    /// Read a note. Fails with `NotFound` when the entry is gone.
    async fn read_document(&self, id: &BackingId) -> Result<String>;

    /// Create (when `id` is `None`) or overwrite a note.
    /// Returns the identifier of the written entry.
    async fn write_document(
        &self,
        name: &str,
        content: &str,
        id: Option<&BackingId>,
    ) -> Result<BackingId>;

    /// Delete a note. Returns `Ok(false)` when it was already absent.
    async fn delete_document(&self, id: &BackingId) -> Result<bool>;
}
