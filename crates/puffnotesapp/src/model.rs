//! # Domain Model: Notes, Names and Identities
//!
//! A note has two names that must not be confused:
//!
//! - **Display name**: what the user types in the title field, e.g. `untitled`.
//!   It carries no extension and is not guaranteed to be unique.
//! - **Storage name**: the display name with the note suffix appended, e.g.
//!   `untitled.md`. This is what a backend stores and lists.
//!
//! The suffix is stripped for display and re-appended for every storage
//! operation. A display name that already ends with the suffix is left alone,
//! so `notes.md` and `notes` both map to `notes.md`.
//!
//! ## Backing Identity
//!
//! [`BackingId`] is the opaque handle a backend returns from a write:
//!
//! - Local directory: the file name itself (`untitled-2.md`).
//! - Drive folder: the file id assigned by the remote store.
//!
//! Callers never parse a `BackingId`; they hand it back to the same backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix of every note file.
pub const NOTE_SUFFIX: &str = ".md";

/// MIME type used for notes on remote stores.
pub const NOTE_MIME_TYPE: &str = "text/markdown";

/// Display name given to fresh notes.
pub const DEFAULT_NOTE_NAME: &str = "untitled";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackingId(String);

impl BackingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One note as listed by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// Storage name, including the suffix.
    pub name: String,
    pub id: BackingId,
}

impl DocumentEntry {
    pub fn new(name: impl Into<String>, id: BackingId) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }

    /// Entry for backends whose identifier is the file name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let id = BackingId::new(name.clone());
        Self { name, id }
    }

    pub fn display_name(&self) -> &str {
        display_name_of(&self.name)
    }

    /// Matches either the storage name or the display name.
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.display_name() == name
    }
}

/// Strip the note suffix for display.
pub fn display_name_of(storage_name: &str) -> &str {
    storage_name
        .strip_suffix(NOTE_SUFFIX)
        .unwrap_or(storage_name)
}

/// Append the note suffix unless it is already there.
pub fn storage_name_for(display_name: &str) -> String {
    let trimmed = display_name.trim();
    if trimmed.ends_with(NOTE_SUFFIX) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, NOTE_SUFFIX)
    }
}

/// Reject names that would escape the storage root or cannot be files.
pub fn is_valid_storage_name(name: &str) -> bool {
    let stem = display_name_of(name);
    !stem.trim().is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
        && name != "."
        && !name.starts_with("..")
}
