//! # The Open Document
//!
//! Exactly one note is open at a time. [`Document`] holds its text, its display
//! name, which backing entry it maps to (if any), and where it stands relative
//! to the store:
//!
//! ```text
//!  New ──edit/rename──▶ Unsaved ──begin_save──▶ Saving ──ok──▶ Saved
//!                          ▲                      │  │
//!                          └──────edit/fail───────┘  └─fail after rename (remote)─▶ Conflict
//! ```
//!
//! ## Snapshots, Epochs and Revisions
//!
//! A save works on a [`SaveTicket`]: a copy of the content and name taken when
//! the save starts. Edits that arrive while the save runs go to the live
//! document only and are picked up by the next save.
//!
//! Two counters decide what a finished save may do:
//!
//! - `epoch` changes whenever the document is superseded (new note, opened
//!   another one). A result for an older epoch is dropped without effect.
//! - `revision` changes on every mutation. A successful save only marks the
//!   document `Saved` if no mutation happened since its ticket was taken.

use crate::model::{display_name_of, storage_name_for, BackingId, DEFAULT_NOTE_NAME};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveState {
    /// Never persisted.
    New,
    /// Changed since the last successful save.
    Unsaved,
    /// A persist is in flight.
    Saving,
    /// Matches the store as of the last successful write.
    Saved,
    /// A remote save failed after the note was renamed.
    Conflict,
}

/// Snapshot of the document taken when a save starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    pub epoch: u64,
    pub revision: u64,
    pub display_name: String,
    pub content: String,
    pub backing: Option<BackingId>,
}

impl SaveTicket {
    pub fn storage_name(&self) -> String {
        storage_name_for(&self.display_name)
    }
}

/// Where a successful save put the note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAs {
    pub id: BackingId,
    /// Storage name actually used, after collision probing.
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Document {
    content: String,
    display_name: String,
    backing: Option<BackingId>,
    state: SaveState,
    last_saved_at: Option<DateTime<Utc>>,
    epoch: u64,
    revision: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            display_name: DEFAULT_NOTE_NAME.to_string(),
            backing: None,
            state: SaveState::New,
            last_saved_at: None,
            epoch: 0,
            revision: 0,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn storage_name(&self) -> String {
        storage_name_for(&self.display_name)
    }

    pub fn backing(&self) -> Option<&BackingId> {
        self.backing.as_ref()
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// No usable name to save under, persisted before or not.
    pub fn has_blank_name(&self) -> bool {
        self.display_name.trim().is_empty()
    }

    pub fn needs_save(&self) -> bool {
        matches!(self.state, SaveState::Unsaved | SaveState::Conflict)
    }

    pub fn edit(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.touch();
    }

    pub fn rename(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
        self.touch();
    }

    /// Promote an accepted AI result into the note.
    pub fn replace_from_beautify(&mut self, text: impl Into<String>) {
        self.edit(text);
    }

    /// Replace everything with a note loaded from the store.
    pub fn open_existing(&mut self, id: BackingId, storage_name: &str, content: String) {
        self.content = content;
        self.display_name = display_name_of(storage_name).to_string();
        self.backing = Some(id);
        self.state = SaveState::Saved;
        self.last_saved_at = None;
        self.supersede();
    }

    /// Start over with a fresh, never saved note.
    pub fn reset(&mut self) {
        self.content.clear();
        self.display_name = DEFAULT_NOTE_NAME.to_string();
        self.backing = None;
        self.state = SaveState::New;
        self.last_saved_at = None;
        self.supersede();
    }

    pub fn begin_save(&mut self) -> SaveTicket {
        self.state = SaveState::Saving;
        SaveTicket {
            epoch: self.epoch,
            revision: self.revision,
            display_name: self.display_name.trim().to_string(),
            content: self.content.clone(),
            backing: self.backing.clone(),
        }
    }

    /// Apply a successful save. Returns false when the ticket is stale.
    ///
    /// With `adopt_name`, a probed name (`untitled-2.md`) becomes the display
    /// name, unless the user renamed the note while the save was running.
    pub fn complete_save(&mut self, ticket: &SaveTicket, saved: SavedAs, adopt_name: bool) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        self.backing = Some(saved.id);
        self.last_saved_at = Some(Utc::now());
        if adopt_name && self.display_name.trim() == ticket.display_name {
            self.display_name = display_name_of(&saved.name).to_string();
        }
        self.state = if self.revision == ticket.revision {
            SaveState::Saved
        } else {
            SaveState::Unsaved
        };
        true
    }

    /// Apply a failed save. Returns false when the ticket is stale.
    ///
    /// With `conflict_on_rename`, a failure after the name changed since the
    /// ticket was taken moves to `Conflict` instead of `Unsaved`.
    pub fn fail_save(&mut self, ticket: &SaveTicket, conflict_on_rename: bool) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        let renamed = self.display_name.trim() != ticket.display_name;
        self.state = if conflict_on_rename && renamed {
            SaveState::Conflict
        } else {
            SaveState::Unsaved
        };
        true
    }

    /// The save never reported back; the note counts as unsaved again.
    pub fn interrupt_save(&mut self) {
        if self.state == SaveState::Saving {
            self.state = SaveState::Unsaved;
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.state = SaveState::Unsaved;
    }

    fn supersede(&mut self) {
        self.epoch += 1;
        self.revision = 0;
    }
}
