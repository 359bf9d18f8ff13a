//! # First-Save Naming
//!
//! When a note is persisted for the first time on a store whose identifiers
//! are file names, the desired name may already be taken. The policy is
//! deterministic:
//!
//! 1. `base = storage_name_for(display_name)`.
//! 2. If nothing in the root is called `base`, use it.
//! 3. Otherwise probe `stem-1.md`, `stem-2.md`, ... and take the first free one.
//!
//! A rename of an already saved local note goes through the same policy,
//! since it creates a new file. The note's own file does not count as taken,
//! so moving `a-1.md` to `a` while `a.md` exists keeps `a-1.md`.
//!
//! The check and the following write are not atomic. Another program creating
//! the same file in between wins the race; that is accepted for a
//! single-user folder. Stores that assign their own identifiers skip this
//! entirely.

use crate::error::Result;
use crate::model::{display_name_of, storage_name_for, BackingId, NOTE_SUFFIX};
use crate::store::NoteStore;
use std::collections::HashSet;

/// Pick the first name not in `taken`, following the suffix policy.
pub fn first_free_name(display_name: &str, taken: &HashSet<String>) -> String {
    let base = storage_name_for(display_name);
    if !taken.contains(&base) {
        return base;
    }
    let stem = display_name_of(&base);
    (1u64..)
        .map(|n| format!("{}-{}{}", stem, n, NOTE_SUFFIX))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(base)
}

/// Resolve a free storage name against the current contents of the store.
pub async fn resolve_available_name(store: &dyn NoteStore, display_name: &str) -> Result<String> {
    let taken: HashSet<String> = store
        .list_documents()
        .await?
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    Ok(first_free_name(display_name, &taken))
}

/// Like [`resolve_available_name`], ignoring the file the note is moving from.
pub async fn resolve_move_target(
    store: &dyn NoteStore,
    display_name: &str,
    from: &BackingId,
) -> Result<String> {
    let taken: HashSet<String> = store
        .list_documents()
        .await?
        .into_iter()
        .filter(|entry| entry.id != *from)
        .map(|entry| entry.name)
        .collect();
    Ok(first_free_name(display_name, &taken))
}
