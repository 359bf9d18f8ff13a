use super::{BindOutcome, NamingPolicy, NoteStore, StoreKind};
use crate::error::{PuffError, Result};
use crate::model::{is_valid_storage_name, BackingId, DocumentEntry, NOTE_SUFFIX};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Consent capability for choosing the notes directory.
///
/// Returns `Ok(None)` when the user cancels.
#[async_trait]
pub trait FolderPicker: Send + Sync {
    async fn pick_folder(&self) -> Result<Option<PathBuf>>;
}

/// Picker that always grants one preconfigured directory, creating it if needed.
pub struct FixedFolder {
    path: PathBuf,
}

impl FixedFolder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FolderPicker for FixedFolder {
    async fn pick_folder(&self) -> Result<Option<PathBuf>> {
        fs::create_dir_all(&self.path).await?;
        Ok(Some(self.path.clone()))
    }
}

/// Notes stored as `.md` files in a single directory.
///
/// The file name is the identifier. Without a picker the host has no way to
/// grant a directory; the store then degrades to no-ops and warns once.
pub struct LocalStore {
    picker: Option<Box<dyn FolderPicker>>,
    root: RwLock<Option<PathBuf>>,
    unsupported_warning: Once,
}

impl LocalStore {
    pub fn new(picker: impl FolderPicker + 'static) -> Self {
        Self {
            picker: Some(Box::new(picker)),
            root: RwLock::new(None),
            unsupported_warning: Once::new(),
        }
    }

    /// A store for hosts without directory access.
    pub fn unsupported() -> Self {
        Self {
            picker: None,
            root: RwLock::new(None),
            unsupported_warning: Once::new(),
        }
    }

    /// Bind directly to a directory, skipping the picker.
    pub fn with_root(self, root: impl Into<PathBuf>) -> Self {
        *self.root.write() = Some(root.into());
        self
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.root.read().clone()
    }

    fn is_supported(&self) -> bool {
        if self.picker.is_none() {
            self.unsupported_warning.call_once(|| {
                warn!("Local folder access is not available here; notes will not be saved");
            });
            return false;
        }
        true
    }

    fn bound_root(&self) -> Result<PathBuf> {
        self.root.read().clone().ok_or(PuffError::StorageUnavailable)
    }

    fn entry_path(&self, root: &Path, name: &str) -> Result<PathBuf> {
        if !is_valid_storage_name(name) {
            return Err(PuffError::InvalidName(name.to_string()));
        }
        Ok(root.join(name))
    }
}

#[async_trait]
impl NoteStore for LocalStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Local
    }

    fn naming(&self) -> NamingPolicy {
        NamingPolicy::NameIsId
    }

    fn is_bound(&self) -> bool {
        self.root.read().is_some()
    }

    async fn bind_root(&self) -> Result<BindOutcome> {
        if !self.is_supported() {
            return Ok(BindOutcome::Cancelled);
        }
        let Some(picker) = self.picker.as_ref() else {
            return Ok(BindOutcome::Cancelled);
        };
        match picker.pick_folder().await? {
            Some(path) => {
                info!(root = %path.display(), "Bound notes folder");
                *self.root.write() = Some(path);
                Ok(BindOutcome::Bound)
            }
            None => {
                debug!("Folder selection cancelled");
                Ok(BindOutcome::Cancelled)
            }
        }
    }

    async fn list_documents(&self) -> Result<Vec<DocumentEntry>> {
        if !self.is_supported() {
            return Ok(Vec::new());
        }
        let root = self.bound_root()?;

        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(NOTE_SUFFIX) && !name.starts_with('.') {
                    entries.push(DocumentEntry::named(name));
                }
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read_document(&self, id: &BackingId) -> Result<String> {
        if !self.is_supported() {
            return Err(PuffError::NotFound(id.to_string()));
        }
        let root = self.bound_root()?;
        let path = self.entry_path(&root, id.as_str())?;
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PuffError::NotFound(id.to_string())),
            Err(e) => Err(PuffError::Io(e)),
        }
    }

    async fn write_document(
        &self,
        name: &str,
        content: &str,
        id: Option<&BackingId>,
    ) -> Result<BackingId> {
        if !self.is_supported() {
            return Err(PuffError::StorageUnavailable);
        }
        let root = self.bound_root()?;
        let file_name = id.map(BackingId::as_str).unwrap_or(name);
        let target_path = self.entry_path(&root, file_name)?;

        // Atomic Write
        let tmp_path = root.join(format!(".note-{}.tmp", Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp_path, content).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(PuffError::Io(e));
        }
        if let Err(e) = fs::rename(&tmp_path, &target_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(PuffError::Io(e));
        }

        debug!(file = file_name, bytes = content.len(), "Wrote note");
        Ok(BackingId::new(file_name))
    }

    async fn delete_document(&self, id: &BackingId) -> Result<bool> {
        if !self.is_supported() {
            return Ok(false);
        }
        let root = self.bound_root()?;
        let path = self.entry_path(&root, id.as_str())?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PuffError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct CancellingPicker;

    #[async_trait]
    impl FolderPicker for CancellingPicker {
        async fn pick_folder(&self) -> Result<Option<PathBuf>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn unbound_store_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(FixedFolder::new(temp.path()));

        assert!(!store.is_bound());
        assert!(matches!(
            store.list_documents().await,
            Err(PuffError::StorageUnavailable)
        ));
    }

    #[tokio::test]
    async fn cancelled_picker_leaves_store_unbound() {
        let store = LocalStore::new(CancellingPicker);

        let outcome = store.bind_root().await.unwrap();

        assert_eq!(outcome, BindOutcome::Cancelled);
        assert!(!store.is_bound());
    }

    #[tokio::test]
    async fn fixed_folder_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let notes = temp.path().join("nested").join("notes");
        let store = LocalStore::new(FixedFolder::new(&notes));

        assert_eq!(store.bind_root().await.unwrap(), BindOutcome::Bound);
        assert!(notes.is_dir());
        assert_eq!(store.root(), Some(notes));
    }

    #[tokio::test]
    async fn unsupported_store_degrades_to_noops() {
        let store = LocalStore::unsupported();

        assert_eq!(store.bind_root().await.unwrap(), BindOutcome::Cancelled);
        assert!(store.list_documents().await.unwrap().is_empty());
        assert!(!store
            .delete_document(&BackingId::new("a.md"))
            .await
            .unwrap());
        assert!(matches!(
            store.write_document("a.md", "x", None).await,
            Err(PuffError::StorageUnavailable)
        ));
    }

    #[tokio::test]
    async fn rejects_names_outside_root() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(FixedFolder::new(temp.path())).with_root(temp.path());

        let result = store.write_document("../escape.md", "x", None).await;

        assert!(matches!(result, Err(PuffError::InvalidName(_))));
    }
}
