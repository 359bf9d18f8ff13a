use super::{BindOutcome, NamingPolicy, NoteStore, StoreKind};
use crate::error::{PuffError, Result};
use crate::model::{is_valid_storage_name, BackingId, DocumentEntry};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;

/// A write as seen by the store, recorded for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub name: String,
    pub content: String,
    pub id: Option<BackingId>,
}

#[derive(Default)]
struct MemState {
    // id -> (storage name, content)
    docs: BTreeMap<BackingId, (String, String)>,
    bound: bool,
    next_id: u64,
    writes: Vec<WriteRecord>,
    writes_in_flight: usize,
    max_writes_in_flight: usize,
    simulate_write_error: bool,
    simulate_delete_error: bool,
    cancel_bind: bool,
}

/// In-memory store for testing.
///
/// Behaves like the local store (`NamingPolicy::NameIsId`) or like the drive
/// store (`NamingPolicy::StoreAssigned`). Write latency uses `tokio::time`, so
/// tests with a paused clock control exactly when a save resolves.
pub struct MemStore {
    naming: NamingPolicy,
    write_latency: Option<Duration>,
    state: Mutex<MemState>,
}

impl MemStore {
    /// A bound store whose identifiers are file names.
    pub fn local_like() -> Self {
        Self::with_naming(NamingPolicy::NameIsId)
    }

    /// A bound store that assigns identifiers itself.
    pub fn remote_like() -> Self {
        Self::with_naming(NamingPolicy::StoreAssigned)
    }

    fn with_naming(naming: NamingPolicy) -> Self {
        Self {
            naming,
            write_latency: None,
            state: Mutex::new(MemState {
                bound: true,
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = Some(latency);
        self
    }

    /// Start without a bound root.
    pub fn unbound(self) -> Self {
        self.state.lock().bound = false;
        self
    }

    /// Seed an entry directly, bypassing write recording.
    pub fn insert(&self, name: &str, content: &str) -> BackingId {
        let mut state = self.state.lock();
        let id = self.assign_id(&mut state, name);
        state
            .docs
            .insert(id.clone(), (name.to_string(), content.to_string()));
        id
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.state.lock().simulate_write_error = simulate;
    }

    pub fn set_simulate_delete_error(&self, simulate: bool) {
        self.state.lock().simulate_delete_error = simulate;
    }

    /// Make the next `bind_root` calls report a cancelled prompt.
    pub fn set_cancel_bind(&self, cancel: bool) {
        self.state.lock().cancel_bind = cancel;
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.lock().writes.clone()
    }

    /// Highest number of writes that were ever running at the same time.
    pub fn max_writes_in_flight(&self) -> usize {
        self.state.lock().max_writes_in_flight
    }

    pub fn names(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state.docs.values().map(|(n, _)| n.clone()).collect();
        names.sort();
        names
    }

    pub fn content_named(&self, name: &str) -> Option<String> {
        let state = self.state.lock();
        state
            .docs
            .values()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.clone())
    }

    fn assign_id(&self, state: &mut MemState, name: &str) -> BackingId {
        match self.naming {
            NamingPolicy::NameIsId => BackingId::new(name),
            NamingPolicy::StoreAssigned => {
                let id = BackingId::new(format!("mem-{}", state.next_id));
                state.next_id += 1;
                id
            }
        }
    }

    fn ensure_bound(&self) -> Result<()> {
        if self.state.lock().bound {
            Ok(())
        } else {
            Err(PuffError::StorageUnavailable)
        }
    }
}

#[async_trait]
impl NoteStore for MemStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn naming(&self) -> NamingPolicy {
        self.naming
    }

    fn is_bound(&self) -> bool {
        self.state.lock().bound
    }

    async fn bind_root(&self) -> Result<BindOutcome> {
        let mut state = self.state.lock();
        if state.cancel_bind {
            return Ok(BindOutcome::Cancelled);
        }
        state.bound = true;
        Ok(BindOutcome::Bound)
    }

    async fn list_documents(&self) -> Result<Vec<DocumentEntry>> {
        self.ensure_bound()?;
        let state = self.state.lock();
        Ok(state
            .docs
            .iter()
            .map(|(id, (name, _))| DocumentEntry::new(name.clone(), id.clone()))
            .collect())
    }

    async fn read_document(&self, id: &BackingId) -> Result<String> {
        self.ensure_bound()?;
        let state = self.state.lock();
        state
            .docs
            .get(id)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| PuffError::NotFound(id.to_string()))
    }

    async fn write_document(
        &self,
        name: &str,
        content: &str,
        id: Option<&BackingId>,
    ) -> Result<BackingId> {
        self.ensure_bound()?;
        if !is_valid_storage_name(name) {
            return Err(PuffError::InvalidName(name.to_string()));
        }
        {
            let mut state = self.state.lock();
            state.writes.push(WriteRecord {
                name: name.to_string(),
                content: content.to_string(),
                id: id.cloned(),
            });
            state.writes_in_flight += 1;
            state.max_writes_in_flight = state.max_writes_in_flight.max(state.writes_in_flight);
        }

        if let Some(latency) = self.write_latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        state.writes_in_flight -= 1;
        if state.simulate_write_error {
            return Err(PuffError::Persist("Simulated write error".to_string()));
        }
        let id = match id {
            Some(existing) => {
                if self.naming == NamingPolicy::StoreAssigned && !state.docs.contains_key(existing)
                {
                    return Err(PuffError::NotFound(existing.to_string()));
                }
                existing.clone()
            }
            None => self.assign_id(&mut state, name),
        };
        state
            .docs
            .insert(id.clone(), (name.to_string(), content.to_string()));
        Ok(id)
    }

    async fn delete_document(&self, id: &BackingId) -> Result<bool> {
        self.ensure_bound()?;
        let mut state = self.state.lock();
        if state.simulate_delete_error {
            return Err(PuffError::Persist("Simulated delete error".to_string()));
        }
        Ok(state.docs.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_returns_same_content() {
        let store = MemStore::local_like();

        let id = store.write_document("a.md", "hello", None).await.unwrap();

        assert_eq!(id.as_str(), "a.md");
        assert_eq!(store.read_document(&id).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn remote_like_assigns_fresh_ids_for_duplicate_names() {
        let store = MemStore::remote_like();

        let first = store.write_document("a.md", "1", None).await.unwrap();
        let second = store.write_document("a.md", "2", None).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.list_documents().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_write_leaves_previous_content() {
        let store = MemStore::local_like();
        let id = store.write_document("a.md", "old", None).await.unwrap();

        store.set_simulate_write_error(true);
        assert!(store.write_document("a.md", "new", Some(&id)).await.is_err());

        assert_eq!(store.read_document(&id).await.unwrap(), "old");
    }

    #[tokio::test]
    async fn delete_missing_returns_false() {
        let store = MemStore::local_like();

        assert!(!store
            .delete_document(&BackingId::new("nope.md"))
            .await
            .unwrap());
    }
}
