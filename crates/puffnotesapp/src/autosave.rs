//! # Autosave
//!
//! Every qualifying edit re-arms a single [`Debouncer`]; only the last one
//! fires. When it fires, the editor takes a [`SaveTicket`] and hands a
//! [`SaveJob`] to whoever runs I/O. The job decides how to persist:
//!
//! | Document | Store naming | Plan |
//! |----------|--------------|------|
//! | never saved | any | [`SavePlan::Create`] (local stores probe a free name) |
//! | saved, same name | any | [`SavePlan::Update`] |
//! | saved, renamed | store assigned | [`SavePlan::Update`] with the new name |
//! | saved, renamed | name is id | [`SavePlan::Move`] |
//!
//! A move writes the new file first and deletes the old one afterwards. The
//! delete is best effort: if it fails the new file stays and a warning is
//! reported.
//!
//! At most one job runs at a time. The editor enforces this; the job itself
//! knows nothing about scheduling.

use crate::document::{SaveTicket, SavedAs};
use crate::error::Result;
use crate::model::{BackingId, DocumentEntry};
use crate::naming::{resolve_available_name, resolve_move_target};
use crate::store::{NamingPolicy, NoteStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const LOCAL_DEBOUNCE: Duration = Duration::from_millis(850);
pub const REMOTE_DEBOUNCE: Duration = Duration::from_millis(1500);
pub const SAVED_INDICATOR: Duration = Duration::from_millis(1500);

/// One cancellable deadline. Scheduling again replaces it.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Arm for immediate firing.
    pub fn schedule_now(&mut self, now: Instant) {
        self.deadline = Some(now);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the deadline if it has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavePlan {
    Create { name: String },
    Update { id: BackingId, name: String },
    Move { name: String, from: BackingId },
}

impl SavePlan {
    pub fn for_ticket(ticket: &SaveTicket, naming: NamingPolicy) -> Self {
        let name = ticket.storage_name();
        match (&ticket.backing, naming) {
            (None, _) => SavePlan::Create { name },
            (Some(id), NamingPolicy::StoreAssigned) => SavePlan::Update {
                id: id.clone(),
                name,
            },
            (Some(id), NamingPolicy::NameIsId) if id.as_str() == name => SavePlan::Update {
                id: id.clone(),
                name,
            },
            (Some(id), NamingPolicy::NameIsId) => SavePlan::Move {
                name,
                from: id.clone(),
            },
        }
    }
}

/// Outcome of one save, handed back to the editor.
#[derive(Debug)]
pub struct SaveReport {
    pub ticket: SaveTicket,
    pub outcome: Result<SavedAs>,
    /// Fresh listing after a successful write, when it could be fetched.
    pub entries: Option<Vec<DocumentEntry>>,
    pub warnings: Vec<String>,
}

/// A persist of one ticket, detached from the editor so it can run on its own task.
pub struct SaveJob {
    store: Arc<dyn NoteStore>,
    ticket: SaveTicket,
    plan: SavePlan,
}

impl SaveJob {
    pub fn new(store: Arc<dyn NoteStore>, ticket: SaveTicket) -> Self {
        let plan = SavePlan::for_ticket(&ticket, store.naming());
        Self {
            store,
            ticket,
            plan,
        }
    }

    pub fn plan(&self) -> &SavePlan {
        &self.plan
    }

    pub fn ticket(&self) -> &SaveTicket {
        &self.ticket
    }

    pub async fn run(self) -> SaveReport {
        let mut warnings = Vec::new();
        let outcome = self.persist(&mut warnings).await;
        let entries = match &outcome {
            Ok(_) => match self.store.list_documents().await {
                Ok(entries) => Some(entries),
                Err(e) => {
                    warn!(error = %e, "Could not refresh note list after save");
                    None
                }
            },
            Err(_) => None,
        };
        SaveReport {
            ticket: self.ticket,
            outcome,
            entries,
            warnings,
        }
    }

    async fn persist(&self, warnings: &mut Vec<String>) -> Result<SavedAs> {
        let store = self.store.as_ref();
        let content = self.ticket.content.as_str();
        match &self.plan {
            SavePlan::Create { name } => {
                let name = match store.naming() {
                    NamingPolicy::NameIsId => resolve_available_name(store, name).await?,
                    NamingPolicy::StoreAssigned => name.clone(),
                };
                let id = store.write_document(&name, content, None).await?;
                info!(name = %name, "Created note");
                Ok(SavedAs { id, name })
            }
            SavePlan::Update { id, name } => {
                let id = store.write_document(name, content, Some(id)).await?;
                debug!(name = %name, "Updated note");
                Ok(SavedAs {
                    id,
                    name: name.clone(),
                })
            }
            SavePlan::Move { name, from } => {
                let name = resolve_move_target(store, name, from).await?;
                if name == from.as_str() {
                    let id = store.write_document(&name, content, Some(from)).await?;
                    debug!(name = %name, "Rename resolved to the current file");
                    return Ok(SavedAs { id, name });
                }
                let id = store.write_document(&name, content, None).await?;
                if let Err(e) = store.delete_document(from).await {
                    warn!(old = %from, new = %name, error = %e, "Renamed note but could not remove the old file");
                    warnings.push(format!(
                        "Saved as {} but could not remove {}: {}",
                        name, from, e
                    ));
                }
                info!(old = %from, new = %name, "Moved note");
                Ok(SavedAs { id, name })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::store::memory::MemStore;

    fn ticket_for(doc: &mut Document) -> SaveTicket {
        doc.begin_save()
    }

    #[test]
    fn debouncer_keeps_only_latest_deadline() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(750));

        debouncer.schedule(start);
        debouncer.schedule(start + Duration::from_millis(100));
        debouncer.schedule(start + Duration::from_millis(200));

        assert!(!debouncer.fire(start + Duration::from_millis(900)));
        assert!(debouncer.fire(start + Duration::from_millis(950)));
        assert!(!debouncer.is_pending());
        assert!(!debouncer.fire(start + Duration::from_millis(2000)));
    }

    #[test]
    fn cancelled_debouncer_never_fires() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(LOCAL_DEBOUNCE);
        debouncer.schedule(start);
        debouncer.cancel();
        assert!(!debouncer.fire(start + Duration::from_secs(10)));
    }

    #[test]
    fn plans_follow_backing_and_naming() {
        let mut doc = Document::new();
        doc.edit("x");
        let ticket = ticket_for(&mut doc);
        assert_eq!(
            SavePlan::for_ticket(&ticket, NamingPolicy::NameIsId),
            SavePlan::Create {
                name: "untitled.md".into()
            }
        );

        doc.open_existing(BackingId::new("old.md"), "old.md", "x".into());
        doc.rename("new");
        let ticket = ticket_for(&mut doc);
        assert_eq!(
            SavePlan::for_ticket(&ticket, NamingPolicy::NameIsId),
            SavePlan::Move {
                name: "new.md".into(),
                from: BackingId::new("old.md")
            }
        );
        assert_eq!(
            SavePlan::for_ticket(&ticket, NamingPolicy::StoreAssigned),
            SavePlan::Update {
                id: BackingId::new("old.md"),
                name: "new.md".into()
            }
        );
    }

    #[tokio::test]
    async fn create_probes_for_free_name_on_local_stores() {
        let store = Arc::new(MemStore::local_like());
        store.insert("untitled.md", "existing");
        let mut doc = Document::new();
        doc.edit("fresh");

        let report = SaveJob::new(store.clone(), doc.begin_save()).run().await;

        let saved = report.outcome.unwrap();
        assert_eq!(saved.name, "untitled-1.md");
        assert_eq!(store.content_named("untitled.md").unwrap(), "existing");
        assert_eq!(report.entries.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_on_remote_store_allows_duplicate_names() {
        let store = Arc::new(MemStore::remote_like());
        store.insert("untitled.md", "existing");
        let mut doc = Document::new();
        doc.edit("fresh");

        let report = SaveJob::new(store.clone(), doc.begin_save()).run().await;

        assert_eq!(report.outcome.unwrap().name, "untitled.md");
        assert_eq!(store.names(), vec!["untitled.md", "untitled.md"]);
    }

    #[tokio::test]
    async fn move_writes_new_then_deletes_old() {
        let store = Arc::new(MemStore::local_like());
        let id = store.insert("draft.md", "body");
        let mut doc = Document::new();
        doc.open_existing(id, "draft.md", "body".into());
        doc.rename("final");

        let report = SaveJob::new(store.clone(), doc.begin_save()).run().await;

        assert_eq!(report.outcome.unwrap().name, "final.md");
        assert_eq!(store.names(), vec!["final.md"]);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn move_onto_a_taken_name_keeps_its_own_file() {
        let store = Arc::new(MemStore::local_like());
        store.insert("a.md", "other");
        let id = store.insert("a-1.md", "body");
        let mut doc = Document::new();
        doc.open_existing(id, "a-1.md", "body".into());
        doc.rename("a");
        doc.edit("body v2");

        let report = SaveJob::new(store.clone(), doc.begin_save()).run().await;

        assert_eq!(report.outcome.unwrap().name, "a-1.md");
        assert_eq!(store.names(), vec!["a-1.md", "a.md"]);
        assert_eq!(store.content_named("a-1.md").unwrap(), "body v2");
        assert_eq!(store.content_named("a.md").unwrap(), "other");
    }

    #[tokio::test]
    async fn failed_delete_after_move_keeps_new_file() {
        let store = Arc::new(MemStore::local_like());
        let id = store.insert("draft.md", "body");
        store.set_simulate_delete_error(true);
        let mut doc = Document::new();
        doc.open_existing(id, "draft.md", "body".into());
        doc.rename("final");

        let report = SaveJob::new(store.clone(), doc.begin_save()).run().await;

        assert!(report.outcome.is_ok());
        assert_eq!(store.names(), vec!["draft.md", "final.md"]);
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn failed_write_reports_error_without_listing() {
        let store = Arc::new(MemStore::local_like());
        store.set_simulate_write_error(true);
        let mut doc = Document::new();
        doc.edit("x");

        let report = SaveJob::new(store.clone(), doc.begin_save()).run().await;

        assert!(report.outcome.is_err());
        assert!(report.entries.is_none());
    }
}
