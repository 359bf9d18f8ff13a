//! # Editor
//!
//! [`Editor`] owns everything about the open note: the [`Document`], the
//! [`BeautifySession`], the autosave [`Debouncer`] and the cached note list.
//! It does not run timers or spawn tasks. Methods that depend on time take
//! `now`, and slow work comes back as a job ([`SaveJob`], [`BeautifyJob`])
//! that the caller runs and reports back through `finish_save` /
//! `finish_beautify`. The actor in [`crate::session`] does exactly that.
//!
//! ## Autosave Rules
//!
//! - Content edits and renames re-arm the debouncer, except renames while the
//!   beautify session is active.
//! - A deadline that passes produces a save only if the note has a name, the
//!   store is bound, the note is dirty and no beautify session is active.
//! - One save at a time. A deadline passing during a save is remembered and
//!   retried as soon as the save reports back.
//! - Results for a note that was replaced in the meantime are dropped.
//!
//! ## Errors
//!
//! Direct calls return `Result` and the caller decides what to show. Failures
//! of background work (a save, a beautify request) are queued as [`Notice`]s
//! and collected with [`Editor::drain_notices`].

use crate::autosave::{Debouncer, SaveJob, SaveReport, LOCAL_DEBOUNCE, REMOTE_DEBOUNCE, SAVED_INDICATOR};
use crate::beautify::{
    ApiKeys, BeautifyPhase, BeautifyRequest, BeautifySession, KeyPrompt, KeySource,
    TransformError, Transformer,
};
use crate::document::{Document, SaveState};
use crate::error::{PuffError, Result};
use crate::model::{BackingId, DocumentEntry};
use crate::notice::Notice;
use crate::store::{BindOutcome, NamingPolicy, NoteStore, StoreKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorTimings {
    pub local_debounce: Duration,
    pub remote_debounce: Duration,
    pub saved_indicator: Duration,
}

impl Default for EditorTimings {
    fn default() -> Self {
        Self {
            local_debounce: LOCAL_DEBOUNCE,
            remote_debounce: REMOTE_DEBOUNCE,
            saved_indicator: SAVED_INDICATOR,
        }
    }
}

impl EditorTimings {
    /// Same debounce for every store.
    pub fn uniform(debounce: Duration) -> Self {
        Self {
            local_debounce: debounce,
            remote_debounce: debounce,
            ..Self::default()
        }
    }

    pub fn debounce_for(&self, naming: NamingPolicy) -> Duration {
        match naming {
            NamingPolicy::NameIsId => self.local_debounce,
            NamingPolicy::StoreAssigned => self.remote_debounce,
        }
    }
}

/// What the save indicator shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveIndicator {
    Saving,
    /// Shown briefly after a successful save.
    Saved,
    Unsaved,
    Conflict,
    Steady,
}

impl SaveIndicator {
    pub fn label(&self) -> &'static str {
        match self {
            SaveIndicator::Saving => "Saving…",
            SaveIndicator::Saved => "Saved",
            SaveIndicator::Unsaved => "Unsaved",
            SaveIndicator::Conflict => "Conflict",
            SaveIndicator::Steady => "",
        }
    }
}

/// Read-only view of the editor for front ends.
#[derive(Debug, Clone, Serialize)]
pub struct EditorSnapshot {
    pub display_name: String,
    pub content: String,
    pub state: SaveState,
    pub indicator: SaveIndicator,
    pub backing: Option<BackingId>,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub beautify: BeautifyPhase,
    pub preview: Option<String>,
    pub entries: Vec<DocumentEntry>,
    pub store: &'static str,
    pub bound: bool,
}

/// One transform request, detached from the editor.
pub struct BeautifyJob {
    transformer: Arc<dyn Transformer>,
    request: BeautifyRequest,
    api_key: String,
    source: KeySource,
    epoch: u64,
}

impl BeautifyJob {
    pub fn text(&self) -> &str {
        &self.request.text
    }

    pub async fn run(self) -> BeautifyReport {
        let result = self
            .transformer
            .beautify(&self.request.text, &self.api_key)
            .await;
        BeautifyReport {
            token: self.request.token,
            epoch: self.epoch,
            source: self.source,
            result,
        }
    }
}

#[derive(Debug)]
pub struct BeautifyReport {
    pub token: u64,
    pub epoch: u64,
    pub source: KeySource,
    pub result: std::result::Result<String, TransformError>,
}

pub struct Editor {
    store: Arc<dyn NoteStore>,
    transformer: Arc<dyn Transformer>,
    keys: ApiKeys,
    document: Document,
    beautify: BeautifySession,
    debouncer: Debouncer,
    timings: EditorTimings,
    entries: Vec<DocumentEntry>,
    save_in_flight: bool,
    save_deferred: bool,
    saved_flash_until: Option<Instant>,
    notices: Vec<Notice>,
}

impl Editor {
    pub fn new(
        store: Arc<dyn NoteStore>,
        transformer: Arc<dyn Transformer>,
        keys: ApiKeys,
        timings: EditorTimings,
    ) -> Self {
        let debouncer = Debouncer::new(timings.debounce_for(store.naming()));
        Self {
            store,
            transformer,
            keys,
            document: Document::new(),
            beautify: BeautifySession::new(),
            debouncer,
            timings,
            entries: Vec::new(),
            save_in_flight: false,
            save_deferred: false,
            saved_flash_until: None,
            notices: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn beautify(&self) -> &BeautifySession {
        &self.beautify
    }

    pub fn entries(&self) -> &[DocumentEntry] {
        &self.entries
    }

    pub fn store(&self) -> &Arc<dyn NoteStore> {
        &self.store
    }

    pub fn keys(&self) -> &ApiKeys {
        &self.keys
    }

    pub fn set_user_key(&mut self, key: Option<String>) {
        self.keys.set_user(key);
    }

    pub fn is_saving(&self) -> bool {
        self.save_in_flight
    }

    pub fn autosave_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn indicator(&self, now: Instant) -> SaveIndicator {
        if self.save_in_flight {
            return SaveIndicator::Saving;
        }
        match self.document.state() {
            SaveState::Conflict => SaveIndicator::Conflict,
            SaveState::Unsaved => SaveIndicator::Unsaved,
            _ if self.saved_flash_until.is_some_and(|until| now < until) => SaveIndicator::Saved,
            _ => SaveIndicator::Steady,
        }
    }

    pub fn snapshot(&self, now: Instant) -> EditorSnapshot {
        EditorSnapshot {
            display_name: self.document.display_name().to_string(),
            content: self.document.content().to_string(),
            state: self.document.state(),
            indicator: self.indicator(now),
            backing: self.document.backing().cloned(),
            last_saved_at: self.document.last_saved_at(),
            beautify: self.beautify.phase(),
            preview: self.beautify.preview().map(str::to_string),
            entries: self.entries.clone(),
            store: self.store.kind().label(),
            bound: self.store.is_bound(),
        }
    }

    /// Earliest moment `tick` has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.debouncer.deadline(), self.saved_flash_until) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Expire the saved flash and fire the autosave deadline if due.
    pub fn tick(&mut self, now: Instant) -> Option<SaveJob> {
        if self.saved_flash_until.is_some_and(|until| until <= now) {
            self.saved_flash_until = None;
        }
        self.poll_autosave(now)
    }

    // --- editing ---

    pub fn edit(&mut self, content: impl Into<String>, now: Instant) -> Result<()> {
        if self.beautify.is_active() {
            return Err(PuffError::PreviewLocked);
        }
        self.document.edit(content);
        self.debouncer.schedule(now);
        Ok(())
    }

    pub fn append(&mut self, text: &str, now: Instant) -> Result<()> {
        let mut content = self.document.content().to_string();
        content.push_str(text);
        self.edit(content, now)
    }

    pub fn rename(&mut self, name: impl Into<String>, now: Instant) {
        self.document.rename(name);
        if !self.beautify.is_active() {
            self.debouncer.schedule(now);
        }
    }

    /// Start over with a fresh note. A save still running keeps going, but
    /// its result no longer touches the editor.
    pub fn new_note(&mut self) {
        self.beautify.discard();
        self.debouncer.cancel();
        self.save_deferred = false;
        self.saved_flash_until = None;
        self.document.reset();
        debug!("Started a new note");
    }

    // --- saving ---

    fn poll_autosave(&mut self, now: Instant) -> Option<SaveJob> {
        if !self.debouncer.fire(now) {
            return None;
        }
        if self.document.has_blank_name() {
            debug!("Autosave skipped: note has no name");
            return None;
        }
        if !self.store.is_bound() {
            debug!("Autosave skipped: no notes folder bound");
            return None;
        }
        if !self.document.needs_save() {
            return None;
        }
        if self.beautify.is_active() {
            debug!("Autosave skipped: beautify session active");
            return None;
        }
        if self.save_in_flight {
            debug!("Autosave deferred: save in flight");
            self.save_deferred = true;
            return None;
        }
        Some(self.start_save())
    }

    /// Fire a pending autosave now, e.g. before shutting down.
    pub fn take_pending_save(&mut self, now: Instant) -> Option<SaveJob> {
        if self.debouncer.is_pending() {
            self.debouncer.schedule_now(now);
        }
        self.poll_autosave(now)
    }

    /// Save right away, binding the root first when needed. Returns `None`
    /// when the user cancels the binding or there is nothing to do yet.
    pub async fn request_save(&mut self) -> Result<Option<SaveJob>> {
        if !self.ensure_bound().await? {
            return Ok(None);
        }
        Ok(self.begin_manual_save())
    }

    /// Manual save against an already bound store.
    pub fn begin_manual_save(&mut self) -> Option<SaveJob> {
        if self.document.has_blank_name() {
            self.notices.push(Notice::NameRequired);
            return None;
        }
        self.debouncer.cancel();
        if self.save_in_flight {
            self.save_deferred = true;
            return None;
        }
        Some(self.start_save())
    }

    fn start_save(&mut self) -> SaveJob {
        self.save_in_flight = true;
        let ticket = self.document.begin_save();
        debug!(name = %ticket.display_name, revision = ticket.revision, "Saving note");
        SaveJob::new(self.store.clone(), ticket)
    }

    pub fn finish_save(&mut self, report: SaveReport, now: Instant) {
        self.save_in_flight = false;
        let naming = self.store.naming();
        let SaveReport {
            ticket,
            outcome,
            entries,
            warnings,
        } = report;

        if let Some(entries) = entries {
            self.entries = entries;
        }
        self.notices.extend(warnings.into_iter().map(Notice::Warning));

        match outcome {
            Ok(saved) => {
                let name = saved.name.clone();
                if self
                    .document
                    .complete_save(&ticket, saved, naming == NamingPolicy::NameIsId)
                {
                    info!(name = %name, "Note saved");
                    self.saved_flash_until = Some(now + self.timings.saved_indicator);
                    self.notices.push(Notice::Saved(name));
                } else {
                    debug!(name = %name, "Dropping save result for a replaced note");
                }
            }
            Err(e) => {
                error!(name = %ticket.storage_name(), error = %e, "Failed to save note");
                if self
                    .document
                    .fail_save(&ticket, naming == NamingPolicy::StoreAssigned)
                {
                    self.notices.push(Notice::PersistFailed {
                        name: ticket.storage_name(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if std::mem::take(&mut self.save_deferred) && self.document.needs_save() {
            self.debouncer.schedule_now(now);
        }
    }

    /// The save task died before reporting (panic or abort).
    pub fn save_aborted(&mut self, message: &str) {
        self.save_in_flight = false;
        self.save_deferred = false;
        self.document.interrupt_save();
        self.notices.push(Notice::PersistFailed {
            name: self.document.storage_name(),
            message: message.to_string(),
        });
    }

    // --- beautify ---

    fn resolve_key(&self) -> Result<(String, KeySource)> {
        self.keys
            .resolve()
            .map(|(key, source)| (key.to_string(), source))
            .ok_or(PuffError::MissingCredential)
    }

    pub fn start_beautify(&mut self) -> Result<BeautifyJob> {
        let (api_key, source) = self.resolve_key()?;
        let request = self.beautify.start(self.document.content())?;
        Ok(self.beautify_job(request, api_key, source))
    }

    pub fn regenerate_beautify(&mut self) -> Result<BeautifyJob> {
        let (api_key, source) = self.resolve_key()?;
        let request = self.beautify.regenerate()?;
        Ok(self.beautify_job(request, api_key, source))
    }

    fn beautify_job(&self, request: BeautifyRequest, api_key: String, source: KeySource) -> BeautifyJob {
        debug!(token = request.token, "Starting beautify request");
        BeautifyJob {
            transformer: self.transformer.clone(),
            request,
            api_key,
            source,
            epoch: self.document.epoch(),
        }
    }

    pub fn finish_beautify(&mut self, report: BeautifyReport, now: Instant) {
        if report.epoch != self.document.epoch() {
            debug!("Dropping beautify result for a replaced note");
            return;
        }
        match self.beautify.resolve(report.token, report.result) {
            None => debug!(token = report.token, "Dropping stale beautify result"),
            Some(Ok(())) => info!("Beautify preview ready"),
            Some(Err(e)) => {
                error!(status = ?e.status, error = %e, "Beautify request failed");
                let notice = match KeyPrompt::for_failure(&e, report.source) {
                    Some(prompt) => Notice::PromptForKey(prompt),
                    None => Notice::TransformFailed(e.message),
                };
                self.notices.push(notice);
                self.rearm_if_dirty(now);
            }
        }
    }

    pub fn accept_beautify(&mut self, now: Instant) -> Result<()> {
        let text = self.beautify.accept()?;
        self.document.replace_from_beautify(text);
        self.debouncer.schedule(now);
        Ok(())
    }

    pub fn reject_beautify(&mut self, now: Instant) -> Result<()> {
        self.beautify.reject()?;
        self.rearm_if_dirty(now);
        Ok(())
    }

    fn rearm_if_dirty(&mut self, now: Instant) {
        if self.document.needs_save() {
            self.debouncer.schedule(now);
        }
    }

    // --- store interaction ---

    /// Ask for a root. On a remote store the first listed note is opened
    /// when the editor holds nothing yet.
    pub async fn bind_root(&mut self) -> Result<BindOutcome> {
        let outcome = self.store.bind_root().await?;
        if outcome == BindOutcome::Cancelled {
            return Ok(outcome);
        }
        let entries = self.refresh_entries().await?;
        let pristine =
            self.document.state() == SaveState::New && self.document.content().is_empty();
        if self.store.naming() == NamingPolicy::StoreAssigned && pristine {
            if let Some(first) = entries.first() {
                self.open_entry(first).await?;
            }
        }
        Ok(outcome)
    }

    /// Bind when nothing is bound yet. `Ok(false)` means the user cancelled.
    async fn ensure_bound(&mut self) -> Result<bool> {
        if self.store.is_bound() {
            return Ok(true);
        }
        Ok(self.store.bind_root().await? == BindOutcome::Bound)
    }

    pub async fn refresh_entries(&mut self) -> Result<Vec<DocumentEntry>> {
        self.entries = self.store.list_documents().await?;
        Ok(self.entries.clone())
    }

    pub async fn open_entry(&mut self, entry: &DocumentEntry) -> Result<()> {
        let content = match self.store.read_document(&entry.id).await {
            Ok(content) => content,
            Err(e) if e.is_not_found() => return Err(PuffError::NotFound(entry.name.clone())),
            Err(e) => return Err(e),
        };
        self.beautify.discard();
        self.debouncer.cancel();
        self.save_deferred = false;
        self.saved_flash_until = None;
        self.document
            .open_existing(entry.id.clone(), &entry.name, content);
        info!(name = %entry.name, "Opened note");
        Ok(())
    }

    /// Open by display or storage name.
    pub async fn open_named(&mut self, name: &str) -> Result<()> {
        if !self.ensure_bound().await? {
            return Ok(());
        }
        let entry = self.find_entry(name).await?;
        self.open_entry(&entry).await
    }

    /// Delete by name. Deleting the open note starts a new one.
    pub async fn delete_named(&mut self, name: &str) -> Result<bool> {
        if !self.ensure_bound().await? {
            return Ok(false);
        }
        let entry = self.find_entry(name).await?;
        let removed = self.store.delete_document(&entry.id).await?;
        if self.document.backing() == Some(&entry.id) {
            self.new_note();
        }
        info!(name = %entry.name, removed, "Deleted note");
        self.refresh_entries().await?;
        Ok(removed)
    }

    async fn find_entry(&mut self, name: &str) -> Result<DocumentEntry> {
        self.refresh_entries()
            .await?
            .into_iter()
            .find(|e| e.matches(name))
            .ok_or_else(|| PuffError::NotFound(name.to_string()))
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }
}
