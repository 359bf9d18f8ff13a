//! # Editor Session
//!
//! The [`Editor`] is plain state. This module gives it a home: a single tokio
//! task that owns the editor, receives [`Command`]s over a channel, and wires
//! up the three things that happen on their own:
//!
//! - the autosave deadline (`sleep_until` on [`Editor::next_deadline`]),
//! - a save running on its own task,
//! - a beautify request running on its own task.
//!
//! Saves and beautify requests are spawned, so typing stays responsive while
//! the network is slow. Their results come back through the same `select!`
//! and are applied by the editor, which drops the ones that no longer match.
//!
//! Notices produced by the editor are forwarded on an unbounded channel.
//! Front ends read them whenever convenient.
//!
//! Shutting down flushes: a save in flight is awaited and a pending autosave
//! is run before the task ends.

use crate::autosave::{SaveJob, SaveReport};
use crate::editor::{BeautifyJob, BeautifyReport, Editor, EditorSnapshot};
use crate::error::{PuffError, Result};
use crate::notice::Notice;
use crate::store::BindOutcome;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

const COMMAND_BUFFER: usize = 64;

#[derive(Debug)]
pub enum Command {
    Edit(String),
    Append(String),
    Rename(String),
    NewNote,
    Open(String),
    Delete(String),
    SaveNow,
    Beautify,
    Regenerate,
    Accept,
    Reject,
    BindRoot,
    Refresh,
    SetUserKey(Option<String>),
    Snapshot(oneshot::Sender<EditorSnapshot>),
    Shutdown(oneshot::Sender<EditorSnapshot>),
}

/// Cheap, cloneable sender side of a running session.
#[derive(Debug, Clone)]
pub struct EditorHandle {
    tx: mpsc::Sender<Command>,
}

impl EditorHandle {
    pub async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| PuffError::SessionClosed)
    }

    pub async fn edit(&self, content: impl Into<String>) -> Result<()> {
        self.send(Command::Edit(content.into())).await
    }

    pub async fn append(&self, text: impl Into<String>) -> Result<()> {
        self.send(Command::Append(text.into())).await
    }

    pub async fn rename(&self, name: impl Into<String>) -> Result<()> {
        self.send(Command::Rename(name.into())).await
    }

    pub async fn snapshot(&self) -> Result<EditorSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        rx.await.map_err(|_| PuffError::SessionClosed)
    }

    /// Flush pending work and stop the session. Returns the final state.
    pub async fn shutdown(&self) -> Result<EditorSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown(reply)).await?;
        rx.await.map_err(|_| PuffError::SessionClosed)
    }
}

pub struct Session {
    pub handle: EditorHandle,
    pub notices: mpsc::UnboundedReceiver<Notice>,
    pub task: JoinHandle<()>,
}

/// Move the editor onto its own task.
pub fn spawn(editor: Editor) -> Session {
    let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
    let (notice_tx, notices) = mpsc::unbounded_channel();
    let actor = Actor {
        editor,
        commands,
        notices: notice_tx,
        save: None,
        beautify: None,
    };
    let task = tokio::spawn(actor.run());
    Session {
        handle: EditorHandle { tx },
        notices,
        task,
    }
}

struct Actor {
    editor: Editor,
    commands: mpsc::Receiver<Command>,
    notices: mpsc::UnboundedSender<Notice>,
    save: Option<JoinHandle<SaveReport>>,
    beautify: Option<JoinHandle<BeautifyReport>>,
}

impl Actor {
    async fn run(mut self) {
        loop {
            let deadline = self.editor.next_deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.flush().await;
                        let _ = reply.send(self.editor.snapshot(Instant::now()));
                        break;
                    }
                    Some(command) => self.handle(command).await,
                    None => {
                        self.flush().await;
                        break;
                    }
                },
                _ = wait_until(deadline) => {
                    if let Some(job) = self.editor.tick(Instant::now()) {
                        self.spawn_save(job);
                    }
                }
                joined = join(&mut self.save) => {
                    self.save = None;
                    self.apply_save(joined);
                }
                joined = join(&mut self.beautify) => {
                    self.beautify = None;
                    match joined {
                        Ok(report) => self.editor.finish_beautify(report, Instant::now()),
                        Err(e) => warn!(error = %e, "Beautify task ended abnormally"),
                    }
                }
            }
            self.forward_notices();
        }
        self.forward_notices();
        debug!("Editor session stopped");
    }

    async fn handle(&mut self, command: Command) {
        let now = Instant::now();
        let result = match command {
            Command::Edit(content) => self.editor.edit(content, now),
            Command::Append(text) => self.editor.append(&text, now),
            Command::Rename(name) => {
                self.editor.rename(name, now);
                Ok(())
            }
            Command::NewNote => {
                self.editor.new_note();
                Ok(())
            }
            Command::Open(name) => self.editor.open_named(&name).await,
            Command::Delete(name) => match self.editor.delete_named(&name).await {
                Ok(true) => {
                    self.emit(Notice::Info(format!("Deleted {}", name)));
                    Ok(())
                }
                Ok(false) => Err(PuffError::NotFound(name)),
                Err(e) => Err(e),
            },
            Command::SaveNow => self.editor.request_save().await.map(|job| {
                if let Some(job) = job {
                    self.spawn_save(job);
                }
            }),
            Command::Beautify => self
                .editor
                .start_beautify()
                .map(|job| self.spawn_beautify(job)),
            Command::Regenerate => self
                .editor
                .regenerate_beautify()
                .map(|job| self.spawn_beautify(job)),
            Command::Accept => self.editor.accept_beautify(now),
            Command::Reject => self.editor.reject_beautify(now),
            Command::BindRoot => self.editor.bind_root().await.map(|outcome| {
                if outcome == BindOutcome::Cancelled {
                    debug!("Root binding cancelled");
                }
            }),
            Command::Refresh => self.editor.refresh_entries().await.map(|_| ()),
            Command::SetUserKey(key) => {
                self.editor.set_user_key(key);
                Ok(())
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.editor.snapshot(now));
                Ok(())
            }
            Command::Shutdown(_) => Ok(()),
        };
        if let Err(e) = result {
            debug!(error = %e, "Command failed");
            self.emit(Notice::from(e));
        }
    }

    fn spawn_save(&mut self, job: SaveJob) {
        self.save = Some(tokio::spawn(job.run()));
    }

    fn spawn_beautify(&mut self, job: BeautifyJob) {
        self.beautify = Some(tokio::spawn(job.run()));
    }

    fn apply_save(&mut self, joined: std::result::Result<SaveReport, JoinError>) {
        match joined {
            Ok(report) => self.editor.finish_save(report, Instant::now()),
            Err(e) => {
                warn!(error = %e, "Save task ended abnormally");
                self.editor.save_aborted(&e.to_string());
            }
        }
    }

    /// Finish the save in flight, then run whatever autosave is pending.
    async fn flush(&mut self) {
        if let Some(task) = self.beautify.take() {
            task.abort();
        }
        loop {
            if let Some(task) = self.save.take() {
                let joined = task.await;
                self.apply_save(joined);
                continue;
            }
            match self.editor.take_pending_save(Instant::now()) {
                Some(job) => self.spawn_save(job),
                None => break,
            }
        }
    }

    fn emit(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }

    fn forward_notices(&mut self) {
        for notice in self.editor.drain_notices() {
            self.emit(notice);
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn join<T>(task: &mut Option<JoinHandle<T>>) -> std::result::Result<T, JoinError> {
    match task {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beautify::{ApiKeys, BeautifyPhase};
    use crate::document::SaveState;
    use crate::editor::EditorTimings;
    use crate::store::memory::MemStore;
    use crate::test_utils::ScriptedTransformer;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    const DEBOUNCE: Duration = Duration::from_millis(750);

    fn start(store: Arc<MemStore>, transformer: Arc<ScriptedTransformer>) -> Session {
        spawn(Editor::new(
            store,
            transformer,
            ApiKeys::new(None, Some("gsk_default".into())),
            EditorTimings::uniform(DEBOUNCE),
        ))
    }

    fn drain(notices: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(notice) = notices.try_recv() {
            out.push(notice);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn quick_edits_coalesce_into_one_write() {
        let store = Arc::new(MemStore::local_like());
        let mut session = start(store.clone(), Arc::new(ScriptedTransformer::new()));

        session.handle.edit("a").await.unwrap();
        sleep(Duration::from_millis(100)).await;
        session.handle.edit("ab").await.unwrap();
        sleep(Duration::from_millis(100)).await;
        session.handle.edit("abc").await.unwrap();
        sleep(Duration::from_secs(2)).await;

        let writes = store.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].content, "abc");
        assert_eq!(
            drain(&mut session.notices),
            vec![Notice::Saved("untitled.md".into())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_write_is_ever_in_flight() {
        let store = Arc::new(MemStore::local_like().with_write_latency(Duration::from_secs(2)));
        let session = start(store.clone(), Arc::new(ScriptedTransformer::new()));

        session.handle.edit("first").await.unwrap();
        sleep(Duration::from_millis(1000)).await;
        session.handle.edit("second").await.unwrap();
        sleep(Duration::from_secs(10)).await;

        let writes = store.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1].content, "second");
        assert_eq!(store.max_writes_in_flight(), 1);
        let snapshot = session.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, SaveState::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_autosave() {
        let store = Arc::new(MemStore::local_like());
        let session = start(store.clone(), Arc::new(ScriptedTransformer::new()));

        session.handle.edit("draft").await.unwrap();
        let last = session.handle.shutdown().await.unwrap();

        assert_eq!(last.state, SaveState::Saved);
        assert_eq!(store.content_named("untitled.md").unwrap(), "draft");
        session.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn new_note_during_slow_save_ignores_its_result() {
        let store = Arc::new(MemStore::local_like().with_write_latency(Duration::from_secs(2)));
        let session = start(store.clone(), Arc::new(ScriptedTransformer::new()));

        session.handle.edit("old").await.unwrap();
        sleep(Duration::from_millis(800)).await;
        session.handle.send(Command::NewNote).await.unwrap();
        sleep(Duration::from_secs(3)).await;

        let snapshot = session.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, SaveState::New);
        assert!(snapshot.backing.is_none());
        assert_eq!(snapshot.content, "");
        assert_eq!(store.content_named("untitled.md").unwrap(), "old");
    }

    #[tokio::test(start_paused = true)]
    async fn beautify_preview_locks_note_until_accepted() {
        let store = Arc::new(MemStore::local_like());
        let transformer = Arc::new(
            ScriptedTransformer::new()
                .reply("# Polished")
                .with_latency(Duration::from_secs(1)),
        );
        let mut session = start(store.clone(), transformer);

        session.handle.edit("rough").await.unwrap();
        session.handle.send(Command::Beautify).await.unwrap();
        session.handle.edit("typing anyway").await.unwrap();
        sleep(Duration::from_secs(2)).await;

        let snapshot = session.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.beautify, BeautifyPhase::PreviewReady);
        assert_eq!(snapshot.content, "rough");
        assert_eq!(snapshot.preview.as_deref(), Some("# Polished"));
        assert!(store.writes().is_empty());
        assert!(drain(&mut session.notices)
            .iter()
            .any(|n| matches!(n, Notice::Warning(_))));

        session.handle.send(Command::Accept).await.unwrap();
        sleep(Duration::from_secs(2)).await;

        assert_eq!(store.content_named("untitled.md").unwrap(), "# Polished");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_note_surfaces_as_notice() {
        let store = Arc::new(MemStore::local_like());
        let mut session = start(store, Arc::new(ScriptedTransformer::new()));

        session.handle.send(Command::Open("nope".into())).await.unwrap();
        session.handle.snapshot().await.unwrap();

        assert_eq!(
            drain(&mut session.notices),
            vec![Notice::NotFound("nope".into())]
        );
    }
}
