//! Debounced autosave scheduler.
//!
//! Each open editor gets one scheduler task. Edits re-arm a debounce timer;
//! when it expires, or when a manual save is requested, the latest draft
//! snapshot is handed to the [`NoteGateway`]. At most one persistence call
//! per editor is in flight at a time: a flush that comes due while another
//! is running is deferred and starts as soon as the running one lands, so
//! the draft identity assigned by a first create is always visible to the
//! next flush.
//!
//! ```text
//!  notify_changed ──► re-arm timer ──(quiet period)──┐
//!  save_now ─────────────────────────────────────────┤
//!                                                    ▼
//!                       in flight? ── yes ──► defer until it lands
//!                           │ no
//!                           ▼
//!            snapshot draft ──► blank? ── yes ──► skip
//!                           │ no
//!                           ▼
//!              session ──► gateway.save ──► adopt identity, notify
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use notekeep_core::error::REQUIRED_FIELDS_MESSAGE;
use notekeep_core::{
    AutosaveEvent, AutosaveResult, Draft, Error, EventBus, FlushTrigger, Notifier, Result,
    SavedNote, SessionProvider,
};

use crate::config::AutosaveConfig;
use crate::gateway::{NoteGateway, SaveRequest};
use crate::identity::DraftIdentity;

/// Message returned to saves requested after the editor closed.
pub const EDITOR_CLOSED_MESSAGE: &str = "Editor is closed";

/// Editable fields of a draft. Identity is tracked separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftFields {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl DraftFields {
    pub fn is_incomplete(&self) -> bool {
        self.title.trim().is_empty() || self.content.trim().is_empty()
    }
}

impl From<Draft> for DraftFields {
    fn from(draft: Draft) -> Self {
        Self {
            title: draft.title,
            content: draft.content,
            tags: draft.tags,
        }
    }
}

/// Collaborators a flush talks to.
#[derive(Clone)]
pub struct AutosaveContext {
    pub gateway: NoteGateway,
    pub session: Arc<dyn SessionProvider>,
    pub notifier: Arc<dyn Notifier>,
}

enum Command {
    Changed,
    SaveNow(oneshot::Sender<AutosaveResult>),
    Overwrite(oneshot::Sender<AutosaveResult>),
    Close,
}

/// Handle to a running scheduler task.
///
/// Dropping the handle closes the scheduler the same way [`close`] does.
///
/// [`close`]: AutosaveScheduler::close
pub struct AutosaveScheduler {
    commands: mpsc::UnboundedSender<Command>,
    identity: Arc<DraftIdentity>,
    events: EventBus,
    task: JoinHandle<()>,
}

impl AutosaveScheduler {
    /// Spawn the scheduler task. Must be called within a tokio runtime.
    ///
    /// `version` is the stored version of an already-persisted draft, used
    /// for conflict detection on the first update.
    pub fn spawn(
        ctx: AutosaveContext,
        config: &AutosaveConfig,
        buffer: watch::Receiver<DraftFields>,
        identity: Arc<DraftIdentity>,
        version: Option<i64>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = EventBus::new(config.event_capacity);

        let worker = SchedulerLoop {
            ctx,
            commands: rx,
            buffer,
            identity: identity.clone(),
            events: events.clone(),
            debounce: config.debounce,
            conflict_detection: config.conflict_detection,
            version,
            deadline: None,
            due: None,
            waiters: Vec::new(),
            overwrite: false,
            flight: None,
            closing: false,
        };

        debug!(
            subsystem = "editor",
            component = "scheduler",
            debounce_ms = config.debounce.as_millis() as u64,
            note_id = ?identity.current(),
            "Autosave scheduler started"
        );

        let task = tokio::spawn(worker.run());

        Self {
            commands: tx,
            identity,
            events,
            task,
        }
    }

    /// Record that the draft changed. Re-arms the debounce timer.
    pub fn notify_changed(&self) {
        let _ = self.commands.send(Command::Changed);
    }

    /// Flush immediately (or right after the running flush) and wait for
    /// the result. Cancels the pending debounce timer.
    pub async fn save_now(&self) -> AutosaveResult {
        self.request(Command::SaveNow).await
    }

    /// Like [`save_now`], but the next flush writes without an expected
    /// version, so a stored version newer than ours is overwritten.
    ///
    /// [`save_now`]: AutosaveScheduler::save_now
    pub async fn overwrite(&self) -> AutosaveResult {
        self.request(Command::Overwrite).await
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<AutosaveResult>) -> Command,
    ) -> AutosaveResult {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(command(tx)).is_err() {
            return self.closed_result();
        }
        rx.await.unwrap_or_else(|_| self.closed_result())
    }

    /// Stop scheduling. A pending timer is cancelled; a flush already in
    /// flight finishes, but its outcome is not reported to the notifier.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Close and wait for the scheduler task to finish.
    pub async fn shutdown(self) {
        self.close();
        if let Err(e) = self.task.await {
            error!(
                subsystem = "editor",
                component = "scheduler",
                error = %e,
                "Autosave scheduler task failed"
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }

    /// Current draft identity.
    pub fn identity(&self) -> Option<Uuid> {
        self.identity.current()
    }

    pub fn identity_tracker(&self) -> &Arc<DraftIdentity> {
        &self.identity
    }

    /// Subscribe to autosave events emitted from now on.
    pub fn events(&self) -> broadcast::Receiver<AutosaveEvent> {
        self.events.subscribe()
    }

    fn closed_result(&self) -> AutosaveResult {
        failure(self.identity.current(), EDITOR_CLOSED_MESSAGE.to_string())
    }
}

struct Flight {
    future: BoxFuture<'static, Result<SavedNote>>,
    trigger: FlushTrigger,
    waiters: Vec<oneshot::Sender<AutosaveResult>>,
    started: Instant,
}

struct SchedulerLoop {
    ctx: AutosaveContext,
    commands: mpsc::UnboundedReceiver<Command>,
    buffer: watch::Receiver<DraftFields>,
    identity: Arc<DraftIdentity>,
    events: EventBus,
    debounce: Duration,
    conflict_detection: bool,
    /// Last version written or loaded.
    version: Option<i64>,
    deadline: Option<Instant>,
    /// Flush requested but not yet started.
    due: Option<FlushTrigger>,
    /// Manual saves waiting for the next flight.
    waiters: Vec<oneshot::Sender<AutosaveResult>>,
    /// Next started flush skips the version check.
    overwrite: bool,
    flight: Option<Flight>,
    closing: bool,
}

impl SchedulerLoop {
    async fn run(mut self) {
        loop {
            if self.flight.is_none() {
                if let Some(trigger) = self.due.take() {
                    self.start_flush(trigger);
                    continue;
                }
                if self.closing {
                    break;
                }
            }

            let accepting = !self.closing;
            let deadline = self.deadline;
            let in_flight = self.flight.is_some();

            tokio::select! {
                cmd = self.commands.recv(), if accepting => match cmd {
                    Some(Command::Changed) => self.on_changed(),
                    Some(Command::SaveNow(reply)) => self.on_save_now(reply),
                    Some(Command::Overwrite(reply)) => {
                        self.overwrite = true;
                        self.on_save_now(reply);
                    }
                    Some(Command::Close) | None => self.on_close(),
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.deadline = None;
                    self.request_flush(FlushTrigger::Timer);
                }
                result = land(&mut self.flight), if in_flight => {
                    self.on_landed(result);
                }
                else => break,
            }
        }

        self.events.emit(AutosaveEvent::Closed);
        debug!(
            subsystem = "editor",
            component = "scheduler",
            note_id = ?self.identity.current(),
            "Autosave scheduler stopped"
        );
    }

    fn on_changed(&mut self) {
        self.deadline = Some(Instant::now() + self.debounce);
        trace!(
            subsystem = "editor",
            component = "scheduler",
            "Debounce timer re-armed"
        );
    }

    fn on_save_now(&mut self, reply: oneshot::Sender<AutosaveResult>) {
        self.deadline = None;
        self.waiters.push(reply);
        self.request_flush(FlushTrigger::Manual);
    }

    fn on_close(&mut self) {
        self.closing = true;
        self.deadline = None;
        if self.due == Some(FlushTrigger::Timer) {
            self.due = None;
        }
        debug!(
            subsystem = "editor",
            component = "scheduler",
            in_flight = self.flight.is_some(),
            "Editor closed"
        );
    }

    fn request_flush(&mut self, trigger: FlushTrigger) {
        if let Some(flight) = &self.flight {
            debug!(
                subsystem = "editor",
                component = "scheduler",
                trigger = %trigger,
                running = %flight.trigger,
                "Flush deferred until the running flush lands"
            );
            self.events.emit(AutosaveEvent::FlushDeferred { trigger });
        }

        self.due = match (self.due, trigger) {
            (Some(FlushTrigger::Manual), _) | (_, FlushTrigger::Manual) => {
                Some(FlushTrigger::Manual)
            }
            _ => Some(FlushTrigger::Timer),
        };
    }

    fn start_flush(&mut self, trigger: FlushTrigger) {
        let fields = self.buffer.borrow().clone();
        let identity = self.identity.current();
        let waiters = std::mem::take(&mut self.waiters);
        let overwrite = std::mem::take(&mut self.overwrite);

        if fields.is_incomplete() {
            debug!(
                subsystem = "editor",
                component = "scheduler",
                trigger = %trigger,
                "Flush skipped: title or content is blank"
            );
            self.events.emit(AutosaveEvent::FlushSkipped { trigger });
            let result = match trigger {
                FlushTrigger::Timer => AutosaveResult::skipped(identity),
                FlushTrigger::Manual => failure(identity, REQUIRED_FIELDS_MESSAGE.to_string()),
            };
            respond(waiters, result);
            return;
        }

        let expected_version = match identity {
            Some(_) if self.conflict_detection && !overwrite => self.version,
            _ => None,
        };

        self.events.emit(AutosaveEvent::FlushStarted {
            trigger,
            note_id: identity,
        });
        if !self.closing {
            self.ctx.notifier.notify_pending();
        }

        let ctx = self.ctx.clone();
        self.flight = Some(Flight {
            future: persist(ctx, fields, identity, expected_version).boxed(),
            trigger,
            waiters,
            started: Instant::now(),
        });
    }

    fn on_landed(&mut self, result: Result<SavedNote>) {
        let Some(flight) = self.flight.take() else {
            return;
        };
        let duration_ms = flight.started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(saved) => {
                self.adopt(saved.id, saved.created);
                self.version = Some(saved.version);
                self.events.emit(AutosaveEvent::FlushCompleted {
                    note_id: saved.id,
                    version: saved.version,
                    created: saved.created,
                });
                info!(
                    subsystem = "editor",
                    component = "scheduler",
                    trigger = %flight.trigger,
                    note_id = %saved.id,
                    version = saved.version,
                    duration_ms,
                    "Autosave completed"
                );
                if !self.closing {
                    self.ctx.notifier.notify_success();
                }
                AutosaveResult::saved(saved.id)
            }
            Err(err) => {
                if let Error::PartialReconciliation {
                    note_id,
                    version,
                    created,
                    ..
                } = &err
                {
                    self.adopt(*note_id, *created);
                    self.version = Some(*version);
                }

                let message = failure_message(&err);
                let identity = self.identity.current();
                self.events.emit(AutosaveEvent::FlushFailed {
                    note_id: identity,
                    error: message.clone(),
                });
                warn!(
                    subsystem = "editor",
                    component = "scheduler",
                    trigger = %flight.trigger,
                    note_id = ?identity,
                    duration_ms,
                    transient = err.is_transient(),
                    error = %err,
                    "Autosave failed"
                );
                if !self.closing {
                    self.ctx.notifier.notify_failure(&message);
                }
                failure(identity, message)
            }
        };

        respond(flight.waiters, outcome);
    }

    fn adopt(&mut self, id: Uuid, created: bool) {
        if !created {
            return;
        }
        match self.identity.assign(id) {
            Ok(true) => {
                debug!(
                    subsystem = "editor",
                    component = "scheduler",
                    note_id = %id,
                    "Draft identity assigned"
                );
                self.events
                    .emit(AutosaveEvent::IdentityAssigned { note_id: id });
            }
            Ok(false) => {}
            Err(e) => error!(
                subsystem = "editor",
                component = "scheduler",
                note_id = %id,
                error = %e,
                "Created a second note for one draft"
            ),
        }
    }
}

/// Resolve the owner, then write the snapshot.
async fn persist(
    ctx: AutosaveContext,
    fields: DraftFields,
    identity: Option<Uuid>,
    expected_version: Option<i64>,
) -> Result<SavedNote> {
    let user = ctx
        .session
        .current_user()
        .await?
        .ok_or_else(|| Error::Unauthorized("Not authenticated".to_string()))?;

    ctx.gateway
        .save(SaveRequest {
            identity,
            owner_id: user.id,
            title: fields.title,
            content: fields.content,
            tags: fields.tags,
            expected_version,
        })
        .await
}

async fn land(flight: &mut Option<Flight>) -> Result<SavedNote> {
    match flight {
        Some(flight) => (&mut flight.future).await,
        None => std::future::pending().await,
    }
}

fn respond(waiters: Vec<oneshot::Sender<AutosaveResult>>, result: AutosaveResult) {
    for waiter in waiters {
        let _ = waiter.send(result.clone());
    }
}

fn failure(identity: Option<Uuid>, message: String) -> AutosaveResult {
    AutosaveResult {
        success: false,
        identity,
        error: Some(message),
    }
}

/// Text shown to the user for a failed flush.
fn failure_message(err: &Error) -> String {
    match err {
        Error::Validation(message) => message.clone(),
        Error::Unauthorized(_) => "Not authenticated".to_string(),
        Error::NoteNotFound(_) => "Note not found".to_string(),
        Error::Conflict { .. } => "Note was changed elsewhere. Reload to continue.".to_string(),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_fields_incomplete() {
        let mut fields = DraftFields::default();
        assert!(fields.is_incomplete());

        fields.title = "T".to_string();
        fields.content = " ".to_string();
        assert!(fields.is_incomplete());

        fields.content = "C".to_string();
        assert!(!fields.is_incomplete());
    }

    #[test]
    fn test_failure_message_mapping() {
        assert_eq!(
            failure_message(&Error::Validation(REQUIRED_FIELDS_MESSAGE.to_string())),
            REQUIRED_FIELDS_MESSAGE
        );
        assert_eq!(
            failure_message(&Error::Unauthorized("no session".to_string())),
            "Not authenticated"
        );
        assert_eq!(
            failure_message(&Error::NoteNotFound(Uuid::nil())),
            "Note not found"
        );
    }
}
