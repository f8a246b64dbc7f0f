//! Session-scoped note operations.
//!
//! Resolves the current user once per call and scopes every read and
//! delete to that owner. Also the factory for editors, so callers never
//! wire the gateway, session, and notifier by hand.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};
use uuid::Uuid;

use notekeep_core::{
    Error, Note, NoteRepository, Notifier, Result, SessionProvider, TagRepository, TagSummary,
    User,
};
use notekeep_db::{Database, MemoryStore};

use crate::config::AutosaveConfig;
use crate::editor::EditorController;
use crate::gateway::NoteGateway;
use crate::scheduler::AutosaveContext;

/// Note listing, lookup, deletion, search, and editor creation for the
/// signed-in user.
#[derive(Clone)]
pub struct NoteService {
    notes: Arc<dyn NoteRepository>,
    tags: Arc<dyn TagRepository>,
    session: Arc<dyn SessionProvider>,
    gateway: NoteGateway,
    config: AutosaveConfig,
}

impl NoteService {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        tags: Arc<dyn TagRepository>,
        session: Arc<dyn SessionProvider>,
        config: AutosaveConfig,
    ) -> Self {
        let gateway = NoteGateway::new(notes.clone(), tags.clone());
        Self {
            notes,
            tags,
            session,
            gateway,
            config,
        }
    }

    /// Service backed by PostgreSQL.
    pub fn from_database(
        db: &Database,
        session: Arc<dyn SessionProvider>,
        config: AutosaveConfig,
    ) -> Self {
        Self::new(
            Arc::new(db.notes.clone()),
            Arc::new(db.tags.clone()),
            session,
            config,
        )
    }

    /// Service backed by an in-memory store.
    pub fn in_memory(
        store: MemoryStore,
        session: Arc<dyn SessionProvider>,
        config: AutosaveConfig,
    ) -> Self {
        Self::new(Arc::new(store.clone()), Arc::new(store), session, config)
    }

    pub fn gateway(&self) -> &NoteGateway {
        &self.gateway
    }

    pub fn config(&self) -> &AutosaveConfig {
        &self.config
    }

    async fn require_user(&self) -> Result<User> {
        self.session
            .current_user()
            .await?
            .ok_or_else(|| Error::Unauthorized("Not authenticated".to_string()))
    }

    /// The user's notes, most recently updated first.
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        let user = self.require_user().await?;
        let notes = self.notes.list_for_owner(&user.id).await?;
        debug!(
            subsystem = "editor",
            component = "service",
            op = "list_notes",
            result_count = notes.len(),
            "Listed notes"
        );
        Ok(notes)
    }

    /// One note with its tags. Notes of other users are reported as missing.
    pub async fn get_note(&self, id: Uuid) -> Result<Note> {
        let user = self.require_user().await?;
        self.notes
            .fetch_owned(id, &user.id)
            .await?
            .ok_or(Error::NoteNotFound(id))
    }

    /// Delete a note and its tag associations. Tags themselves are kept.
    pub async fn delete_note(&self, id: Uuid) -> Result<()> {
        let user = self.require_user().await?;
        self.notes.delete_owned(id, &user.id).await?;
        info!(
            subsystem = "editor",
            component = "service",
            op = "delete_note",
            note_id = %id,
            "Note deleted"
        );
        Ok(())
    }

    /// Notes whose title or content contains every whitespace-separated
    /// term of `query`. A blank query lists everything.
    pub async fn search_notes(&self, query: &str) -> Result<Vec<Note>> {
        let user = self.require_user().await?;
        let terms: Vec<String> = query.split_whitespace().map(str::to_string).collect();
        if terms.is_empty() {
            return self.notes.list_for_owner(&user.id).await;
        }

        let start = Instant::now();
        let notes = self.notes.search(&user.id, &terms).await?;
        debug!(
            subsystem = "editor",
            component = "service",
            op = "search_notes",
            term_count = terms.len(),
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );
        Ok(notes)
    }

    /// The user's tags with note counts.
    pub async fn list_tags(&self) -> Result<Vec<TagSummary>> {
        let user = self.require_user().await?;
        self.tags.list_with_counts(&user.id).await
    }

    /// Open a blank editor for a new note.
    pub fn new_editor(&self, notifier: Arc<dyn Notifier>) -> EditorController {
        EditorController::new(self.context(notifier), &self.config)
    }

    /// Load a note and open an editor on it.
    pub async fn edit_note(
        &self,
        id: Uuid,
        notifier: Arc<dyn Notifier>,
    ) -> Result<EditorController> {
        let note = self.get_note(id).await?;
        Ok(EditorController::open(
            self.context(notifier),
            &self.config,
            &note,
        ))
    }

    fn context(&self, notifier: Arc<dyn Notifier>) -> AutosaveContext {
        AutosaveContext {
            gateway: self.gateway.clone(),
            session: self.session.clone(),
            notifier,
        }
    }
}
