//! Core traits for notekeep abstractions.
//!
//! The autosave core reaches storage, the session service, and UI feedback
//! only through these interfaces, so each can be swapped for an in-memory or
//! recording implementation in tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Repository for owner-scoped note CRUD.
///
/// Every lookup is scoped by owner: a note that exists but belongs to
/// someone else is reported exactly like a missing one.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a new note at the initial version.
    async fn insert(&self, req: CreateNoteRequest) -> Result<NoteRevision>;

    /// Fetch a note with its tags, if it exists and belongs to `owner_id`.
    async fn fetch_owned(&self, id: Uuid, owner_id: &str) -> Result<Option<Note>>;

    /// Overwrite title/content and bump the version.
    ///
    /// Fails with `NoteNotFound` when missing or not owned, and with
    /// `Conflict` when `expected_version` is set and stale.
    async fn update_owned(&self, req: UpdateNoteRequest) -> Result<NoteRevision>;

    /// Delete a note and its tag associations.
    async fn delete_owned(&self, id: Uuid, owner_id: &str) -> Result<()>;

    /// List an owner's notes, most recently updated first.
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Note>>;

    /// Notes whose title or content contains every term (case-insensitive).
    async fn search(&self, owner_id: &str, terms: &[String]) -> Result<Vec<Note>>;
}

// =============================================================================
// TAG REPOSITORY TRAITS
// =============================================================================

/// Repository for tags and note-tag associations.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Find a tag by normalized name.
    async fn find_by_name(&self, owner_id: &str, name: &str) -> Result<Option<Tag>>;

    /// Insert a tag. Fails with `AlreadyExists` on a per-owner name collision.
    async fn insert(&self, owner_id: &str, name: &str) -> Result<Tag>;

    /// Find every existing tag among `names`.
    async fn find_many(&self, owner_id: &str, names: &[String]) -> Result<Vec<Tag>>;

    /// All tags of an owner with their note counts, by name.
    async fn list_with_counts(&self, owner_id: &str) -> Result<Vec<TagSummary>>;

    /// Tags currently associated with a note.
    async fn tags_for_note(&self, note_id: Uuid) -> Result<Vec<Tag>>;

    /// Add and remove associations for a note as one atomic step.
    ///
    /// Adding an existing association or removing a missing one is a no-op.
    async fn apply_associations(&self, note_id: Uuid, add: &[Uuid], remove: &[Uuid])
        -> Result<()>;
}

// =============================================================================
// EXTERNAL COLLABORATORS
// =============================================================================

/// Session/identity service. Only used to learn the current owner.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_user(&self) -> Result<Option<User>>;
}

/// Fire-and-forget UI feedback channel.
pub trait Notifier: Send + Sync {
    fn notify_pending(&self);
    fn notify_success(&self);
    fn notify_failure(&self, message: &str);
}
