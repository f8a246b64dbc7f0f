//! In-memory storage backend.
//!
//! Implements [`NoteRepository`] and [`TagRepository`] with the same
//! ownership, uniqueness, and version semantics as the PostgreSQL
//! repositories. Used by tests and by embedders that do not need
//! durability.
//!
//! The store also carries fault injection and call accounting so tests can
//! exercise failure paths and concurrency limits deterministically:
//!
//! ```rust
//! use std::time::Duration;
//! use notekeep_db::memory::MemoryStore;
//!
//! let store = MemoryStore::new().with_write_latency(Duration::from_millis(200));
//! store.fail_tag_writes(true);
//! assert_eq!(store.stats().note_inserts, 0);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use notekeep_core::defaults::NOTE_INITIAL_VERSION;
use notekeep_core::{
    new_v7, CreateNoteRequest, Error, Note, NoteRepository, NoteRevision, Result, Tag,
    TagRepository, TagSummary, UpdateNoteRequest,
};

#[derive(Debug, Clone)]
struct NoteRow {
    id: Uuid,
    owner_id: String,
    title: String,
    content: String,
    version: i64,
    created_at_utc: DateTime<Utc>,
    updated_at_utc: DateTime<Utc>,
    /// Write sequence, breaks ties between equal timestamps.
    touched: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    notes: HashMap<Uuid, NoteRow>,
    tags: HashMap<Uuid, Tag>,
    /// (note_id, tag_id)
    associations: BTreeSet<(Uuid, Uuid)>,
    sequence: u64,
}

impl MemoryState {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn tag_names_for(&self, note_id: Uuid) -> Vec<String> {
        let mut names: Vec<String> = self
            .associations
            .range((note_id, Uuid::nil())..=(note_id, Uuid::from_u128(u128::MAX)))
            .filter_map(|(_, tag_id)| self.tags.get(tag_id).map(|t| t.name.clone()))
            .collect();
        names.sort();
        names
    }

    fn to_note(&self, row: &NoteRow) -> Note {
        Note {
            id: row.id,
            owner_id: row.owner_id.clone(),
            title: row.title.clone(),
            content: row.content.clone(),
            version: row.version,
            created_at_utc: row.created_at_utc,
            updated_at_utc: row.updated_at_utc,
            tags: self.tag_names_for(row.id),
        }
    }

    fn owned_notes_newest_first(&self, owner_id: &str) -> Vec<&NoteRow> {
        let mut rows: Vec<&NoteRow> = self
            .notes
            .values()
            .filter(|row| row.owner_id == owner_id)
            .collect();
        rows.sort_by(|a, b| {
            b.updated_at_utc
                .cmp(&a.updated_at_utc)
                .then(b.touched.cmp(&a.touched))
        });
        rows
    }
}

#[derive(Debug, Default)]
struct Faults {
    write_latency_ms: AtomicU64,
    fail_note_writes: AtomicBool,
    fail_tag_writes: AtomicBool,
    fail_associations: AtomicBool,
    /// Pending tag inserts that should lose a simulated creation race.
    raced_tag_inserts: AtomicUsize,
}

#[derive(Debug, Default)]
struct Counters {
    note_inserts: AtomicUsize,
    note_updates: AtomicUsize,
    tag_inserts: AtomicUsize,
    tag_conflicts: AtomicUsize,
    association_writes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Snapshot of call counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryStoreStats {
    /// Completed note inserts.
    pub note_inserts: usize,
    /// Completed note updates (including rejected ones).
    pub note_updates: usize,
    /// Tag rows created.
    pub tag_inserts: usize,
    /// Tag inserts that hit the uniqueness constraint.
    pub tag_conflicts: usize,
    /// Calls to `apply_associations` that changed state.
    pub association_writes: usize,
    /// Highest number of simultaneous note writes observed.
    pub max_in_flight: usize,
}

/// Decrements the in-flight counter when a note write finishes or is dropped.
struct InFlightGuard<'a> {
    counters: &'a Counters,
}

impl<'a> InFlightGuard<'a> {
    fn enter(counters: &'a Counters) -> Self {
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self { counters }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared in-memory store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    faults: Arc<Faults>,
    counters: Arc<Counters>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every note write by `latency` (uses tokio time).
    pub fn with_write_latency(self, latency: Duration) -> Self {
        self.faults
            .write_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
        self
    }

    /// Make note inserts and updates fail with a storage error.
    pub fn fail_note_writes(&self, fail: bool) {
        self.faults.fail_note_writes.store(fail, Ordering::SeqCst);
    }

    /// Make tag inserts fail with a storage error.
    pub fn fail_tag_writes(&self, fail: bool) {
        self.faults.fail_tag_writes.store(fail, Ordering::SeqCst);
    }

    /// Make association updates fail with a storage error.
    pub fn fail_associations(&self, fail: bool) {
        self.faults.fail_associations.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` tag inserts lose a creation race: another writer
    /// creates the tag first and the insert reports `AlreadyExists`.
    pub fn race_next_tag_inserts(&self, count: usize) {
        self.faults.raced_tag_inserts.store(count, Ordering::SeqCst);
    }

    /// Snapshot of call counters.
    pub fn stats(&self) -> MemoryStoreStats {
        let c = &self.counters;
        MemoryStoreStats {
            note_inserts: c.note_inserts.load(Ordering::SeqCst),
            note_updates: c.note_updates.load(Ordering::SeqCst),
            tag_inserts: c.tag_inserts.load(Ordering::SeqCst),
            tag_conflicts: c.tag_conflicts.load(Ordering::SeqCst),
            association_writes: c.association_writes.load(Ordering::SeqCst),
            max_in_flight: c.max_in_flight.load(Ordering::SeqCst),
        }
    }

    /// Number of notes across all owners.
    pub async fn note_count(&self) -> usize {
        self.state.read().await.notes.len()
    }

    /// Number of tag rows across all owners.
    pub async fn tag_count(&self) -> usize {
        self.state.read().await.tags.len()
    }

    async fn simulate_write_latency(&self) {
        let ms = self.faults.write_latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn take_raced_insert(&self) -> bool {
        self.faults
            .raced_tag_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl NoteRepository for MemoryStore {
    async fn insert(&self, req: CreateNoteRequest) -> Result<NoteRevision> {
        let _guard = InFlightGuard::enter(&self.counters);
        self.simulate_write_latency().await;
        if self.faults.fail_note_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage("note insert failed".to_string()));
        }

        let mut state = self.state.write().await;
        let id = new_v7();
        let now = Utc::now();
        let touched = state.next_sequence();
        state.notes.insert(
            id,
            NoteRow {
                id,
                owner_id: req.owner_id,
                title: req.title,
                content: req.content,
                version: NOTE_INITIAL_VERSION,
                created_at_utc: now,
                updated_at_utc: now,
                touched,
            },
        );
        self.counters.note_inserts.fetch_add(1, Ordering::SeqCst);

        Ok(NoteRevision {
            id,
            version: NOTE_INITIAL_VERSION,
        })
    }

    async fn fetch_owned(&self, id: Uuid, owner_id: &str) -> Result<Option<Note>> {
        let state = self.state.read().await;
        Ok(state
            .notes
            .get(&id)
            .filter(|row| row.owner_id == owner_id)
            .map(|row| state.to_note(row)))
    }

    async fn update_owned(&self, req: UpdateNoteRequest) -> Result<NoteRevision> {
        let _guard = InFlightGuard::enter(&self.counters);
        self.simulate_write_latency().await;
        self.counters.note_updates.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_note_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage("note update failed".to_string()));
        }

        let mut state = self.state.write().await;
        let touched = state.next_sequence();
        let row = state
            .notes
            .get_mut(&req.id)
            .filter(|row| row.owner_id == req.owner_id)
            .ok_or(Error::NoteNotFound(req.id))?;

        if let Some(expected) = req.expected_version {
            if row.version != expected {
                return Err(Error::Conflict {
                    note_id: req.id,
                    expected,
                    actual: row.version,
                });
            }
        }

        row.title = req.title;
        row.content = req.content;
        row.version += 1;
        row.updated_at_utc = Utc::now();
        row.touched = touched;

        Ok(NoteRevision {
            id: row.id,
            version: row.version,
        })
    }

    async fn delete_owned(&self, id: Uuid, owner_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let owned = state
            .notes
            .get(&id)
            .is_some_and(|row| row.owner_id == owner_id);
        if !owned {
            return Err(Error::NoteNotFound(id));
        }
        state.notes.remove(&id);
        state.associations.retain(|(note_id, _)| *note_id != id);
        Ok(())
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Note>> {
        let state = self.state.read().await;
        Ok(state
            .owned_notes_newest_first(owner_id)
            .into_iter()
            .map(|row| state.to_note(row))
            .collect())
    }

    async fn search(&self, owner_id: &str, terms: &[String]) -> Result<Vec<Note>> {
        let needles: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        let state = self.state.read().await;
        Ok(state
            .owned_notes_newest_first(owner_id)
            .into_iter()
            .filter(|row| {
                let title = row.title.to_lowercase();
                let content = row.content.to_lowercase();
                needles
                    .iter()
                    .all(|n| title.contains(n.as_str()) || content.contains(n.as_str()))
            })
            .map(|row| state.to_note(row))
            .collect())
    }
}

#[async_trait]
impl TagRepository for MemoryStore {
    async fn find_by_name(&self, owner_id: &str, name: &str) -> Result<Option<Tag>> {
        let state = self.state.read().await;
        Ok(state
            .tags
            .values()
            .find(|t| t.owner_id == owner_id && t.name == name)
            .cloned())
    }

    async fn insert(&self, owner_id: &str, name: &str) -> Result<Tag> {
        if self.faults.fail_tag_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage("tag insert failed".to_string()));
        }

        let mut state = self.state.write().await;
        let exists = state
            .tags
            .values()
            .any(|t| t.owner_id == owner_id && t.name == name);

        if !exists && self.take_raced_insert() {
            // Another session wins the race and creates the row first
            let winner = Tag {
                id: new_v7(),
                owner_id: owner_id.to_string(),
                name: name.to_string(),
                created_at_utc: Utc::now(),
            };
            state.tags.insert(winner.id, winner);
            self.counters.tag_conflicts.fetch_add(1, Ordering::SeqCst);
            return Err(Error::AlreadyExists(format!("tag '{}'", name)));
        }

        if exists {
            self.counters.tag_conflicts.fetch_add(1, Ordering::SeqCst);
            return Err(Error::AlreadyExists(format!("tag '{}'", name)));
        }

        let tag = Tag {
            id: new_v7(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            created_at_utc: Utc::now(),
        };
        state.tags.insert(tag.id, tag.clone());
        self.counters.tag_inserts.fetch_add(1, Ordering::SeqCst);
        Ok(tag)
    }

    async fn find_many(&self, owner_id: &str, names: &[String]) -> Result<Vec<Tag>> {
        let state = self.state.read().await;
        let mut found: Vec<Tag> = state
            .tags
            .values()
            .filter(|t| t.owner_id == owner_id && names.contains(&t.name))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn list_with_counts(&self, owner_id: &str) -> Result<Vec<TagSummary>> {
        let state = self.state.read().await;
        let mut summaries: Vec<TagSummary> = state
            .tags
            .values()
            .filter(|t| t.owner_id == owner_id)
            .map(|t| TagSummary {
                name: t.name.clone(),
                note_count: state
                    .associations
                    .iter()
                    .filter(|(_, tag_id)| *tag_id == t.id)
                    .count() as i64,
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    async fn tags_for_note(&self, note_id: Uuid) -> Result<Vec<Tag>> {
        let state = self.state.read().await;
        let mut tags: Vec<Tag> = state
            .associations
            .iter()
            .filter(|(n, _)| *n == note_id)
            .filter_map(|(_, tag_id)| state.tags.get(tag_id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn apply_associations(
        &self,
        note_id: Uuid,
        add: &[Uuid],
        remove: &[Uuid],
    ) -> Result<()> {
        if add.is_empty() && remove.is_empty() {
            return Ok(());
        }
        if self.faults.fail_associations.load(Ordering::SeqCst) {
            return Err(Error::Storage("association update failed".to_string()));
        }

        let mut state = self.state.write().await;
        if !state.notes.contains_key(&note_id) {
            return Err(Error::NoteNotFound(note_id));
        }
        if let Some(missing) = add.iter().find(|id| !state.tags.contains_key(id)) {
            return Err(Error::NotFound(format!("tag {}", missing)));
        }

        for tag_id in remove {
            state.associations.remove(&(note_id, *tag_id));
        }
        for tag_id in add {
            state.associations.insert((note_id, *tag_id));
        }
        self.counters
            .association_writes
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_req(owner: &str, title: &str) -> CreateNoteRequest {
        CreateNoteRequest {
            owner_id: owner.to_string(),
            title: title.to_string(),
            content: "Content".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_then_fetch_owned() {
        let store = MemoryStore::new();
        let rev = NoteRepository::insert(&store, create_req("user1", "Test"))
            .await
            .unwrap();
        assert_eq!(rev.version, NOTE_INITIAL_VERSION);

        let note = store.fetch_owned(rev.id, "user1").await.unwrap().unwrap();
        assert_eq!(note.title, "Test");
        assert!(note.tags.is_empty());

        assert!(store.fetch_owned(rev.id, "user2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_checks_expected() {
        let store = MemoryStore::new();
        let rev = NoteRepository::insert(&store, create_req("user1", "Test"))
            .await
            .unwrap();

        let updated = store
            .update_owned(UpdateNoteRequest {
                id: rev.id,
                owner_id: "user1".to_string(),
                title: "New".to_string(),
                content: "New content".to_string(),
                expected_version: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        let stale = store
            .update_owned(UpdateNoteRequest {
                id: rev.id,
                owner_id: "user1".to_string(),
                title: "Stale".to_string(),
                content: "Stale".to_string(),
                expected_version: Some(1),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            stale,
            Error::Conflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_tag_insert_unique_per_owner() {
        let store = MemoryStore::new();
        TagRepository::insert(&store, "user1", "work").await.unwrap();

        let dup = TagRepository::insert(&store, "user1", "work").await;
        assert!(matches!(dup, Err(Error::AlreadyExists(_))));

        // Same name for a different owner is fine
        TagRepository::insert(&store, "user2", "work").await.unwrap();
        assert_eq!(store.tag_count().await, 2);
    }

    #[tokio::test]
    async fn test_raced_insert_creates_row_and_reports_conflict() {
        let store = MemoryStore::new();
        store.race_next_tag_inserts(1);

        let raced = TagRepository::insert(&store, "user1", "work").await;
        assert!(matches!(raced, Err(Error::AlreadyExists(_))));
        assert!(store.find_by_name("user1", "work").await.unwrap().is_some());
        assert_eq!(store.stats().tag_conflicts, 1);
    }

    #[tokio::test]
    async fn test_delete_removes_associations() {
        let store = MemoryStore::new();
        let rev = NoteRepository::insert(&store, create_req("user1", "Test"))
            .await
            .unwrap();
        let tag = TagRepository::insert(&store, "user1", "work").await.unwrap();
        store
            .apply_associations(rev.id, &[tag.id], &[])
            .await
            .unwrap();

        store.delete_owned(rev.id, "user1").await.unwrap();
        let counts = store.list_with_counts("user1").await.unwrap();
        assert_eq!(counts[0].note_count, 0);
    }

    #[tokio::test]
    async fn test_failing_associations_leave_state_untouched() {
        let store = MemoryStore::new();
        let rev = NoteRepository::insert(&store, create_req("user1", "Test"))
            .await
            .unwrap();
        let tag = TagRepository::insert(&store, "user1", "draft").await.unwrap();
        store
            .apply_associations(rev.id, &[tag.id], &[])
            .await
            .unwrap();

        store.fail_associations(true);
        let err = store.apply_associations(rev.id, &[], &[tag.id]).await;
        assert!(err.is_err());

        let tags = store.tags_for_note(rev.id).await.unwrap();
        assert_eq!(tags.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_latency_counts_in_flight() {
        let store = MemoryStore::new().with_write_latency(Duration::from_millis(100));
        let a = NoteRepository::insert(&store, create_req("user1", "A"));
        let b = NoteRepository::insert(&store, create_req("user1", "B"));
        let (a, b) = tokio::join!(a, b);
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(store.stats().max_in_flight, 2);
    }
}
