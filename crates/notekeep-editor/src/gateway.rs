//! Note persistence gateway.
//!
//! One entry point for both save paths: a draft without an identity is
//! created, a draft with one is updated under an ownership check. In both
//! cases the tag set is reconciled after the note row is written.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use notekeep_core::defaults::NOTE_TITLE_MAX_LEN;
use notekeep_core::error::REQUIRED_FIELDS_MESSAGE;
use notekeep_core::{
    normalize_tag_set, CreateNoteRequest, Error, NoteRepository, Result, SavedNote,
    TagRepository, UpdateNoteRequest,
};

use crate::reconciler::TagReconciler;

/// Everything needed to persist one draft snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// `None` creates a note; `Some` updates it.
    pub identity: Option<Uuid>,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    /// Version the caller last saw; `None` skips the conflict check.
    pub expected_version: Option<i64>,
}

/// Writes drafts to storage.
#[derive(Clone)]
pub struct NoteGateway {
    notes: Arc<dyn NoteRepository>,
    reconciler: TagReconciler,
}

impl NoteGateway {
    pub fn new(notes: Arc<dyn NoteRepository>, tags: Arc<dyn TagRepository>) -> Self {
        Self {
            notes,
            reconciler: TagReconciler::new(tags),
        }
    }

    pub fn reconciler(&self) -> &TagReconciler {
        &self.reconciler
    }

    /// Create or update a note and reconcile its tags.
    ///
    /// Validation failures are returned before any write. If the note row is
    /// written but reconciliation fails, the result is
    /// [`Error::PartialReconciliation`] carrying the written id and version.
    pub async fn save(&self, req: SaveRequest) -> Result<SavedNote> {
        validate(&req)?;
        let start = Instant::now();

        let (id, version, created) = match req.identity {
            None => {
                let rev = self
                    .notes
                    .insert(CreateNoteRequest {
                        owner_id: req.owner_id.clone(),
                        title: req.title.clone(),
                        content: req.content.clone(),
                    })
                    .await?;
                (rev.id, rev.version, true)
            }
            Some(id) => {
                let rev = self
                    .notes
                    .update_owned(UpdateNoteRequest {
                        id,
                        owner_id: req.owner_id.clone(),
                        title: req.title.clone(),
                        content: req.content.clone(),
                        expected_version: req.expected_version,
                    })
                    .await?;
                (rev.id, rev.version, false)
            }
        };

        if let Err(e) = self.reconciler.reconcile(id, &req.owner_id, &req.tags).await {
            warn!(
                subsystem = "editor",
                component = "gateway",
                note_id = %id,
                created,
                error = %e,
                "Note written but tag reconciliation failed"
            );
            return Err(Error::PartialReconciliation {
                note_id: id,
                version,
                created,
                source: Box::new(e),
            });
        }

        info!(
            subsystem = "editor",
            component = "gateway",
            op = if created { "create" } else { "update" },
            note_id = %id,
            version,
            duration_ms = start.elapsed().as_millis() as u64,
            "Note saved"
        );

        Ok(SavedNote {
            id,
            version,
            created,
        })
    }
}

fn validate(req: &SaveRequest) -> Result<()> {
    if req.title.trim().is_empty() || req.content.trim().is_empty() {
        return Err(Error::Validation(REQUIRED_FIELDS_MESSAGE.to_string()));
    }
    if req.title.chars().count() > NOTE_TITLE_MAX_LEN {
        return Err(Error::Validation(format!(
            "Title must be {} characters or less",
            NOTE_TITLE_MAX_LEN
        )));
    }
    normalize_tag_set(&req.tags)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notekeep_db::MemoryStore;

    const OWNER: &str = "user1";

    fn gateway(store: &MemoryStore) -> NoteGateway {
        NoteGateway::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    fn request(identity: Option<Uuid>, title: &str, tags: &[&str]) -> SaveRequest {
        SaveRequest {
            identity,
            owner_id: OWNER.to_string(),
            title: title.to_string(),
            content: "Body".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            expected_version: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_update() {
        let store = MemoryStore::new();
        let gateway = gateway(&store);

        let created = gateway
            .save(request(None, "First", &["Work"]))
            .await
            .unwrap();
        assert!(created.created);
        assert_eq!(created.version, 1);

        let updated = gateway
            .save(request(Some(created.id), "Second", &[]))
            .await
            .unwrap();
        assert!(!updated.created);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.version, 2);

        let note = store.fetch_owned(created.id, OWNER).await.unwrap().unwrap();
        assert_eq!(note.title, "Second");
        assert!(note.tags.is_empty());
        assert_eq!(store.note_count().await, 1);
    }

    #[tokio::test]
    async fn test_blank_fields_rejected_without_writes() {
        let store = MemoryStore::new();
        let gateway = gateway(&store);

        let err = gateway.save(request(None, "  ", &[])).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m == REQUIRED_FIELDS_MESSAGE));
        assert_eq!(store.stats().note_inserts, 0);
    }

    #[tokio::test]
    async fn test_update_of_foreign_note_is_not_found() {
        let store = MemoryStore::new();
        let gateway = gateway(&store);
        let created = gateway.save(request(None, "Mine", &[])).await.unwrap();

        let mut foreign = request(Some(created.id), "Hijack", &[]);
        foreign.owner_id = "user2".to_string();
        let err = gateway.save(foreign).await.unwrap_err();

        assert!(matches!(err, Error::NoteNotFound(id) if id == created.id));
        let note = store.fetch_owned(created.id, OWNER).await.unwrap().unwrap();
        assert_eq!(note.title, "Mine");
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = MemoryStore::new();
        let gateway = gateway(&store);
        let created = gateway.save(request(None, "T", &[])).await.unwrap();

        let mut stale = request(Some(created.id), "T2", &[]);
        stale.expected_version = Some(created.version + 5);
        let err = gateway.save(stale).await.unwrap_err();

        assert!(matches!(err, Error::Conflict { actual: 1, .. }));
    }

    #[tokio::test]
    async fn test_reconcile_failure_is_partial() {
        let store = MemoryStore::new();
        let gateway = gateway(&store);
        store.fail_associations(true);

        let err = gateway
            .save(request(None, "T", &["work"]))
            .await
            .unwrap_err();

        match err {
            Error::PartialReconciliation {
                note_id,
                version,
                created,
                ..
            } => {
                assert!(created);
                assert_eq!(version, 1);
                assert!(store.fetch_owned(note_id, OWNER).await.unwrap().is_some());
            }
            other => panic!("expected partial reconciliation, got {other:?}"),
        }
    }
}
