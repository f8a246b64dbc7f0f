//! Tag reconciliation.
//!
//! Brings a note's stored tag associations in line with a target set of
//! names: normalize the set, find-or-create each tag, diff against the
//! current associations, and apply the difference in one atomic step.
//! A failure at any point leaves the note's previous associations intact.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};
use uuid::Uuid;

use notekeep_core::{normalize_tag_set, Error, Result, Tag, TagRepository};

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Normalized target names, sorted.
    pub tags: Vec<String>,
    /// Associations added.
    pub added: usize,
    /// Associations removed.
    pub removed: usize,
    /// Tag rows created during this call.
    pub created_tags: usize,
}

/// Reconciles note/tag associations against a target name set.
#[derive(Clone)]
pub struct TagReconciler {
    tags: Arc<dyn TagRepository>,
}

impl TagReconciler {
    pub fn new(tags: Arc<dyn TagRepository>) -> Self {
        Self { tags }
    }

    /// Find the owner's tag called `name`, creating it if absent.
    ///
    /// `name` must already be normalized. Concurrent creation is tolerated:
    /// a uniqueness conflict on insert means another writer won, and the
    /// winner's row is fetched instead.
    pub async fn find_or_create(&self, owner_id: &str, name: &str) -> Result<(Tag, bool)> {
        match self.tags.insert(owner_id, name).await {
            Ok(tag) => Ok((tag, true)),
            Err(Error::AlreadyExists(_)) => {
                debug!(
                    subsystem = "editor",
                    component = "reconciler",
                    tag = name,
                    "Tag already exists, re-fetching"
                );
                let tag = self.tags.find_by_name(owner_id, name).await?.ok_or_else(|| {
                    Error::Internal(format!("tag '{}' vanished after conflict", name))
                })?;
                Ok((tag, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Make `note_id`'s associations equal to `names` (after normalization).
    ///
    /// Blank entries are dropped and case variants collapse to one tag. An
    /// empty target removes every association.
    #[instrument(
        skip(self, names),
        fields(subsystem = "editor", component = "reconciler", op = "reconcile")
    )]
    pub async fn reconcile(
        &self,
        note_id: Uuid,
        owner_id: &str,
        names: &[String],
    ) -> Result<ReconcileReport> {
        let start = Instant::now();
        let target = normalize_tag_set(names)?;

        let mut target_ids = HashSet::with_capacity(target.len());
        let mut created_tags = 0;
        if !target.is_empty() {
            let existing = self.tags.find_many(owner_id, &target).await?;
            let found: HashSet<&str> = existing.iter().map(|t| t.name.as_str()).collect();
            let missing: Vec<&String> = target
                .iter()
                .filter(|name| !found.contains(name.as_str()))
                .collect();

            for name in missing {
                let (tag, created) = self.find_or_create(owner_id, name).await?;
                if created {
                    created_tags += 1;
                }
                target_ids.insert(tag.id);
            }
            target_ids.extend(existing.iter().map(|t| t.id));
        }

        let current: HashSet<Uuid> = self
            .tags
            .tags_for_note(note_id)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        let mut add: Vec<Uuid> = target_ids.difference(&current).copied().collect();
        let mut remove: Vec<Uuid> = current.difference(&target_ids).copied().collect();
        add.sort();
        remove.sort();

        if !add.is_empty() || !remove.is_empty() {
            if let Err(e) = self.tags.apply_associations(note_id, &add, &remove).await {
                warn!(
                    note_id = %note_id,
                    added = add.len(),
                    removed = remove.len(),
                    error = %e,
                    "Tag association update failed"
                );
                return Err(e);
            }
        }

        debug!(
            note_id = %note_id,
            tag_count = target.len(),
            added = add.len(),
            removed = remove.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Tags reconciled"
        );

        Ok(ReconcileReport {
            tags: target,
            added: add.len(),
            removed: remove.len(),
            created_tags,
        })
    }
}
