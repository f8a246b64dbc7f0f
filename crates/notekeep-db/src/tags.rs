//! Tag repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use notekeep_core::{new_v7, Error, Result, Tag, TagRepository, TagSummary};

/// PostgreSQL implementation of TagRepository.
#[derive(Debug, Clone)]
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// True when the driver reports a unique constraint violation (SQLSTATE 23505).
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

fn map_row_to_tag(row: sqlx::postgres::PgRow) -> Tag {
    Tag {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        created_at_utc: row.get("created_at_utc"),
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn find_by_name(&self, owner_id: &str, name: &str) -> Result<Option<Tag>> {
        let row = sqlx::query(
            "SELECT id, owner_id, name, created_at_utc FROM tag WHERE owner_id = $1 AND name = $2",
        )
        .bind(owner_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(map_row_to_tag))
    }

    async fn insert(&self, owner_id: &str, name: &str) -> Result<Tag> {
        let row = sqlx::query(
            "INSERT INTO tag (id, owner_id, name, created_at_utc) VALUES ($1, $2, $3, $4)
             RETURNING id, owner_id, name, created_at_utc",
        )
        .bind(new_v7())
        .bind(owner_id)
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::AlreadyExists(format!("tag '{}'", name))
            } else {
                Error::Database(e)
            }
        })?;

        Ok(map_row_to_tag(row))
    }

    async fn find_many(&self, owner_id: &str, names: &[String]) -> Result<Vec<Tag>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT id, owner_id, name, created_at_utc FROM tag
             WHERE owner_id = $1 AND name = ANY($2) ORDER BY name",
        )
        .bind(owner_id)
        .bind(names.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_row_to_tag).collect())
    }

    async fn list_with_counts(&self, owner_id: &str) -> Result<Vec<TagSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT
                t.name,
                COUNT(nt.note_id) AS note_count
            FROM tag t
            LEFT JOIN note_tag nt ON nt.tag_id = t.id
            WHERE t.owner_id = $1
            GROUP BY t.id, t.name
            ORDER BY t.name
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let tags = rows
            .into_iter()
            .map(|row| TagSummary {
                name: row.get("name"),
                note_count: row.get("note_count"),
            })
            .collect();

        Ok(tags)
    }

    async fn tags_for_note(&self, note_id: Uuid) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT t.id, t.owner_id, t.name, t.created_at_utc
             FROM note_tag nt JOIN tag t ON t.id = nt.tag_id
             WHERE nt.note_id = $1 ORDER BY t.name",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_row_to_tag).collect())
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

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        if !remove.is_empty() {
            sqlx::query("DELETE FROM note_tag WHERE note_id = $1 AND tag_id = ANY($2)")
                .bind(note_id)
                .bind(remove.to_vec())
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }

        if !add.is_empty() {
            sqlx::query(
                "INSERT INTO note_tag (note_id, tag_id)
                 SELECT $1, tag_id FROM UNNEST($2::uuid[]) AS tag_id
                 ON CONFLICT (note_id, tag_id) DO NOTHING",
            )
            .bind(note_id)
            .bind(add.to_vec())
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
