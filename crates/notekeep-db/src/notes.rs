//! Note repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use notekeep_core::defaults::NOTE_INITIAL_VERSION;
use notekeep_core::{
    new_v7, CreateNoteRequest, Error, Note, NoteRepository, NoteRevision, Result,
    UpdateNoteRequest,
};

use crate::escape_like;

/// Note columns plus a comma-joined, sorted tag list.
const NOTE_SELECT: &str = r#"
    SELECT
        n.id,
        n.owner_id,
        n.title,
        n.content,
        n.version,
        n.created_at_utc,
        n.updated_at_utc,
        COALESCE(string_agg(t.name, ',' ORDER BY t.name), '') AS tags
    FROM note n
    LEFT JOIN note_tag nt ON nt.note_id = n.id
    LEFT JOIN tag t ON t.id = nt.tag_id
"#;

/// PostgreSQL implementation of NoteRepository.
#[derive(Debug, Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Current version of an owned note, if any.
    async fn current_version(&self, id: Uuid, owner_id: &str) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT version FROM note WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }
}

/// Map a database row to a Note.
fn map_row_to_note(row: sqlx::postgres::PgRow) -> Note {
    // Tag names never contain ',' (rejected by validate_tag_name)
    let tags_str: String = row.get("tags");
    let tags = if tags_str.is_empty() {
        Vec::new()
    } else {
        tags_str.split(',').map(String::from).collect()
    };

    Note {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        content: row.get("content"),
        version: row.get("version"),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
        tags,
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, req: CreateNoteRequest) -> Result<NoteRevision> {
        let id = new_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO note (id, owner_id, title, content, version, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(id)
        .bind(&req.owner_id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(NOTE_INITIAL_VERSION)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(NoteRevision {
            id,
            version: NOTE_INITIAL_VERSION,
        })
    }

    async fn fetch_owned(&self, id: Uuid, owner_id: &str) -> Result<Option<Note>> {
        let query = format!(
            "{} WHERE n.id = $1 AND n.owner_id = $2 GROUP BY n.id",
            NOTE_SELECT
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(map_row_to_note))
    }

    async fn update_owned(&self, req: UpdateNoteRequest) -> Result<NoteRevision> {
        let now = Utc::now();

        let version = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE note
            SET title = $3, content = $4, version = version + 1, updated_at_utc = $5
            WHERE id = $1 AND owner_id = $2 AND ($6::BIGINT IS NULL OR version = $6)
            RETURNING version
            "#,
        )
        .bind(req.id)
        .bind(&req.owner_id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(now)
        .bind(req.expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if let Some(version) = version {
            return Ok(NoteRevision {
                id: req.id,
                version,
            });
        }

        // Nothing updated: either missing/not owned, or the version moved on
        match (
            self.current_version(req.id, &req.owner_id).await?,
            req.expected_version,
        ) {
            (Some(actual), Some(expected)) => Err(Error::Conflict {
                note_id: req.id,
                expected,
                actual,
            }),
            _ => Err(Error::NoteNotFound(req.id)),
        }
    }

    async fn delete_owned(&self, id: Uuid, owner_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM note WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Note>> {
        let query = format!(
            "{} WHERE n.owner_id = $1 GROUP BY n.id ORDER BY n.updated_at_utc DESC",
            NOTE_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_row_to_note).collect())
    }

    async fn search(&self, owner_id: &str, terms: &[String]) -> Result<Vec<Note>> {
        let mut query = format!("{} WHERE n.owner_id = $1 ", NOTE_SELECT);
        for idx in 0..terms.len() {
            let param = idx + 2;
            query.push_str(&format!(
                "AND (n.title ILIKE ${p} ESCAPE '\\' OR n.content ILIKE ${p} ESCAPE '\\') ",
                p = param
            ));
        }
        query.push_str("GROUP BY n.id ORDER BY n.updated_at_utc DESC");

        let mut q = sqlx::query(&query).bind(owner_id);
        for term in terms {
            q = q.bind(format!("%{}%", escape_like(term)));
        }

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;
        Ok(rows.into_iter().map(map_row_to_note).collect())
    }
}
