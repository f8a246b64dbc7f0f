//! # notekeep-db
//!
//! Storage for notekeep: PostgreSQL repositories for notes, tags, and
//! note/tag associations, plus [`MemoryStore`], an in-process store with
//! the same owner scoping, version checks, and uniqueness rules.
//!
//! ```rust,ignore
//! use notekeep_db::{Database, PoolConfig, TagRepository};
//!
//! let db = Database::connect(&url, PoolConfig::from_env()).await?;
//! db.migrate().await?;
//! let tags = db.tags.list_with_counts("user1").await?;
//! ```

pub mod memory;
pub mod notes;
pub mod pool;
pub mod tags;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

pub use notekeep_core::*;

pub use memory::{MemoryStore, MemoryStoreStats};
pub use notes::PgNoteRepository;
pub use pool::{create_pool_with_config, PoolConfig};
pub use tags::PgTagRepository;

use sqlx::PgPool;

/// Escape `%`, `_`, and `\` so user text matches literally in ILIKE.
/// Pair with `ESCAPE '\'` in the query.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Both PostgreSQL repositories over one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pub notes: PgNoteRepository,
    pub tags: PgTagRepository,
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            pool,
        }
    }

    /// Open a pool to `url` with the given settings.
    pub async fn connect(url: &str, config: PoolConfig) -> Result<Self> {
        create_pool_with_config(url, config).await.map(Self::new)
    }

    /// Connect to `DATABASE_URL` using [`PoolConfig::from_env`].
    pub async fn connect_from_env() -> Result<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;
        Self::connect(&url, PoolConfig::from_env()).await
    }

    /// Apply the schema in `migrations/`.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
