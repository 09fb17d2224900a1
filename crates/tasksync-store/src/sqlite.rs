//! SQLite store backend.
//!
//! Schema is created on connect; there is no separate migration step. One
//! row per identity in `identities` (UNIQUE on `public_key_hash`), one row
//! per identity in `records`. The record upsert bumps `version` by exactly
//! 1 atomically in a single statement, so concurrent writers cannot skip
//! or repeat a version, though the later ciphertext still wins.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use tasksync_core::{Identity, Result, StoredRecord, SyncStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS identities (
    user_id         TEXT PRIMARY KEY,
    public_key_hash TEXT NOT NULL UNIQUE,
    public_key      BLOB NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS records (
    user_id    TEXT PRIMARY KEY REFERENCES identities(user_id),
    ciphertext BLOB,
    version    INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);
"#;

#[derive(sqlx::FromRow)]
struct IdentityRow {
    user_id: String,
    public_key_hash: String,
    public_key: Vec<u8>,
    created_at: DateTime<Utc>,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Identity {
            user_id: row.user_id,
            public_key_hash: row.public_key_hash,
            public_key: row.public_key,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    user_id: String,
    ciphertext: Option<Vec<u8>>,
    version: i64,
    updated_at: DateTime<Utc>,
}

impl From<RecordRow> for StoredRecord {
    fn from(row: RecordRow) -> Self {
        StoredRecord {
            user_id: row.user_id,
            ciphertext: row.ciphertext,
            version: row.version,
            updated_at: row.updated_at,
        }
    }
}

/// SQLite-backed [`SyncStore`] implementation.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to a SQLite database and ensure the schema exists.
    ///
    /// `sqlite::memory:` is supported for tests; memory databases are
    /// pinned to a single connection so every query sees the same data.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // Memory databases exist per-connection: pin them to one
        // never-recycled connection so every query sees the same data.
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        // raw_sql: the schema is two statements and must not be prepared.
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        debug!(url, "sqlite store ready");

        Ok(Self { pool })
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SyncStore for SqliteStore {
    async fn identity(&self, user_id: &str) -> Result<Option<Identity>> {
        let row: Option<IdentityRow> = sqlx::query_as(
            "SELECT user_id, public_key_hash, public_key, created_at
             FROM identities WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Identity::from))
    }

    async fn create_identity(
        &self,
        user_id: &str,
        public_key: &[u8],
        public_key_hash: &str,
    ) -> Result<Identity> {
        let created_at = Utc::now();
        sqlx::query(
            "INSERT INTO identities (user_id, public_key_hash, public_key, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(user_id)
        .bind(public_key_hash)
        .bind(public_key)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        debug!(user_id, "identity auto-registered");
        Ok(Identity {
            user_id: user_id.to_string(),
            public_key_hash: public_key_hash.to_string(),
            public_key: public_key.to_vec(),
            created_at,
        })
    }

    async fn record(&self, user_id: &str) -> Result<Option<StoredRecord>> {
        let row: Option<RecordRow> = sqlx::query_as(
            "SELECT user_id, ciphertext, version, updated_at
             FROM records WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(StoredRecord::from))
    }

    async fn put_record(&self, user_id: &str, ciphertext: &[u8]) -> Result<i64> {
        let version: i64 = sqlx::query_scalar(
            "INSERT INTO records (user_id, ciphertext, version, updated_at)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT(user_id) DO UPDATE
             SET ciphertext = excluded.ciphertext,
                 version = records.version + 1,
                 updated_at = excluded.updated_at
             RETURNING version",
        )
        .bind(user_id)
        .bind(ciphertext)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(version)
    }
}
