//! Record store
//!
//! The `RecordStore` trait is the persistence port used by the services;
//! `SqliteRecordStore` is the production adapter.

use crate::registry::models::{NewPerson, PersonRecord, RecordKey, RecordPatch};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Errors raised by a record store
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record with this key already exists
    #[error("Record already exists: {0}")]
    AlreadyExists(RecordKey),

    /// No record with this key (returned by `update`)
    #[error("Record not found: {0}")]
    NotFound(RecordKey),

    /// Underlying database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store-specific failure (connection setup, migrations, backend outage)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence port for person records
///
/// `exists` followed by `create` is not atomic: two callers may both see
/// `false` for the same key. Implementations must reject the second
/// `create` with `StoreError::AlreadyExists`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Check whether a record exists
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Create a record, returning its key (generated if `person.key` is `None`)
    async fn create(&self, person: NewPerson) -> Result<RecordKey, StoreError>;

    /// Read a record by key
    async fn get(&self, key: &str) -> Result<Option<PersonRecord>, StoreError>;

    /// Apply a partial update to an existing record
    async fn update(&self, key: &str, patch: RecordPatch) -> Result<(), StoreError>;

    /// Records with key strictly greater than `after`, ascending, at most `limit`
    async fn list_page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PersonRecord>, StoreError>;
}

/// SQLite-backed record store
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Open (or create) the database and run migrations
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file, or a `sqlite:` URL
    pub async fn connect(db_path: &str) -> Result<Self, StoreError> {
        if !db_path.starts_with("sqlite:") {
            if let Some(parent) = PathBuf::from(db_path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!("Failed to create db directory: {}", e))
                })?;
            }
        }

        let connection_string = if db_path.starts_with("sqlite:") {
            db_path.to_string()
        } else {
            format!("sqlite:{}", db_path)
        };

        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| StoreError::Unavailable(format!("Invalid database path: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Connected to SQLite database at: {}", db_path);

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        info!("Running database migrations...");

        let migration_sql = include_str!("../../migrations/001_create_people.sql");

        // Strip comments so the file can be split on ';'
        let mut cleaned_sql = String::new();
        for line in migration_sql.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("--") {
                continue;
            }
            let without_comments = match trimmed.find("--") {
                Some(comment_pos) => &trimmed[..comment_pos],
                None => trimmed,
            };
            cleaned_sql.push_str(without_comments.trim());
            cleaned_sql.push(' ');
        }

        for statement in cleaned_sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    StoreError::Unavailable(format!(
                        "Migration failed: {} - Statement: {}",
                        e,
                        statement.chars().take(100).collect::<String>()
                    ))
                })?;
        }

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM people WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn create(&self, person: NewPerson) -> Result<RecordKey, StoreError> {
        let key = person.key.unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO people (key, name, contact, category, photo_url, qr_code_url, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, NULL, ?, ?)",
        )
        .bind(&key)
        .bind(&person.name)
        .bind(&person.contact)
        .bind(&person.category)
        .bind(&person.photo_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(key = %key, "Created person record");
                Ok(key)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::AlreadyExists(key))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<PersonRecord>, StoreError> {
        let record = sqlx::query_as::<_, PersonRecord>(
            "SELECT key, name, contact, category, photo_url, qr_code_url, created_at, updated_at \
             FROM people WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn update(&self, key: &str, patch: RecordPatch) -> Result<(), StoreError> {
        // Nothing to write; still report unknown keys
        if patch.is_empty() {
            return if self.exists(key).await? {
                Ok(())
            } else {
                Err(StoreError::NotFound(key.to_string()))
            };
        }

        let updated_at = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE people SET photo_url = COALESCE(?, photo_url), \
             qr_code_url = COALESCE(?, qr_code_url), updated_at = ? WHERE key = ?",
        )
        .bind(&patch.photo_url)
        .bind(&patch.qr_code_url)
        .bind(updated_at)
        .bind(key)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(key.to_string()));
        }

        debug!(key = %key, "Updated person record");
        Ok(())
    }

    async fn list_page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PersonRecord>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = match after {
            Some(after) => {
                sqlx::query_as::<_, PersonRecord>(
                    "SELECT key, name, contact, category, photo_url, qr_code_url, created_at, updated_at \
                     FROM people WHERE key > ? ORDER BY key ASC LIMIT ?",
                )
                .bind(after)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, PersonRecord>(
                    "SELECT key, name, contact, category, photo_url, qr_code_url, created_at, updated_at \
                     FROM people ORDER BY key ASC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(records)
    }
}
