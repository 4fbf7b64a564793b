// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Database Management
//!
//! SQLite persistence for every trainer collection. Records are stored as JSON
//! payloads in a single `records` table keyed by collection and id, so new
//! entity types need no schema change.
//!
//! The connection is owned by a [`PersistenceHandle`], which connects lazily on
//! first use and is shared by every store.

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::errors::{TrainerError, TrainerResult};

/// Database manager for record storage
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect and run migrations
    pub async fn new(database_url: &str) -> TrainerResult<Self> {
        let is_memory = database_url.contains(":memory:");

        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if is_memory || database_url.contains("mode=") {
            database_url.to_string()
        } else {
            format!("{database_url}?mode=rwc")
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(if is_memory { 1 } else { 5 })
            .connect(&connection_options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        info!(database.memory = is_memory, "Database connected");
        Ok(db)
    }

    /// Run database migrations
    pub async fn migrate(&self) -> TrainerResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                owner_id TEXT,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_records_owner ON records(collection, owner_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new record; an existing id is an error
    pub async fn insert_record(
        &self,
        collection: &str,
        id: &str,
        owner_id: Option<&str>,
        payload: &str,
    ) -> TrainerResult<()> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO records (collection, id, owner_id, payload, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(owner_id)
        .bind(payload)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                TrainerError::already_exists(format!("{collection} record {id}")),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Payload of a record, if present
    pub async fn get_record(&self, collection: &str, id: &str) -> TrainerResult<Option<String>> {
        let row = sqlx::query("SELECT payload FROM records WHERE collection = ?1 AND id = ?2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("payload")?)),
            None => Ok(None),
        }
    }

    /// Replace a record's payload; false when the record does not exist
    pub async fn update_record(
        &self,
        collection: &str,
        id: &str,
        owner_id: Option<&str>,
        payload: &str,
    ) -> TrainerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE records SET payload = ?1, owner_id = ?2, updated_at = ?3
            WHERE collection = ?4 AND id = ?5
            "#,
        )
        .bind(payload)
        .bind(owner_id)
        .bind(Utc::now().to_rfc3339())
        .bind(collection)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_record(&self, collection: &str, id: &str) -> TrainerResult<bool> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ?1 AND id = ?2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(collection, id, deleted = result.rows_affected(), "Record delete");
        Ok(result.rows_affected() > 0)
    }

    /// Payloads in insertion order, optionally restricted to one owner
    pub async fn list_records(
        &self,
        collection: &str,
        owner_id: Option<&str>,
    ) -> TrainerResult<Vec<String>> {
        let rows = match owner_id {
            Some(owner) => {
                sqlx::query(
                    "SELECT payload FROM records \
                     WHERE collection = ?1 AND owner_id = ?2 ORDER BY rowid",
                )
                .bind(collection)
                .bind(owner)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT payload FROM records WHERE collection = ?1 ORDER BY rowid")
                    .bind(collection)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter()
            .map(|row| row.try_get::<String, _>("payload").map_err(TrainerError::from))
            .collect()
    }

    pub async fn count_records(&self, collection: &str) -> TrainerResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM records WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}

/// Lazily connected, process-wide database handle
///
/// The connection is established on the first call to [`PersistenceHandle::database`].
/// A failed connect leaves the handle empty so that the next call retries.
pub struct PersistenceHandle {
    url: String,
    cell: OnceCell<Database>,
}

impl PersistenceHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cell: OnceCell::new(),
        }
    }

    /// Connected database, connecting on first use
    pub async fn database(&self) -> TrainerResult<&Database> {
        self.cell
            .get_or_try_init(|| async { Database::new(&self.url).await })
            .await
    }

    pub fn is_connected(&self) -> bool {
        self.cell.initialized()
    }
}
