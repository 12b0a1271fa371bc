//! Embedded single-file [`RecordStore`] backend, backed by SQLite.

use crate::error::Error;
use crate::store::{backend_options, RecordStore};
use serde::Deserialize;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;

const DEFAULT_PATH: &str = "acmemole.db";

#[derive(Debug, Default, Deserialize)]
struct SqliteOptions {
    /// Path to the database file. Created if missing.
    #[serde(default)]
    path: String,
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect using the generic store option mapping. The only recognized
    /// option is `path`, defaulting to `acmemole.db`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the database can't be opened or the
    /// liveness round trip fails.
    pub async fn connect(options: &HashMap<String, Value>) -> Result<Self, Error> {
        let options: SqliteOptions = backend_options(options)?;
        let path = if options.path.is_empty() {
            DEFAULT_PATH
        } else {
            options.path.as_str()
        };
        Self::open(path).await
    }

    /// Open the database file at `path`, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the database can't be opened or the
    /// liveness round trip fails.
    pub async fn open(path: &str) -> Result<Self, Error> {
        let connect = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        // SQLite is a single-writer engine; a single pooled connection
        // serializes conflicting writes at the storage layer.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect)
            .await?;
        sqlx::query("SELECT 1").fetch_one(&pool).await?;
        sqlx::query("CREATE TABLE IF NOT EXISTS records (key TEXT PRIMARY KEY, value BLOB NOT NULL)")
            .execute(&pool)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl RecordStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        let value: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT value FROM records WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        value.ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO records (key, value) VALUES (?, ?) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM records WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        self.pool.close().await;
        Ok(())
    }
}
