//! Networked relational [`RecordStore`] backend, backed by PostgreSQL.

use crate::error::Error;
use crate::store::{backend_options, RecordStore};
use serde::Deserialize;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::collections::HashMap;
use std::str::FromStr;

const DEFAULT_PORT: u16 = 5432;

#[derive(Debug, Default, Deserialize)]
struct PostgresOptions {
    #[serde(default)]
    host: String,
    #[serde(default)]
    port: u16,
    #[serde(default)]
    user: String,
    #[serde(default)]
    pass: String,
    #[serde(default)]
    dbname: String,
    #[serde(default)]
    sslmode: String,
}

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect using the generic store option mapping. `host`, `user` and
    /// `dbname` are required; `port` defaults to 5432, `pass` and `sslmode`
    /// are optional.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for missing required options and
    /// [`Error::Store`] when the server can't be reached.
    pub async fn connect(options: &HashMap<String, Value>) -> Result<Self, Error> {
        let options: PostgresOptions = backend_options(options)?;
        if options.host.is_empty() {
            return Err(Error::Config("missing host".to_string()));
        }
        if options.user.is_empty() {
            return Err(Error::Config("missing user".to_string()));
        }
        if options.dbname.is_empty() {
            return Err(Error::Config("missing dbname".to_string()));
        }
        let port = if options.port == 0 {
            DEFAULT_PORT
        } else {
            options.port
        };

        let mut connect = PgConnectOptions::new()
            .host(&options.host)
            .port(port)
            .username(&options.user)
            .database(&options.dbname);
        if !options.pass.is_empty() {
            connect = connect.password(&options.pass);
        }
        if !options.sslmode.is_empty() {
            let mode = PgSslMode::from_str(&options.sslmode)
                .map_err(|_| Error::Config(format!("unknown sslmode \"{}\"", options.sslmode)))?;
            connect = connect.ssl_mode(mode);
        }

        let pool = PgPoolOptions::new().connect_with(connect).await?;
        sqlx::query("SELECT 1").fetch_one(&pool).await?;
        sqlx::query("CREATE TABLE IF NOT EXISTS records (key TEXT PRIMARY KEY, value BYTEA NOT NULL)")
            .execute(&pool)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl RecordStore for PostgresStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        let value: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT value FROM records WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        value.ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        // Single-row upsert; conflicting writes for the same key are
        // serialized by the database.
        sqlx::query(
            "INSERT INTO records (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM records WHERE key = $1")
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
