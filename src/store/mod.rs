//! Challenge record storage.
//!
//! A byte-oriented key/value abstraction persisted by a pluggable backend.
//! Keys are fully-qualified domain names and values are challenge tokens,
//! but the store itself has no knowledge of DNS semantics; that stays in
//! [`crate::dns`] and [`crate::challenge`].
//!
//! Three backends are provided: [`memory::InMemoryStore`] (not durable,
//! useful for tests and throwaway deployments), [`sqlite::SqliteStore`]
//! (embedded single-file engine, the default) and
//! [`postgres::PostgresStore`] (networked relational engine). Only the
//! adapter modules depend on the storage engine's client library.

use crate::error::Error;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

pub mod memory;
pub mod postgres;
pub mod sqlite;

#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryStore;
#[allow(clippy::module_name_repetitions)]
pub use postgres::PostgresStore;
#[allow(clippy::module_name_repetitions)]
pub use sqlite::SqliteStore;

/// `DynRecordStore` is a shared handle to a [`RecordStore`] backend, safe for
/// concurrent readers and writers.
#[allow(clippy::module_name_repetitions)]
pub type DynRecordStore = Arc<dyn RecordStore + Send + Sync>;

/// An async trait describing byte-keyed, byte-valued storage of challenge
/// tokens. Backends must provide atomic upsert and delete-by-key so that
/// concurrent validations never require locks in the DNS-facing code.
#[async_trait::async_trait]
pub trait RecordStore {
    /// Retrieve the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if no value is stored under `key`, or
    /// [`Error::Store`] for a backend failure.
    async fn get(&self, key: &str) -> Result<Vec<u8>, Error>;

    /// Store `value` under `key`, overwriting any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), Error>;

    /// Delete the value stored under `key`. Deleting a key that does not
    /// exist is not an error.
    async fn delete(&self, key: &str) -> Result<(), Error>;

    /// Release the backend's resources.
    async fn close(&self) -> Result<(), Error>;
}

/// The set of selectable store backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    #[default]
    Sqlite,
    Postgres,
}

impl FromStr for StoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(StoreKind::Memory),
            "sqlite" => Ok(StoreKind::Sqlite),
            "postgres" => Ok(StoreKind::Postgres),
            other => Err(Error::Config(format!("unknown store type \"{other}\""))),
        }
    }
}

/// Construct and initialize the selected backend from its option mapping.
///
/// Backend-specific required options are validated and a liveness round trip
/// is performed before the store is considered ready; a backend that can't be
/// reached is fatal to startup.
///
/// # Errors
///
/// Returns [`Error::Config`] for missing or malformed options and
/// [`Error::Store`] when the backend can't be reached.
pub async fn init(
    kind: StoreKind,
    options: &HashMap<String, Value>,
) -> Result<DynRecordStore, Error> {
    tracing::debug!("initializing {kind:?} store");
    match kind {
        StoreKind::Memory => Ok(Arc::new(InMemoryStore::default())),
        StoreKind::Sqlite => Ok(Arc::new(SqliteStore::connect(options).await?)),
        StoreKind::Postgres => Ok(Arc::new(PostgresStore::connect(options).await?)),
    }
}

/// Decode a backend's option mapping into its typed option struct, the same
/// way each backend receives the generic JSON store config.
pub(crate) fn backend_options<T: serde::de::DeserializeOwned>(
    options: &HashMap<String, Value>,
) -> Result<T, Error> {
    Ok(serde_json::from_value(serde_json::to_value(options)?)?)
}
