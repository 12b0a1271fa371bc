use crate::error::Error;
use crate::store::RecordStore;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A process-local [`RecordStore`] backend. Not durable across restarts.
#[derive(Default, Debug)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

#[async_trait::async_trait]
impl RecordStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        self.records
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        self.records
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.records.write().await.remove(key);
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}
