//! Durable queue record on top of the key-value store.

use crate::domain::ConsentRequest;
use crate::ports::{KeyValueStore, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Persisted layout. The id counter is derived from the list on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedQueue {
    #[serde(default)]
    pub requests: Vec<ConsentRequest>,
}

/// Reads and writes the whole queue under one key.
pub struct QueueStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl QueueStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Load the persisted queue; empty when nothing was written yet.
    pub async fn load(&self) -> Result<Vec<ConsentRequest>, StoreError> {
        let Some(value) = self.store.get(&self.key).await? else {
            debug!(key = %self.key, "No persisted consent queue");
            return Ok(Vec::new());
        };
        let record: PersistedQueue = serde_json::from_value(value)?;
        Ok(record.requests)
    }

    /// Persist the full queue. Durable when this returns `Ok`.
    pub async fn save(&self, requests: &[ConsentRequest]) -> Result<(), StoreError> {
        let value = serde_json::to_value(PersistedQueue {
            requests: requests.to_vec(),
        })?;
        self.store.set(&self.key, value).await?;
        debug!(key = %self.key, len = requests.len(), "Consent queue persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStore;
    use crate::domain::{ConsentPayload, NewConsentRequest};
    use shared_types::AccountId;

    #[tokio::test]
    async fn test_load_empty() {
        let store = QueueStore::new(Arc::new(InMemoryStore::new()), "q");
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let backing = Arc::new(InMemoryStore::new());
        let store = QueueStore::new(backing.clone(), "q");
        let request =
            NewConsentRequest::new(AccountId::new("a"), ConsentPayload::Unlock).into_queued(3);

        store.save(&[request.clone()]).await.unwrap();

        let raw = backing.get("q").await.unwrap().unwrap();
        assert_eq!(raw["requests"][0]["id"], 3);
        assert_eq!(store.load().await.unwrap(), vec![request]);
    }

    #[tokio::test]
    async fn test_corrupt_record() {
        let backing = Arc::new(InMemoryStore::new());
        backing.set("q", serde_json::json!({ "requests": 5 })).await.unwrap();

        let store = QueueStore::new(backing, "q");
        assert!(matches!(store.load().await, Err(StoreError::Serialization(_))));
    }
}
