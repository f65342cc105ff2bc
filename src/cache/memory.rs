use crate::cache::{StorageArea, StorageChange, change_feed, publish};
use crate::error::StorageError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{RwLock, broadcast};

/// In-process storage area; contents are lost with the process
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, Value>>,
    changes: broadcast::Sender<StorageChange>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            changes: change_feed(),
        }
    }

    /// Number of live change subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageArea for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let old_value = {
            let mut entries = self.entries.write().await;
            entries.insert(key.to_string(), value.clone())
        };
        publish(
            &self.changes,
            StorageChange {
                key: key.to_string(),
                old_value,
                new_value: Some(value),
            },
        );
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
