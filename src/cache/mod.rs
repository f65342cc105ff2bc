pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;
use crate::results::PolicyRecord;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

/// One changed key, with the value before and after the write
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// A flat async key/value store with change notifications
#[async_trait]
pub trait StorageArea: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Subscribe to changes made after this call
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Sender half shared by the storage implementations
pub(crate) fn change_feed() -> broadcast::Sender<StorageChange> {
    let (tx, _) = broadcast::channel(128);
    tx
}

pub(crate) fn publish(feed: &broadcast::Sender<StorageChange>, change: StorageChange) {
    // No subscribers is not an error
    let _ = feed.send(change);
}

/// Domain -> PolicyRecord mapping over a storage area
#[derive(Clone)]
pub struct PolicyCache {
    storage: Arc<dyn StorageArea>,
}

impl PolicyCache {
    pub fn new(storage: Arc<dyn StorageArea>) -> Self {
        Self { storage }
    }

    /// Read the record for `domain`.
    ///
    /// Storage failures and undecodable values are logged and read as a miss.
    pub async fn get(&self, domain: &str) -> Option<PolicyRecord> {
        if domain.is_empty() {
            return None;
        }

        let value = match self.storage.get(domain).await {
            Ok(value) => value?,
            Err(e) => {
                ::log::error!("Error getting privacy content for {}: {}", domain, e);
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                ::log::warn!("Ignoring undecodable cache entry for {}: {}", domain, e);
                None
            }
        }
    }

    /// Overwrite the record for `domain` (last write wins)
    pub async fn upsert(&self, domain: &str, record: &PolicyRecord) -> Result<(), StorageError> {
        if domain.is_empty() {
            return Err(StorageError::EmptyKey);
        }
        let value = serde_json::to_value(record)?;
        self.storage.set(domain, value).await?;
        ::log::info!("Stored privacy policy for {} ({})", domain, record.url);
        Ok(())
    }

    /// Subscribe to record changes
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.storage.subscribe()
    }
}

/// Decode the new value of a change as a record, if it is one
pub fn changed_record(change: &StorageChange) -> Option<PolicyRecord> {
    change
        .new_value
        .clone()
        .and_then(|value| serde_json::from_value(value).ok())
}
