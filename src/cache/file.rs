use crate::cache::{StorageArea, StorageChange, change_feed, publish};
use crate::error::StorageError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, broadcast};

/// Storage area persisted as one JSON object on local disk.
///
/// Every write rewrites the file through a temporary sibling and a rename,
/// so a crash never leaves a half-written file behind.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
    changes: broadcast::Sender<StorageChange>,
}

impl FileStorage {
    /// Open the storage file, starting empty if it does not exist yet
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => Map::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };
        ::log::debug!("Opened storage {} with {} entries", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            changes: change_feed(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let encoded = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, encoded).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageArea for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        // Held across the write so concurrent sets persist in order
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        let old_value = next.insert(key.to_string(), value.clone());
        self.persist(&next).await?;
        *entries = next;
        drop(entries);

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
