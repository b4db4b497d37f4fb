use crate::models::{ClickRecord, LinkRecord};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Volatile storage guarded by a single lock. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
    links: Mutex<HashMap<String, LinkRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, code: &str) -> Result<Option<LinkRecord>> {
        Ok(self.links.lock().await.get(code).cloned())
    }

    async fn try_insert(&self, record: LinkRecord) -> StorageResult<()> {
        let mut links = self.links.lock().await;
        if links.contains_key(&record.code) {
            return Err(StorageError::Conflict);
        }

        links.insert(record.code.clone(), record);
        Ok(())
    }

    async fn append_click(&self, code: &str, click: ClickRecord) -> StorageResult<()> {
        let mut links = self.links.lock().await;
        let record = links.get_mut(code).ok_or(StorageError::NotFound)?;
        record.clicks.push(click);
        Ok(())
    }
}
