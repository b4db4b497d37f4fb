use crate::models::{ClickRecord, LinkRecord};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error("short code not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence for link records keyed by short code.
///
/// All operations on one store are serialized against each other, so a
/// `try_insert` racing another `try_insert` for the same code has exactly one
/// winner and concurrent `append_click` calls never lose an update.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (load or create the backing state)
    async fn init(&self) -> Result<()>;

    /// Get a link record by short code
    async fn get(&self, code: &str) -> Result<Option<LinkRecord>>;

    /// Insert a record unless its code is already taken
    async fn try_insert(&self, record: LinkRecord) -> StorageResult<()>;

    /// Append a click to the end of a record's click log
    async fn append_click(&self, code: &str, click: ClickRecord) -> StorageResult<()>;
}
