use crate::storage::StorageError;
use thiserror::Error;

/// Outcome of a failed link operation
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("shortcode already in use")]
    CodeTaken,
    #[error("shortcode not found")]
    NotFound,
    #[error("link expired")]
    Expired,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => ServiceError::CodeTaken,
            StorageError::NotFound => ServiceError::NotFound,
            StorageError::Other(e) => ServiceError::Storage(e),
        }
    }
}
