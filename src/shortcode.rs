//! Short code validation and generation

use crate::storage::Storage;
use anyhow::{anyhow, Result};
use thiserror::Error;

/// The 62 symbols a short code may contain
pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const MIN_CODE_LENGTH: usize = 4;
pub const MAX_CODE_LENGTH: usize = 20;
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Upper bound on candidates drawn for one generated code
pub const MAX_GENERATION_ATTEMPTS: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShortCodeError {
    #[error("shortcode must be {MIN_CODE_LENGTH}-{MAX_CODE_LENGTH} characters, got {0}")]
    Length(usize),
    #[error("shortcode must be alphanumeric")]
    Charset,
}

/// Check a caller-supplied code against the shape rules
pub fn validate_user_code(code: &str) -> Result<(), ShortCodeError> {
    let len = code.chars().count();
    if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&len) {
        return Err(ShortCodeError::Length(len));
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ShortCodeError::Charset);
    }

    Ok(())
}

/// Draw a random code of `length` symbols from the thread-local CSPRNG
pub fn random_code(length: usize) -> String {
    (0..length)
        .map(|_| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generate a code that is currently absent from `storage`.
///
/// This only keeps collisions unlikely; `Storage::try_insert` remains the
/// uniqueness gate.
pub async fn generate(storage: &dyn Storage, length: usize) -> Result<String> {
    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let code = random_code(length);
        if storage.get(&code).await?.is_none() {
            return Ok(code);
        }
        tracing::debug!(short_code = %code, "generated code collided, retrying");
    }

    Err(anyhow!(
        "no free short code after {MAX_GENERATION_ATTEMPTS} attempts"
    ))
}
