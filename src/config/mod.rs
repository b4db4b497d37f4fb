use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::shortcode::{DEFAULT_CODE_LENGTH, MAX_CODE_LENGTH, MIN_CODE_LENGTH};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub events: EventsConfig,
    /// Allowed CORS origin for browser clients
    pub cors_origin: String,
    /// Prefix for returned short links; derived from the request when unset
    pub public_base_url: Option<String>,
    pub short_code_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_file: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    pub log_file: String,
    pub buffer_size: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "file".to_string())
            .to_lowercase()
            .as_str()
        {
            "file" => StorageBackend::File,
            "memory" => StorageBackend::Memory,
            other => {
                tracing::warn!(
                    "Unknown STORAGE_BACKEND '{other}', falling back to 'file'. Supported values: file, memory"
                );
                StorageBackend::File
            }
        };

        let data_file = std::env::var("DATA_FILE").unwrap_or_else(|_| "data/db.json".to_string());

        let log_file =
            std::env::var("EVENT_LOG_FILE").unwrap_or_else(|_| "logs/app.log".to_string());
        let buffer_size = parse_buffer_size(std::env::var("EVENT_BUFFER_SIZE").ok())?;

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .ok()
            .filter(|v| !v.is_empty());

        let short_code_length = std::env::var("SHORT_CODE_LENGTH")
            .ok()
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("SHORT_CODE_LENGTH must be a positive integer")?
            .unwrap_or(DEFAULT_CODE_LENGTH)
            .clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH);

        Ok(Config {
            server: ServerConfig { host, port },
            storage: StorageConfig { backend, data_file },
            events: EventsConfig {
                log_file,
                buffer_size,
            },
            cors_origin,
            public_base_url,
            short_code_length,
        })
    }
}

fn parse_buffer_size(value: Option<String>) -> anyhow::Result<usize> {
    let Some(value) = value else {
        return Ok(1024);
    };

    match value.parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => anyhow::bail!("EVENT_BUFFER_SIZE must be a positive integer, got '{value}'"),
    }
}
