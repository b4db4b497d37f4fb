use crate::models::{ClickRecord, LinkRecord};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// On-disk layout of the data file
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    urls: BTreeMap<String, LinkRecord>,
}

/// JSON file storage with whole-document rewrites.
///
/// The document is kept in memory behind a single lock. Each mutation is
/// written to a sibling temporary file, synced, and renamed over the data
/// file before the call returns; if any step fails the in-memory change is
/// rolled back, so memory and disk never diverge.
pub struct FileStorage {
    path: PathBuf,
    state: Mutex<Document>,
}

impl FileStorage {
    /// Load the data file at `path`. A missing file yields an empty store.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let document = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Document>(&bytes)
                .with_context(|| format!("Failed to parse data file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read data file {}", path.display()))
            }
        };

        info!(
            "Loaded {} short links from {}",
            document.urls.len(),
            path.display()
        );

        Ok(Self {
            path,
            state: Mutex::new(document),
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Durably replace the data file with `document`
    async fn persist(&self, document: &Document) -> Result<()> {
        let json = serde_json::to_vec_pretty(document).context("Failed to serialize links")?;
        let temp_path = self.temp_path();

        let result = self.replace_with(&temp_path, &json).await;
        if result.is_err() {
            let _ = fs::remove_file(&temp_path).await;
        }

        result
    }

    async fn replace_with(&self, temp_path: &Path, contents: &[u8]) -> Result<()> {
        let mut file = fs::File::create(temp_path)
            .await
            .with_context(|| format!("Failed to create {}", temp_path.display()))?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(temp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        self.sync_parent().await
    }

    /// Make the rename itself durable
    #[cfg(unix)]
    async fn sync_parent(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        fs::File::open(parent)
            .await?
            .sync_all()
            .await
            .with_context(|| format!("Failed to sync {}", parent.display()))
    }

    #[cfg(not(unix))]
    async fn sync_parent(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn init(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        if fs::try_exists(&self.path).await? {
            return Ok(());
        }

        let state = self.state.lock().await;
        self.persist(&state).await?;
        info!("Created data file {}", self.path.display());
        Ok(())
    }

    async fn get(&self, code: &str) -> Result<Option<LinkRecord>> {
        Ok(self.state.lock().await.urls.get(code).cloned())
    }

    async fn try_insert(&self, record: LinkRecord) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        if state.urls.contains_key(&record.code) {
            return Err(StorageError::Conflict);
        }

        let code = record.code.clone();
        state.urls.insert(code.clone(), record);

        if let Err(e) = self.persist(&state).await {
            state.urls.remove(&code);
            error!(short_code = %code, error = %e, "failed to persist new link");
            return Err(StorageError::Other(e));
        }

        debug!(short_code = %code, "persisted new link");
        Ok(())
    }

    async fn append_click(&self, code: &str, click: ClickRecord) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        let record = state.urls.get_mut(code).ok_or(StorageError::NotFound)?;
        record.clicks.push(click);

        if let Err(e) = self.persist(&state).await {
            if let Some(record) = state.urls.get_mut(code) {
                record.clicks.pop();
            }
            error!(short_code = %code, error = %e, "failed to persist click");
            return Err(StorageError::Other(e));
        }

        Ok(())
    }
}
