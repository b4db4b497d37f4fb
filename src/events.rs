//! Best-effort lifecycle event log
//!
//! The service publishes events into a bounded channel and never waits on,
//! or learns about, their delivery. A background writer drains the channel
//! into an append-only JSON-lines file.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkEvent {
    Created {
        code: String,
        url: String,
        expiry: DateTime<Utc>,
    },
    Redirect {
        code: String,
        to: String,
    },
    NotFound {
        code: String,
    },
    Expired {
        code: String,
    },
    Http {
        method: String,
        url: String,
        status: u16,
        duration_ms: u64,
        ip: String,
    },
}

/// One line of the event log
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub event: LinkEvent,
}

/// Sending half of the event log. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: Option<mpsc::Sender<EventRecord>>,
}

impl EventPublisher {
    /// Create a publisher backed by a channel holding at most `buffer` events
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<EventRecord>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A publisher that drops every event
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queue an event without waiting. Dropped if the buffer is full or the
    /// writer is gone.
    pub fn publish(&self, event: LinkEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        let record = EventRecord {
            ts: Utc::now(),
            event,
        };

        match tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Event buffer full, dropping event"),
            Err(TrySendError::Closed(_)) => debug!("Event writer stopped, dropping event"),
        }
    }
}

/// Drains published events into an append-only JSON-lines file
pub struct EventLogWriter {
    receiver: mpsc::Receiver<EventRecord>,
    path: PathBuf,
    file: Option<File>,
}

impl EventLogWriter {
    pub fn new(receiver: mpsc::Receiver<EventRecord>, path: impl AsRef<Path>) -> Self {
        Self {
            receiver,
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }

    /// Run the writer on the tokio runtime until every publisher is dropped
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("Event log writer started: {}", self.path.display());

        while let Some(record) = self.receiver.recv().await {
            if let Err(e) = self.write(&record).await {
                warn!(error = %e, "failed to write event log entry");
                // reopen on the next event
                self.file = None;
            }
        }

        debug!("Event log writer stopped");
    }

    async fn write(&mut self, record: &EventRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let file = match self.file.take() {
            Some(file) => file,
            None => open_log(&self.path).await?,
        };
        let file = self.file.insert(file);

        file.write_all(&line).await?;
        file.flush().await
    }
}

async fn open_log(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    OpenOptions::new().create(true).append(true).open(path).await
}
