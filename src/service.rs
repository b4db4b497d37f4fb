use anyhow::anyhow;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::clock::{Clock, SystemClock};
use crate::error::ServiceError;
use crate::events::{EventPublisher, LinkEvent};
use crate::models::{ClickContext, CreatedLink, LinkRecord, LinkStats, NewLink};
use crate::shortcode::{
    self, validate_user_code, DEFAULT_CODE_LENGTH, MAX_CODE_LENGTH, MAX_GENERATION_ATTEMPTS,
    MIN_CODE_LENGTH,
};
use crate::storage::{Storage, StorageError};

/// Lifetime of a link when the caller does not ask for one
pub const DEFAULT_VALIDITY_MINUTES: i64 = 30;

/// Creates, resolves and reports on short links
pub struct LinkService {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    events: EventPublisher,
    code_length: usize,
}

impl LinkService {
    pub fn new(storage: Arc<dyn Storage>, events: EventPublisher) -> Self {
        Self {
            storage,
            clock: Arc::new(SystemClock),
            events,
            code_length: DEFAULT_CODE_LENGTH,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Length of generated codes, clamped to the valid code shape
    pub fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length.clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH);
        self
    }

    // stored timestamps carry millisecond precision
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(3)
    }

    /// Create a new short link
    pub async fn create(&self, request: NewLink) -> Result<CreatedLink, ServiceError> {
        validate_target(&request.url)?;

        let minutes = match request.validity_minutes {
            None => DEFAULT_VALIDITY_MINUTES,
            Some(m) if m > 0 => m,
            Some(_) => {
                return Err(ServiceError::InvalidInput(
                    "validity must be a positive integer (minutes)".to_string(),
                ))
            }
        };

        let preferred_code = request.preferred_code.filter(|c| !c.is_empty());
        if let Some(code) = &preferred_code {
            validate_user_code(code).map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
        }

        let created_at = self.now();
        let expiry = Duration::try_minutes(minutes)
            .and_then(|validity| created_at.checked_add_signed(validity))
            .ok_or_else(|| ServiceError::InvalidInput("validity is too large".to_string()))?;

        let record = |code: String| LinkRecord {
            code,
            target_url: request.url.clone(),
            created_at,
            expiry,
            clicks: Vec::new(),
        };

        let code = match preferred_code {
            // a taken code is reported, never swapped for a generated one
            Some(code) => {
                self.storage.try_insert(record(code.clone())).await?;
                code
            }
            None => self.insert_generated(record).await?,
        };

        info!(short_code = %code, expiry = %expiry, "created short link");
        self.events.publish(LinkEvent::Created {
            code: code.clone(),
            url: request.url,
            expiry,
        });

        Ok(CreatedLink { code, expiry })
    }

    async fn insert_generated(
        &self,
        record: impl Fn(String) -> LinkRecord,
    ) -> Result<String, ServiceError> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let code = shortcode::generate(self.storage.as_ref(), self.code_length).await?;
            match self.storage.try_insert(record(code.clone())).await {
                Ok(()) => return Ok(code),
                Err(StorageError::Conflict) => {
                    debug!(short_code = %code, "generated code taken by a concurrent insert, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Storage(anyhow!(
            "could not allocate a short code after {MAX_GENERATION_ATTEMPTS} attempts"
        )))
    }

    /// Resolve a code to its target, recording the click
    pub async fn resolve(&self, code: &str, context: ClickContext) -> Result<String, ServiceError> {
        let Some(record) = self.storage.get(code).await? else {
            debug!(short_code = %code, "short code not found");
            self.events.publish(LinkEvent::NotFound {
                code: code.to_string(),
            });
            return Err(ServiceError::NotFound);
        };

        let now = self.now();
        if record.is_expired_at(now) {
            debug!(short_code = %code, "short link expired");
            self.events.publish(LinkEvent::Expired {
                code: code.to_string(),
            });
            return Err(ServiceError::Expired);
        }

        self.storage
            .append_click(code, context.into_click(now))
            .await?;

        self.events.publish(LinkEvent::Redirect {
            code: code.to_string(),
            to: record.target_url.clone(),
        });

        Ok(record.target_url)
    }

    /// Full record and click history, expired or not
    pub async fn stats(&self, code: &str) -> Result<LinkStats, ServiceError> {
        self.storage
            .get(code)
            .await?
            .map(LinkStats::from)
            .ok_or(ServiceError::NotFound)
    }
}

fn validate_target(url: &str) -> Result<(), ServiceError> {
    Url::parse(url)
        .map(|_| ())
        .map_err(|_| ServiceError::InvalidInput("Invalid or missing url".to_string()))
}
