use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::ip_extractor::coarse_location;

/// Referrer recorded when the request carries none.
pub const DIRECT_REFERRER: &str = "direct";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub code: String,
    #[serde(rename = "url")]
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
    #[serde(default)]
    pub clicks: Vec<ClickRecord>,
}

impl LinkRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickRecord {
    pub at: DateTime<Utc>,
    pub referrer: String,
    pub location: String,
}

/// Request-side facts captured for a redirect, before they are turned into a
/// [`ClickRecord`].
///
/// `forwarded_for` is taken verbatim from the client and is not
/// authenticated. The derived location must never feed a security decision.
#[derive(Debug, Clone, Default)]
pub struct ClickContext {
    pub referrer: Option<String>,
    pub forwarded_for: Option<String>,
    pub remote_addr: Option<String>,
}

impl ClickContext {
    pub fn into_click(self, at: DateTime<Utc>) -> ClickRecord {
        let location = coarse_location(self.forwarded_for.as_deref(), self.remote_addr.as_deref());
        let referrer = self
            .referrer
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DIRECT_REFERRER.to_string());

        ClickRecord {
            at,
            referrer,
            location,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewLink {
    pub url: String,
    pub validity_minutes: Option<i64>,
    pub preferred_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedLink {
    pub code: String,
    pub expiry: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStats {
    pub shortcode: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
    pub total_clicks: usize,
    pub clicks: Vec<ClickRecord>,
}

impl From<LinkRecord> for LinkStats {
    fn from(record: LinkRecord) -> Self {
        Self {
            shortcode: record.code,
            original_url: record.target_url,
            created_at: record.created_at,
            expiry: record.expiry,
            total_clicks: record.clicks.len(),
            clicks: record.clicks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expiry: DateTime<Utc>) -> LinkRecord {
        LinkRecord {
            code: "abcd".to_string(),
            target_url: "https://example.com".to_string(),
            created_at: expiry - Duration::minutes(30),
            expiry,
            clicks: vec![],
        }
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let expiry = Utc::now();
        let link = record(expiry);

        assert!(!link.is_expired_at(expiry - Duration::milliseconds(1)));
        assert!(!link.is_expired_at(expiry));
        assert!(link.is_expired_at(expiry + Duration::milliseconds(1)));
    }

    #[test]
    fn test_click_defaults_to_direct_referrer() {
        let at = Utc::now();
        let click = ClickContext {
            referrer: None,
            forwarded_for: None,
            remote_addr: Some("::ffff:10.0.0.7".to_string()),
        }
        .into_click(at);

        assert_eq!(click.at, at);
        assert_eq!(click.referrer, "direct");
        assert_eq!(click.location, "10.0.0.7");
    }

    #[test]
    fn test_record_serializes_with_original_field_names() {
        let link = record(Utc::now());
        let value = serde_json::to_value(&link).unwrap();

        assert_eq!(value["url"], "https://example.com");
        assert!(value.get("createdAt").is_some());
        assert!(value["clicks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_stats_counts_clicks() {
        let mut link = record(Utc::now());
        link.clicks.push(ClickContext::default().into_click(Utc::now()));

        let stats = LinkStats::from(link);
        assert_eq!(stats.total_clicks, 1);
        assert_eq!(stats.clicks[0].location, "unknown");

        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["totalClicks"], 1);
        assert_eq!(value["originalUrl"], "https://example.com");
    }
}
