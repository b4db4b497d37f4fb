use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::models::{LinkStats, NewLink};
use crate::service::LinkService;

pub struct AppState {
    pub service: Arc<LinkService>,
    /// Prefix for returned short links; derived from the request when unset
    pub public_base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub url: Option<String>,
    /// `None` only when the field is absent; an explicit `null` is kept
    #[serde(default, deserialize_with = "present")]
    pub validity: Option<Value>,
    pub shortcode: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkResponse {
    pub short_link: String,
    pub expiry: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// Create a new short link
pub async fn create_url(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateLinkResponse>), ServiceError> {
    let Json(payload) = payload.map_err(|e| ServiceError::InvalidInput(e.body_text()))?;

    let url = payload
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ServiceError::InvalidInput("Invalid or missing url".to_string()))?;

    let validity_minutes = payload.validity.map(parse_validity).transpose()?;

    let created = state
        .service
        .create(NewLink {
            url,
            validity_minutes,
            preferred_code: payload.shortcode,
        })
        .await?;

    let base = match &state.public_base_url {
        Some(base) => base.trim_end_matches('/').to_string(),
        None => request_base_url(&headers),
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateLinkResponse {
            short_link: format!("{}/{}", base, created.code),
            expiry: created.expiry,
        }),
    ))
}

/// Click statistics for a short link
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<LinkStats>, ServiceError> {
    Ok(Json(state.service.stats(&code).await?))
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Accept whole numbers only; `5` and `5.0` are both five minutes
fn parse_validity(value: Value) -> Result<i64, ServiceError> {
    let invalid =
        || ServiceError::InvalidInput("validity must be a positive integer (minutes)".to_string());

    let Value::Number(number) = value else {
        return Err(invalid());
    };

    if let Some(minutes) = number.as_i64() {
        return Ok(minutes);
    }

    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(f as i64)
        }
        _ => Err(invalid()),
    }
}

fn request_base_url(headers: &HeaderMap) -> String {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let proto = header("x-forwarded-proto").unwrap_or("http");
    let host = header("host").unwrap_or("localhost");
    format!("{proto}://{host}")
}
