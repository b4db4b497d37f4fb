use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::ServiceError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServiceError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message),
            ServiceError::CodeTaken => (
                StatusCode::CONFLICT,
                "shortcode already in use".to_string(),
            ),
            ServiceError::NotFound => (StatusCode::NOT_FOUND, "Shortcode not found".to_string()),
            ServiceError::Expired => (StatusCode::GONE, "Link expired".to_string()),
            ServiceError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
