use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::service::LinkService;

use super::handlers::{create_url, get_stats, health_check, AppState};

pub fn create_api_router(service: Arc<LinkService>, public_base_url: Option<String>) -> Router {
    let state = Arc::new(AppState {
        service,
        public_base_url,
    });

    Router::new()
        .route("/health", get(health_check))
        .route("/shorturls", post(create_url))
        .route("/shorturls/{code}", get(get_stats))
        .with_state(state)
}
