use axum::{routing::get, Router};
use std::sync::Arc;

use crate::service::LinkService;

use super::handlers::{redirect_url, RedirectState};

pub fn create_redirect_router(service: Arc<LinkService>) -> Router {
    let state = Arc::new(RedirectState { service });

    Router::new()
        .route("/{code}", get(redirect_url))
        .with_state(state)
}
