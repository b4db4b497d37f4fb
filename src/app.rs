use axum::{
    http::{HeaderValue, Method},
    middleware, Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::api::{self, middleware::record_request};
use crate::events::EventPublisher;
use crate::redirect;
use crate::service::LinkService;

/// Settings for the outer HTTP surface
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub cors_origin: Option<String>,
    pub public_base_url: Option<String>,
}

/// Full router: API, redirects, request events, CORS and tracing
pub fn create_app(service: Arc<LinkService>, events: EventPublisher, options: AppOptions) -> Router {
    let api_router = api::create_api_router(Arc::clone(&service), options.public_base_url);
    let redirect_router = redirect::create_redirect_router(service);

    let origin = match options
        .cors_origin
        .as_deref()
        .map(HeaderValue::from_str)
        .transpose()
    {
        Ok(Some(origin)) => AllowOrigin::exact(origin),
        Ok(None) => AllowOrigin::any(),
        Err(e) => {
            tracing::warn!(error = %e, "invalid CORS origin, allowing none");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .merge(api_router)
        .merge(redirect_router)
        .layer(middleware::from_fn_with_state(events, record_request))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
