use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use super::extract::PeerAddr;
use crate::analytics::{coarse_location, forwarded_for};
use crate::events::{EventPublisher, LinkEvent};

/// Publish an `http` event for every request once its response is ready
pub async fn record_request(
    State(events): State<EventPublisher>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let url = request.uri().to_string();
    let ip = coarse_location(
        forwarded_for(request.headers()).as_deref(),
        PeerAddr::from_extensions(request.extensions())
            .ip_string()
            .as_deref(),
    );

    let response = next.run(request).await;

    events.publish(LinkEvent::Http {
        method,
        url,
        status: response.status().as_u16(),
        duration_ms: start.elapsed().as_millis() as u64,
        ip,
    });

    response
}
