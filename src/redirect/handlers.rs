use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::analytics::forwarded_for;
use crate::api::extract::PeerAddr;
use crate::error::ServiceError;
use crate::models::ClickContext;
use crate::service::LinkService;

pub struct RedirectState {
    pub service: Arc<LinkService>,
}

/// Redirect to the target URL, recording the click
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
    peer: PeerAddr,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let context = click_context(&headers, peer);
    let target = state.service.resolve(&code, context).await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, target)]).into_response())
}

fn click_context(headers: &HeaderMap, peer: PeerAddr) -> ClickContext {
    let referrer = headers
        .get(header::REFERER)
        .or_else(|| headers.get("referrer"))
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    ClickContext {
        referrer,
        forwarded_for: forwarded_for(headers),
        remote_addr: peer.ip_string(),
    }
}
