use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions},
};
use std::convert::Infallible;
use std::net::SocketAddr;

/// Socket peer of the request, when the server was started with connect info
#[derive(Debug, Clone, Copy)]
pub struct PeerAddr(pub Option<SocketAddr>);

impl PeerAddr {
    pub fn from_extensions(extensions: &Extensions) -> Self {
        Self(
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        )
    }

    /// Peer IP as text, e.g. `127.0.0.1` or `::ffff:127.0.0.1`
    pub fn ip_string(&self) -> Option<String> {
        self.0.map(|addr| addr.ip().to_string())
    }
}

impl<S> FromRequestParts<S> for PeerAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_extensions(&parts.extensions))
    }
}
