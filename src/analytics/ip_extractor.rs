//! Coarse click origin extraction
//!
//! The origin recorded for a click is a literal address string, never
//! geolocated:
//! - first hop of `X-Forwarded-For` when present
//! - otherwise the socket remote address
//! - any IPv6-mapped-IPv4 prefix (`::ffff:`) is stripped
//!
//! Forwarding headers are client-controlled and not validated against any
//! trusted proxy list, so the result is spoofable.

use axum::http::HeaderMap;

/// Location recorded when neither a forwarding header nor a peer address is known
pub const UNKNOWN_LOCATION: &str = "unknown";

const MAPPED_IPV4_PREFIX: &str = "::ffff:";

/// Raw `X-Forwarded-For` value, if it is present and valid UTF-8
pub fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

/// Derive the coarse origin string for a click
pub fn coarse_location(forwarded_for: Option<&str>, remote_addr: Option<&str>) -> String {
    let raw = forwarded_for
        .filter(|v| !v.trim().is_empty())
        .or(remote_addr)
        .unwrap_or(UNKNOWN_LOCATION);

    let first_hop = raw.split(',').next().unwrap_or(raw).trim();

    let location = first_hop
        .strip_prefix(MAPPED_IPV4_PREFIX)
        .unwrap_or(first_hop);

    if location.is_empty() {
        UNKNOWN_LOCATION.to_string()
    } else {
        location.to_string()
    }
}
