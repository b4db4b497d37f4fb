//! Click analytics helpers
//!
//! Clicks are stored raw on their link record; this module only derives the
//! request-side fields recorded with each click.

pub mod ip_extractor;

pub use ip_extractor::{coarse_location, forwarded_for};
