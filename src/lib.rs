pub mod analytics;
pub mod api;
pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod redirect;
pub mod service;
pub mod shortcode;
pub mod storage;

pub use app::{create_app, AppOptions};
pub use error::ServiceError;
pub use service::LinkService;
