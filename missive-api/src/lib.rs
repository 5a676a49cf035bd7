//! JSON HTTP API over the notification service
//!
//! Mirrors the REST surface of the notification records:
//!
//! - `GET /api/notifications/` (optionally `?status=sent|failed|pending`)
//! - `GET /api/notifications/{id}/`
//! - `DELETE /api/notifications/{id}/`
//! - `POST /api/notifications/send/`
//! - `GET /api/notifications/statistics/`
//! - `GET /health/live`
//!
//! Every path is also served without its trailing slash.

mod config;
mod error;
mod handlers;
mod server;

pub use config::ApiConfig;
pub use error::ApiError;
pub use server::{ApiServer, router};
