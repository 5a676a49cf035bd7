//! Duplicate detection and delivery orchestration for notifications
//!
//! This crate provides:
//! - [`DuplicateDetector`]: finds an already-sent record with identical content
//! - [`NotificationService`]: validates, de-duplicates, delivers and records sends
//! - [`MailTransport`]: the seam to the outside world, with SMTP and log-only
//!   implementations

mod detector;
mod error;
mod service;
mod stats;
pub mod transport;
mod validation;

pub use detector::DuplicateDetector;
pub use error::NotificationError;
pub use missive_store::{NotificationContent, NotificationRecord, NotificationStatus};
pub use service::{DeliveryConfig, NotificationService, SendOutcome};
pub use stats::Statistics;
pub use transport::{
    LogTransport, MailTransport, SmtpConfig, SmtpTransport, TlsMode, TransportConfig,
    TransportError,
};
pub use validation::{MAX_SUBJECT_CHARS, SendRequest, ValidationError};
