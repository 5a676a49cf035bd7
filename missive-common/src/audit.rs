//! Audit logging for notification lifecycle events
//!
//! Every state change of a notification record is emitted as a structured
//! `tracing` event so that the record store is not the only trail of what
//! happened. Recipient addresses can be redacted through [`AuditConfig`].
//!
//! ## Audit Events
//!
//! - `NotificationCreated`: a pending record was created for a new send
//! - `NotificationSent`: the transport accepted the message
//! - `NotificationFailed`: the transport rejected the message
//! - `DuplicateSuppressed`: a send matched an already-sent record
//! - `NotificationDeleted`: a record was removed on request

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging for notification lifecycle events
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Redact recipient email addresses from audit logs (PII protection)
    #[serde(default)]
    pub redact_recipients: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redact_recipients: false,
        }
    }
}

const fn default_true() -> bool {
    true
}

static AUDIT_CONFIG: OnceLock<Arc<AuditConfig>> = OnceLock::new();

/// Initialize audit logging with configuration
///
/// Only the first call takes effect.
pub fn init(config: AuditConfig) {
    AUDIT_CONFIG.get_or_init(|| Arc::new(config));
}

/// Get the current audit configuration
#[must_use]
pub fn config() -> Arc<AuditConfig> {
    AUDIT_CONFIG
        .get()
        .cloned()
        .unwrap_or_else(|| Arc::new(AuditConfig::default()))
}

/// Redact email address if redaction is enabled
#[must_use]
pub fn redact_email(email: &str, redact: bool) -> String {
    if redact {
        // Keep domain but redact local part
        if let Some((_, domain)) = email.split_once('@') {
            format!("[REDACTED]@{domain}")
        } else {
            "[REDACTED]".to_string()
        }
    } else {
        email.to_string()
    }
}

fn enabled_recipient(recipient: &str) -> Option<String> {
    let config = config();
    config
        .enabled
        .then(|| redact_email(recipient, config.redact_recipients))
}

pub fn log_notification_created(notification_id: &str, recipient: &str, subject_len: usize) {
    let Some(recipient) = enabled_recipient(recipient) else {
        return;
    };

    tracing::event!(
        tracing::Level::INFO,
        event = "NotificationCreated",
        notification_id = %notification_id,
        recipient = %recipient,
        subject_len = subject_len,
        "Audit: Notification created"
    );
}

pub fn log_notification_sent(notification_id: &str, recipient: &str, duration_ms: u128) {
    let Some(recipient) = enabled_recipient(recipient) else {
        return;
    };

    tracing::event!(
        tracing::Level::INFO,
        event = "NotificationSent",
        notification_id = %notification_id,
        recipient = %recipient,
        duration_ms = duration_ms,
        "Audit: Notification sent"
    );
}

pub fn log_notification_failed(notification_id: &str, recipient: &str, error: &str) {
    let Some(recipient) = enabled_recipient(recipient) else {
        return;
    };

    tracing::event!(
        tracing::Level::WARN,
        event = "NotificationFailed",
        notification_id = %notification_id,
        recipient = %recipient,
        error = %error,
        "Audit: Notification failed"
    );
}

pub fn log_duplicate_suppressed(notification_id: &str, recipient: &str) {
    let Some(recipient) = enabled_recipient(recipient) else {
        return;
    };

    tracing::event!(
        tracing::Level::INFO,
        event = "DuplicateSuppressed",
        notification_id = %notification_id,
        recipient = %recipient,
        "Audit: Duplicate notification suppressed"
    );
}

pub fn log_notification_deleted(notification_id: &str) {
    if !config().enabled {
        return;
    }

    tracing::event!(
        tracing::Level::INFO,
        event = "NotificationDeleted",
        notification_id = %notification_id,
        "Audit: Notification deleted"
    );
}
