//! Mail transports
//!
//! A transport is a black box that either accepts a message or reports why it
//! did not. The failure description ([`TransportError`]'s display string) is
//! stored verbatim on the failed record.

mod log;
mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use self::log::LogTransport;
pub use smtp::{SmtpConfig, SmtpTransport, TlsMode};

/// Why a transport did not accept a message
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered and refused the message.
    #[error("{0}")]
    Rejected(String),

    /// No conversation with the server could be completed.
    #[error("{0}")]
    Connection(String),

    /// The transport gave up waiting.
    #[error("{0}")]
    Timeout(String),

    /// The message could not be built (e.g. an address the transport rejects).
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The transport itself is misconfigured.
    #[error("Transport configuration error: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait MailTransport: Send + Sync + std::fmt::Debug {
    /// Hand one message to the transport
    async fn deliver(
        &self,
        recipient: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), TransportError>;
}

/// Runtime selection of the mail transport
///
/// ```ron
/// Missive (
///     transport: Smtp((
///         host: "smtp.example.com",
///         from: "noreply@example.com",
///     )),
/// )
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub enum TransportConfig {
    Smtp(SmtpConfig),
    /// Log messages instead of sending them (development)
    #[default]
    Log,
}

impl TransportConfig {
    /// Build the configured transport
    ///
    /// # Errors
    /// Returns an error if the SMTP configuration is invalid.
    pub fn into_transport(self) -> Result<Arc<dyn MailTransport>, TransportError> {
        Ok(match self {
            Self::Smtp(config) => Arc::new(SmtpTransport::new(&config)?),
            Self::Log => Arc::new(LogTransport),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_descriptions_are_verbatim() {
        assert_eq!(
            TransportError::Timeout("SMTP timeout".to_string()).to_string(),
            "SMTP timeout"
        );
        assert_eq!(
            TransportError::Rejected("550 User unknown".to_string()).to_string(),
            "550 User unknown"
        );
    }

    #[test]
    fn test_parse_transport_config() {
        let config: TransportConfig = ron::from_str("Log").unwrap();
        assert!(matches!(config, TransportConfig::Log));

        let config: TransportConfig = ron::from_str(
            r#"Smtp((host: "smtp.example.com", from: "noreply@example.com", tls: Tls))"#,
        )
        .unwrap();
        let TransportConfig::Smtp(smtp) = config else {
            panic!("expected SMTP config");
        };
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.tls, TlsMode::Tls);
        assert_eq!(smtp.port(), 465);
    }

    #[tokio::test]
    async fn test_log_transport_accepts_everything() {
        let transport = TransportConfig::Log.into_transport().unwrap();
        assert!(transport.deliver("a@x.com", "S", "M").await.is_ok());
    }
}
