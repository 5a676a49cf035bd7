use std::{fmt, time::Duration};

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use missive_common::outgoing;
use serde::Deserialize;

use super::{MailTransport, TransportError};

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum TlsMode {
    /// Plain text (local relays and test servers only)
    None,
    /// Upgrade with STARTTLS (submission port)
    #[default]
    StartTls,
    /// Implicit TLS from the first byte
    Tls,
}

impl TlsMode {
    const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::StartTls => 587,
            Self::Tls => 465,
        }
    }
}

/// SMTP relay configuration
#[derive(Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,

    /// Defaults to the conventional port for the TLS mode
    #[serde(default)]
    pub port: Option<u16>,

    /// Sender address for every notification
    pub from: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub tls: TlsMode,

    /// Upper bound on one delivery, connection included
    ///
    /// Default: 30 seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

const fn default_timeout() -> u64 {
    30
}

impl SmtpConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.tls.default_port())
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port())
            .field("from", &self.from)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("tls", &self.tls)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Delivers notifications through an SMTP relay
#[derive(Clone)]
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    timeout: Duration,
}

impl fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("from", &self.from.to_string())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SmtpTransport {
    /// Build a transport from configuration
    ///
    /// No connection is made until the first delivery.
    ///
    /// # Errors
    /// Returns [`TransportError::Configuration`] for an unusable sender
    /// address, host or credential combination.
    pub fn new(config: &SmtpConfig) -> Result<Self, TransportError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| TransportError::Configuration(format!("Invalid from address: {e}")))?;

        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some((username, password)),
            (None, None) => None,
            _ => {
                return Err(TransportError::Configuration(
                    "SMTP username and password must be set together".to_string(),
                ));
            }
        };

        let builder = match config.tls {
            TlsMode::None => {
                Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host))
            }
            TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host),
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host),
        }
        .map_err(|e| TransportError::Configuration(e.to_string()))?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let mut builder = builder.port(config.port()).timeout(Some(timeout));

        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
            timeout,
        })
    }

    fn build_message(
        &self,
        recipient: &str,
        subject: &str,
        message: &str,
    ) -> Result<Message, TransportError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| TransportError::InvalidMessage(format!("Invalid recipient: {e}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.to_string())
            .map_err(|e| TransportError::InvalidMessage(e.to_string()))
    }
}

fn classify(error: &lettre::transport::smtp::Error) -> TransportError {
    let description = error.to_string();

    if error.is_timeout() {
        TransportError::Timeout(description)
    } else if error.is_permanent() || error.is_transient() {
        TransportError::Rejected(description)
    } else {
        TransportError::Connection(description)
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    #[tracing::instrument(level = "debug", skip(self, message), fields(message_len = message.len()))]
    async fn deliver(
        &self,
        recipient: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), TransportError> {
        let email = self.build_message(recipient, subject, message)?;

        let response = tokio::time::timeout(self.timeout, self.mailer.send(email))
            .await
            .map_err(|_| {
                TransportError::Timeout(format!(
                    "SMTP timeout after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| classify(&e))?;

        outgoing!(
            level = DEBUG,
            "SMTP relay accepted message for {recipient}: {} {}",
            response.code(),
            response.message().collect::<Vec<_>>().join(" ")
        );

        Ok(())
    }
}
