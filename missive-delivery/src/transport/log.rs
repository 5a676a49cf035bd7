use async_trait::async_trait;
use missive_common::outgoing;

use super::{MailTransport, TransportError};

/// Transport that only logs what it would have sent
///
/// Every delivery succeeds. Meant for development setups without an SMTP relay.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn deliver(
        &self,
        recipient: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), TransportError> {
        outgoing!(
            level = INFO,
            "Would send {} bytes to {recipient} with subject {subject:?}",
            message.len()
        );
        Ok(())
    }
}
