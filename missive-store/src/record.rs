use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{NotificationId, TransitionError};

/// Failure description recorded when a transport reports an empty one
pub const UNKNOWN_TRANSPORT_ERROR: &str = "unknown transport error";

/// Lifecycle state of a notification record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Sent, Self::Failed];

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown notification status: {s}"))
    }
}

/// The fields a send request is de-duplicated on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationContent {
    pub recipient: String,
    pub subject: String,
    pub message: String,
}

impl NotificationContent {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            message: message.into(),
        }
    }
}

/// An auditable record of one delivery attempt
///
/// Records are only ever constructed `Pending`; [`mark_sent`](Self::mark_sent)
/// and [`mark_failed`](Self::mark_failed) are the only mutations and each
/// succeeds at most once per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    id: NotificationId,
    #[serde(rename = "recipient_email")]
    recipient: String,
    subject: String,
    message: String,
    status: NotificationStatus,
    #[serde(rename = "error_message")]
    error: Option<String>,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
}

impl NotificationRecord {
    /// Create a new pending record
    #[must_use]
    pub fn pending(
        id: NotificationId,
        content: NotificationContent,
        created_at: DateTime<Utc>,
    ) -> Self {
        let NotificationContent {
            recipient,
            subject,
            message,
        } = content;

        Self {
            id,
            recipient,
            subject,
            message,
            status: NotificationStatus::Pending,
            error: None,
            created_at,
            sent_at: None,
        }
    }

    /// Transition `Pending -> Sent`
    ///
    /// # Errors
    ///
    /// Returns a [`TransitionError`] if the record is not pending.
    pub fn mark_sent(&mut self, sent_at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_pending(NotificationStatus::Sent)?;
        self.status = NotificationStatus::Sent;
        self.sent_at = Some(sent_at);
        Ok(())
    }

    /// Transition `Pending -> Failed`, recording why
    ///
    /// # Errors
    ///
    /// Returns a [`TransitionError`] if the record is not pending.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.ensure_pending(NotificationStatus::Failed)?;

        let error = error.into();
        self.status = NotificationStatus::Failed;
        self.error = Some(if error.trim().is_empty() {
            UNKNOWN_TRANSPORT_ERROR.to_string()
        } else {
            error
        });
        Ok(())
    }

    const fn ensure_pending(&self, to: NotificationStatus) -> Result<(), TransitionError> {
        if matches!(self.status, NotificationStatus::Pending) {
            Ok(())
        } else {
            Err(TransitionError {
                id: self.id,
                from: self.status,
                to,
            })
        }
    }

    /// Exact, byte-for-byte comparison against the de-duplication fields
    pub fn matches(&self, content: &NotificationContent) -> bool {
        self.recipient == content.recipient
            && self.subject == content.subject
            && self.message == content.message
    }

    pub fn content(&self) -> NotificationContent {
        NotificationContent::new(&*self.recipient, &*self.subject, &*self.message)
    }

    pub const fn id(&self) -> NotificationId {
        self.id
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> NotificationStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }
}

impl Display for NotificationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({})", self.subject, self.recipient, self.status)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pending() -> NotificationRecord {
        NotificationRecord::pending(
            NotificationId::generate(),
            NotificationContent::new("a@x.com", "S", "M"),
            Utc::now(),
        )
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = pending();
        assert_eq!(record.status(), NotificationStatus::Pending);
        assert_eq!(record.error(), None);
        assert_eq!(record.sent_at(), None);
    }

    #[test]
    fn test_mark_sent_sets_timestamp() {
        let mut record = pending();
        let now = Utc::now();
        record.mark_sent(now).unwrap();

        assert_eq!(record.status(), NotificationStatus::Sent);
        assert_eq!(record.sent_at(), Some(now));
        assert_eq!(record.error(), None);
    }

    #[test]
    fn test_mark_failed_records_error() {
        let mut record = pending();
        record.mark_failed("SMTP timeout").unwrap();

        assert_eq!(record.status(), NotificationStatus::Failed);
        assert_eq!(record.error(), Some("SMTP timeout"));
        assert_eq!(record.sent_at(), None);
    }

    #[test]
    fn test_mark_failed_never_stores_empty_error() {
        let mut record = pending();
        record.mark_failed("  ").unwrap();
        assert_eq!(record.error(), Some(UNKNOWN_TRANSPORT_ERROR));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut sent = pending();
        sent.mark_sent(Utc::now()).unwrap();
        let err = sent.mark_failed("late failure").unwrap_err();
        assert_eq!(err.from, NotificationStatus::Sent);
        assert_eq!(err.to, NotificationStatus::Failed);
        assert!(sent.mark_sent(Utc::now()).is_err());
        assert_eq!(sent.error(), None);

        let mut failed = pending();
        failed.mark_failed("boom").unwrap();
        assert!(failed.mark_sent(Utc::now()).is_err());
        assert_eq!(failed.sent_at(), None);
        assert_eq!(failed.error(), Some("boom"));
    }

    #[test]
    fn test_matches_is_exact() {
        let record = pending();
        assert!(record.matches(&NotificationContent::new("a@x.com", "S", "M")));
        assert!(!record.matches(&NotificationContent::new("a@x.com", "S ", "M")));
        assert!(!record.matches(&NotificationContent::new("A@x.com", "S", "M")));
        assert!(!record.matches(&NotificationContent::new("a@x.com", "S", "m")));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("sent".parse::<NotificationStatus>(), Ok(NotificationStatus::Sent));
        assert_eq!("FAILED".parse::<NotificationStatus>(), Ok(NotificationStatus::Failed));
        assert!("delivered".parse::<NotificationStatus>().is_err());
    }

    #[test]
    fn test_display() {
        let record = pending();
        assert_eq!(record.to_string(), "S - a@x.com (pending)");
    }
}
