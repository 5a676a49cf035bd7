//! Send request validation and normalisation

use std::{collections::BTreeMap, fmt};

use missive_common::address::{AddressError, EmailAddress};
use missive_store::NotificationContent;
use serde::{Deserialize, Serialize};

/// Longest subject accepted, in characters
pub const MAX_SUBJECT_CHARS: usize = 200;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const INVALID_EMAIL: &str = "Enter a valid email address.";

/// A send request as received from a caller
///
/// Fields are optional so that a missing field is reported alongside every
/// other problem instead of failing deserialization outright.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SendRequest {
    pub recipient_email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

impl SendRequest {
    pub fn new(
        recipient_email: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient_email: Some(recipient_email.into()),
            subject: Some(subject.into()),
            message: Some(message.into()),
        }
    }

    /// Validate and normalise into the content that is delivered and
    /// de-duplicated on
    ///
    /// Every field is trimmed and the recipient is lower-cased. Applying this
    /// to already-normalised input returns it unchanged.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] holding every field problem found.
    pub fn validate(&self) -> Result<NotificationContent, ValidationError> {
        let mut errors = ValidationError::default();

        let recipient = match present(self.recipient_email.as_deref()) {
            Ok(value) => match EmailAddress::parse(value) {
                Ok(address) => Some(address.into_inner()),
                Err(AddressError::Empty) => {
                    errors.add("recipient_email", BLANK);
                    None
                }
                Err(_) => {
                    errors.add("recipient_email", INVALID_EMAIL);
                    None
                }
            },
            Err(problem) => {
                errors.add("recipient_email", problem);
                None
            }
        };

        let subject = match present(self.subject.as_deref()) {
            Ok(value) if value.chars().count() > MAX_SUBJECT_CHARS => {
                errors.add(
                    "subject",
                    format!("Ensure this field has no more than {MAX_SUBJECT_CHARS} characters."),
                );
                None
            }
            Ok(value) => Some(value),
            Err(problem) => {
                errors.add("subject", problem);
                None
            }
        };

        let message = match present(self.message.as_deref()) {
            Ok(value) => Some(value),
            Err(problem) => {
                errors.add("message", problem);
                None
            }
        };

        match (recipient, subject, message) {
            (Some(recipient), Some(subject), Some(message)) => {
                Ok(NotificationContent::new(recipient, subject, message))
            }
            _ => Err(errors),
        }
    }
}

/// Trimmed value of a required, non-blank field
fn present(value: Option<&str>) -> Result<&str, &'static str> {
    match value.map(str::trim) {
        None => Err(REQUIRED),
        Some("") => Err(BLANK),
        Some(value) => Ok(value),
    }
}

/// Every problem found with a send request, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationError {
    errors: BTreeMap<&'static str, Vec<String>>,
}

impl ValidationError {
    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_default().push(message.into());
    }

    pub const fn errors(&self) -> &BTreeMap<&'static str, Vec<String>> {
        &self.errors
    }

    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invalid send request")?;

        let mut separator = ": ";
        for (field, messages) in &self.errors {
            for message in messages {
                write!(f, "{separator}{field}: {message}")?;
                separator = "; ";
            }
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}
