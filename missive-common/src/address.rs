//! Recipient address validation.
//!
//! Addresses are accepted only as a bare `local@domain` mailbox; display-name
//! forms (`Name <a@b>`), angle-bracketed addresses and groups are rejected.
//! Accepted addresses are trimmed and lower-cased.

use std::fmt::{self, Display};

use mailparse::MailAddr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("Email address is required")]
    Empty,

    #[error("Email address could not be parsed: {0}")]
    Unparseable(String),

    #[error("Expected a single plain email address")]
    NotMailbox,

    #[error("Email address must contain a local part and a domain")]
    MissingAt,

    #[error("Invalid local part in email address")]
    InvalidLocalPart,

    #[error("Invalid domain in email address: {0}")]
    InvalidDomain(String),
}

/// A validated, normalised recipient address
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse and normalise an address
    ///
    /// # Errors
    ///
    /// Returns an [`AddressError`] describing why the input is not a plain mailbox.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(AddressError::NotMailbox);
        }

        let parsed =
            mailparse::addrparse(trimmed).map_err(|e| AddressError::Unparseable(e.to_string()))?;

        let [MailAddr::Single(single)] = parsed.as_slice() else {
            return Err(AddressError::NotMailbox);
        };

        if single.display_name.is_some() || single.addr != trimmed {
            return Err(AddressError::NotMailbox);
        }

        let Some((local, domain)) = trimmed.rsplit_once('@') else {
            return Err(AddressError::MissingAt);
        };

        validate_local_part(local)?;
        validate_domain(domain)?;

        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

fn validate_local_part(local: &str) -> Result<(), AddressError> {
    const SPECIALS: &str = "!#$%&'*+/=?^_`{|}~.-";

    if local.is_empty()
        || local.len() > 64
        || local.starts_with('.')
        || local.ends_with('.')
        || local.contains("..")
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || SPECIALS.contains(c))
    {
        return Err(AddressError::InvalidLocalPart);
    }

    Ok(())
}

fn validate_domain(domain: &str) -> Result<(), AddressError> {
    let invalid = || AddressError::InvalidDomain(domain.to_string());

    if domain.eq_ignore_ascii_case("localhost") {
        return Ok(());
    }

    if domain.is_empty() || domain.len() > 253 || !domain.contains('.') {
        return Err(invalid());
    }

    for label in domain.split('.') {
        if label.is_empty()
            || label.len() > 63
            || label.starts_with('-')
            || label.ends_with('-')
            || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(invalid());
        }
    }

    // Top-level domains are never all digits
    if domain
        .rsplit('.')
        .next()
        .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(invalid());
    }

    Ok(())
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_accepts_plain_addresses() {
        for addr in [
            "a@x.com",
            "first.last@example.org",
            "user+tag@sub.example.co.uk",
            "root@localhost",
        ] {
            assert!(EmailAddress::parse(addr).is_ok(), "{addr} should be accepted");
        }
    }

    #[test]
    fn test_normalises_case_and_whitespace() {
        let addr = EmailAddress::parse("  User@Example.COM ").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
        assert_eq!(addr.domain(), "example.com");
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        assert_eq!(EmailAddress::parse("   "), Err(AddressError::Empty));
        assert!(EmailAddress::parse("not-an-email").is_err());
        assert!(EmailAddress::parse("a@").is_err());
        assert!(EmailAddress::parse("@x.com").is_err());
        assert!(EmailAddress::parse("a@x").is_err());
        assert!(EmailAddress::parse("a..b@x.com").is_err());
        assert!(EmailAddress::parse("a@-x.com").is_err());
        assert!(EmailAddress::parse("a@x.123").is_err());
        assert!(EmailAddress::parse("a b@x.com").is_err());
    }

    #[test]
    fn test_rejects_display_names_and_lists() {
        assert!(EmailAddress::parse("Alice <a@x.com>").is_err());
        assert!(EmailAddress::parse("<a@x.com>").is_err());
        assert!(EmailAddress::parse("a@x.com,b@x.com").is_err());
    }

    #[test]
    fn test_try_from_string_validates() {
        let addr = EmailAddress::try_from("A@X.com".to_string()).unwrap();
        assert_eq!(String::from(addr), "a@x.com");
        assert!(EmailAddress::try_from("nope".to_string()).is_err());
    }
}
