//! Error types for the missive-store crate.

use std::io;

use thiserror::Error;

use crate::{NotificationId, NotificationStatus};

/// Top-level store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O operation failed (file read/write/delete).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Record not found in the store.
    #[error("Notification not found: {0}")]
    NotFound(NotificationId),

    /// The stored record has already reached a terminal state.
    #[error("Notification {0} is already finalised")]
    AlreadyFinalised(NotificationId),

    /// An update tried to change a field that is fixed at creation.
    #[error("Notification {id}: {field} cannot be changed after creation")]
    ImmutableField {
        id: NotificationId,
        field: &'static str,
    },

    /// The store is configured with a capacity and it has been reached.
    #[error("Record store capacity exceeded: {used}/{capacity} records")]
    CapacityExceeded { used: usize, capacity: usize },

    /// Store directory validation failed.
    #[error("Store validation error: {0}")]
    Validation(#[from] PathValidationError),

    /// Internal error (lock poisoning, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serialization and deserialization errors.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("Bincode encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Bincode decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Store directory validation errors.
#[derive(Debug, Error)]
pub enum PathValidationError {
    #[error("Store path cannot contain '..' components: {0}")]
    ParentComponent(String),

    #[error("Store path must be absolute: {0}")]
    NotAbsolute(String),

    #[error("Store path cannot be in system directory {prefix}: {path}")]
    SystemDirectory { prefix: &'static str, path: String },

    #[error("Store path is not a directory: {0}")]
    NotDirectory(String),
}

/// A record was asked to move between states the lifecycle does not allow.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Cannot transition notification {id} from {from} to {to}")]
pub struct TransitionError {
    pub id: NotificationId,
    pub from: NotificationStatus,
    pub to: NotificationStatus,
}

/// Specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}

impl From<bincode::error::EncodeError> for StoreError {
    fn from(e: bincode::error::EncodeError) -> Self {
        Self::Serialization(e.into())
    }
}

impl From<bincode::error::DecodeError> for StoreError {
    fn from(e: bincode::error::DecodeError) -> Self {
        Self::Serialization(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let store_err: StoreError = io_err.into();
        assert!(matches!(store_err, StoreError::Io(_)));
        assert!(store_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_transition_error_display() {
        let id: NotificationId = "01ARZ3NDEKTSV4RRFFQ69G5FAV".parse().unwrap();
        let err = TransitionError {
            id,
            from: NotificationStatus::Sent,
            to: NotificationStatus::Failed,
        };
        assert_eq!(
            err.to_string(),
            "Cannot transition notification 01ARZ3NDEKTSV4RRFFQ69G5FAV from sent to failed"
        );
    }
}
