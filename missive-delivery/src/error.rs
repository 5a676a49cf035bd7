//! Error types for the missive-delivery crate.

use missive_store::{StoreError, TransitionError};
use thiserror::Error;

use crate::ValidationError;

/// Why a notification operation could not be completed
///
/// Transport failures are not errors at this level: they are recorded on the
/// failed record and reported through [`SendOutcome`](crate::SendOutcome).
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The request was rejected before any record was created.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The record store could not complete an operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A record was asked to make an illegal state transition.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The delivery task panicked or was cancelled by runtime shutdown.
    #[error("Delivery task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T, E = NotificationError> = std::result::Result<T, E>;
