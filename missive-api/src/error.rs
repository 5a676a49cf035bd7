//! API server error types

use thiserror::Error;

/// Errors that can occur running the API server
///
/// Failures of individual requests are answered with a JSON body and never
/// surface here.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failed to bind to the specified address
    #[error("Failed to bind API server to {address}: {source}")]
    BindError {
        address: String,
        source: std::io::Error,
    },

    /// API server encountered a runtime error
    #[error("API server error: {0}")]
    ServerError(String),
}
