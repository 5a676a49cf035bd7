//! HTTP API configuration

use serde::Deserialize;

/// Configuration for the HTTP API server
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Address to bind the API server
    ///
    /// Common values:
    /// - `[::]:8000` (IPv6 any address, port 8000)
    /// - `0.0.0.0:8000` (IPv4 any address, port 8000)
    /// - `127.0.0.1:8000` (localhost only, port 8000)
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Upper bound on handling one request, delivery included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_listen_address() -> String {
    "[::]:8000".to_string()
}

const fn default_request_timeout() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}
