//! Error types for minute sources.

use thiserror::Error;

/// Errors that can occur while asking a node for its current minute.
///
/// Cloneable so the monitor can hand the same failure to every error
/// subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The node answered with a JSON-RPC error object.
    #[error("Node returned error {code}: {message}")]
    Remote {
        /// JSON-RPC error code.
        code: i64,
        /// Human readable message from the node.
        message: String,
    },

    /// Client could not be constructed.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

#[cfg(feature = "factomd")]
impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RpcError::Timeout
        } else if err.is_connect() {
            RpcError::Connection(err.to_string())
        } else if err.is_decode() {
            RpcError::Parse(err.to_string())
        } else if err.is_builder() {
            RpcError::Config(err.to_string())
        } else {
            RpcError::Http(err.to_string())
        }
    }
}
