//! Error types for the monitor.

use std::time::Duration;

use minutewatch_client::RpcError;
use thiserror::Error;

/// A single failed poll, delivered to error subscribers.
///
/// The poller does not distinguish causes; every variant is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PollError {
    /// The source returned an error.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The request did not finish within the configured timeout.
    #[error("request exceeded deadline of {0:?}")]
    Deadline(Duration),
}

/// Errors that prevent a monitor from being created.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The initial request failed, so there is no position to start from.
    #[error("initial request failed: {0}")]
    Seed(#[source] PollError),

    /// Configuration is not usable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The default HTTP client could not be built.
    #[error("failed to build client: {0}")]
    Client(#[source] RpcError),
}
