//! # minutewatch-client
//!
//! Sources for the `current-minute` call that the minutewatch monitor polls.
//!
//! The monitor only needs something that can answer "where is the chain
//! right now?". That contract is the [`MinuteSource`] trait; this crate
//! provides the trait, its error type, and an HTTP implementation that
//! talks to a factomd node's v2 JSON-RPC API.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use minutewatch_client::{FactomdClient, MinuteSource};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FactomdClient::builder()
//!         .endpoint("https://api.factomd.net/v2")
//!         .timeout(Duration::from_secs(5))
//!         .build()?;
//!
//!     let observation = client.current_minute().await?;
//!     println!(
//!         "height {} minute {}",
//!         observation.height,
//!         observation.normalized_minute()
//!     );
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;

pub mod error;

#[cfg(feature = "factomd")]
pub mod factomd;

pub use error::RpcError;

#[cfg(feature = "factomd")]
pub use factomd::{FactomdClient, FactomdClientBuilder, DEFAULT_ENDPOINT};

// Re-export types for convenience
pub use minutewatch_types::{MinuteEvent, Observation, Position};

/// Anything that can report the node's current height and minute.
///
/// Implementations issue one logical request per call. Callers bound the
/// call with their own deadline, so implementations must be cancel-safe:
/// dropping the returned future abandons the request.
#[async_trait]
pub trait MinuteSource: Send + Sync {
    /// Fetch the current position of the chain.
    async fn current_minute(&self) -> Result<Observation, RpcError>;
}

#[async_trait]
impl<S: MinuteSource + ?Sized> MinuteSource for std::sync::Arc<S> {
    async fn current_minute(&self) -> Result<Observation, RpcError> {
        (**self).current_minute().await
    }
}
