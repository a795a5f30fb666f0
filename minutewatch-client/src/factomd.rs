//! factomd adapter using the v2 JSON-RPC HTTP API.
//!
//! factomd exposes its API on port 8088 (`/v2`). The `current-minute`
//! method reports the leader height, the saved directory block height,
//! the minute inside the current block and the configured block length.
//!
//! ## Example
//!
//! ```rust,no_run
//! use minutewatch_client::{FactomdClient, MinuteSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FactomdClient::builder()
//!         .endpoint("http://localhost:8088/v2")
//!         .build()?;
//!
//!     let obs = client.current_minute().await?;
//!     println!("{}/{} (saved {})", obs.height, obs.minute, obs.committed_height);
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use minutewatch_types::Observation;

use crate::{MinuteSource, RpcError};

/// Public factomd open node.
pub const DEFAULT_ENDPOINT: &str = "https://api.factomd.net/v2";

const CURRENT_MINUTE: &str = "current-minute";

/// JSON-RPC client for a factomd node.
#[derive(Debug)]
pub struct FactomdClient {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl FactomdClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> FactomdClientBuilder {
        FactomdClientBuilder::default()
    }

    /// The URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<T>(&self, method: &'static str) -> Result<T, RpcError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RpcError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        let body = response.bytes().await?;
        decode_response(&body)
    }
}

#[async_trait]
impl MinuteSource for FactomdClient {
    async fn current_minute(&self) -> Result<Observation, RpcError> {
        self.call(CURRENT_MINUTE).await
    }
}

/// Builder for FactomdClient.
#[derive(Debug, Default)]
pub struct FactomdClientBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl FactomdClientBuilder {
    /// Set the API endpoint (e.g., "http://localhost:8088/v2").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the HTTP-level request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<FactomdClient, RpcError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Config(e.to_string()))?;

        Ok(FactomdClient {
            client,
            endpoint: self
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            next_id: AtomicU64::new(0),
        })
    }
}

/// Outgoing JSON-RPC 2.0 envelope. factomd accepts a missing `params`.
#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

fn decode_response<T>(body: &[u8]) -> Result<T, RpcError>
where
    T: for<'de> Deserialize<'de>,
{
    let response: RpcResponse<T> =
        serde_json::from_slice(body).map_err(|e| RpcError::Parse(e.to_string()))?;

    if let Some(err) = response.error {
        return Err(RpcError::Remote {
            code: err.code,
            message: err.message,
        });
    }

    response
        .result
        .ok_or_else(|| RpcError::Parse("response has neither result nor error".to_string()))
}
