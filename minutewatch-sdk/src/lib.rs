//! # minutewatch-sdk
//!
//! Follow a factomd node's block height and minute from inside your
//! process, and let any number of independent consumers react to changes
//! without each running its own polling loop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use minutewatch_sdk::Monitor;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Seeds the position with one request; fails if the node is down
//!     let monitor = Monitor::builder()
//!         .url("https://api.factomd.net/v2")
//!         .interval(Duration::from_secs(1))
//!         .connect()
//!         .await?;
//!
//!     println!("starting at {:?}", monitor.current_position());
//!
//!     let mut heights = monitor.subscribe_heights();
//!     let mut errors = monitor.subscribe_errors();
//!
//!     tokio::spawn(async move {
//!         while let Some(err) = errors.recv().await {
//!             eprintln!("poll failed: {err}");
//!         }
//!     });
//!
//!     while let Some(height) = heights.recv().await {
//!         println!("new block {height}");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **One poller, many subscribers**: minute events, heights, committed
//!   heights and errors each get their own channel kind
//! - **Never blocks**: slow subscribers lose events instead of stalling the poller
//! - **Adaptive polling**: once minutes arrive on schedule, requests drop to
//!   about one per minute boundary
//! - **Clean shutdown**: `stop()` is idempotent and cancels in-flight requests

mod broadcast;
mod config;
mod error;
mod lifecycle;
mod monitor;
mod poller;
mod state;

pub use config::{BufferSizes, MonitorConfig, RetryPolicy, DEFAULT_URL};
pub use error::{MonitorError, PollError};
pub use monitor::{Monitor, MonitorBuilder};
pub use state::{classify, Progress, Transition};

// Re-export types for convenience
pub use minutewatch_client::{MinuteSource, RpcError};
pub use minutewatch_types::{MinuteEvent, Observation, Position};
