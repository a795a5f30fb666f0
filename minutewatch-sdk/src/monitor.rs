//! The main Monitor type: construction, subscriptions and shutdown.

use std::sync::Arc;
use std::time::Duration;

use minutewatch_client::{FactomdClient, MinuteSource};
use minutewatch_types::{MinuteEvent, Observation, Position};
use parking_lot::Mutex;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tracing::info;

use crate::broadcast::Broadcaster;
use crate::config::{BufferSizes, MonitorConfig, RetryPolicy};
use crate::error::{MonitorError, PollError};
use crate::lifecycle::Shutdown;
use crate::poller::Poller;
use crate::state::PositionTracker;

/// State shared between the handle and the background poller.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) tracker: PositionTracker,
    pub(crate) broadcaster: Broadcaster,
    pub(crate) shutdown: Shutdown,
}

/// Follows a factomd node and notifies subscribers as it advances.
///
/// Construction performs one request to seed the position and fails if
/// that request fails. A background task then polls the node until
/// [`stop`](Monitor::stop) is called or the monitor is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use minutewatch_sdk::Monitor;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let monitor = Monitor::builder()
///         .url("http://localhost:8088/v2")
///         .interval(Duration::from_millis(500))
///         .connect()
///         .await?;
///
///     let mut minutes = monitor.subscribe_minutes();
///     while let Some(event) = minutes.recv().await {
///         println!("block {} minute {}", event.height, event.minute);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Monitor {
    shared: Arc<Shared>,
    config: MonitorConfig,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Monitor {
    /// Connect to `url` with default settings.
    pub async fn connect(url: impl Into<String>) -> Result<Self, MonitorError> {
        Self::builder().url(url).connect().await
    }

    /// Create a builder for configuring the monitor.
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    async fn start(config: MonitorConfig, source: Arc<dyn MinuteSource>) -> Result<Self, MonitorError> {
        let seed = match tokio::time::timeout(config.timeout, source.current_minute()).await {
            Ok(Ok(obs)) => obs,
            Ok(Err(err)) => return Err(MonitorError::Seed(PollError::Rpc(err))),
            Err(_) => return Err(MonitorError::Seed(PollError::Deadline(config.timeout))),
        };

        Ok(Self::spawn(config, source, &seed))
    }

    fn spawn(config: MonitorConfig, source: Arc<dyn MinuteSource>, seed: &Observation) -> Self {
        let shared = Arc::new(Shared {
            tracker: PositionTracker::new(seed),
            broadcaster: Broadcaster::new(config.buffers),
            shutdown: Shutdown::new(),
        });

        let position = shared.tracker.current();
        info!(
            url = %config.url,
            height = position.height,
            committed_height = position.committed_height,
            minute = position.minute,
            "monitor started"
        );

        let poller = Poller::new(
            source,
            shared.clone(),
            config.interval,
            config.timeout,
            config.retry,
        );
        let task = tokio::spawn(poller.run());

        Self {
            shared,
            config,
            task: Mutex::new(Some(task)),
        }
    }

    /// Snapshot of the last known position. Never blocks on delivery.
    pub fn current_position(&self) -> Position {
        self.shared.tracker.current()
    }

    /// Receive every minute (and block) advance.
    pub fn subscribe_minutes(&self) -> Receiver<MinuteEvent> {
        self.shared.broadcaster.subscribe_minutes()
    }

    /// Receive the new height whenever the block height advances.
    pub fn subscribe_heights(&self) -> Receiver<u64> {
        self.shared.broadcaster.subscribe_heights()
    }

    /// Receive the new committed height whenever it advances.
    pub fn subscribe_committed_heights(&self) -> Receiver<u64> {
        self.shared.broadcaster.subscribe_committed_heights()
    }

    /// Receive every failed poll.
    pub fn subscribe_errors(&self) -> Receiver<PollError> {
        self.shared.broadcaster.subscribe_errors()
    }

    /// Stop polling for good.
    ///
    /// Safe to call any number of times from any thread. Cancels an
    /// in-flight request and wakes any pending wait. Once this returns no
    /// subscriber receives anything further.
    pub fn stop(&self) {
        let first = self.shared.shutdown.trigger();
        self.shared.tracker.fence();
        self.shared.broadcaster.close();
        if first {
            info!(url = %self.config.url, "monitor stopped");
        }
    }

    /// Whether [`stop`](Monitor::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.shared.shutdown.is_triggered()
    }

    /// Deliveries dropped because a subscriber did not drain its channel.
    pub fn dropped_events(&self) -> u64 {
        self.shared.broadcaster.dropped()
    }

    /// Wait for the background task to exit.
    ///
    /// Only returns after [`stop`](Monitor::stop); later calls return
    /// immediately.
    pub async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Settings this monitor runs with.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for configuring a Monitor.
#[derive(Default)]
pub struct MonitorBuilder {
    config: MonitorConfig,
    source: Option<Arc<dyn MinuteSource>>,
}

impl MonitorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all settings at once.
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the factomd API endpoint.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Set the poll interval. Defaults to 1 second.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Set the per-request deadline. Defaults to 5 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the retry policy. Defaults to [`RetryPolicy::Constant`].
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set subscriber channel capacities.
    pub fn buffers(mut self, buffers: BufferSizes) -> Self {
        self.config.buffers = buffers;
        self
    }

    /// Poll a custom source instead of the factomd HTTP client.
    ///
    /// The URL setting is then only used in log output.
    pub fn source(mut self, source: impl MinuteSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Validate the settings, seed the position and start polling.
    pub async fn connect(self) -> Result<Monitor, MonitorError> {
        self.config.validate()?;

        let source = match self.source {
            Some(source) => source,
            None => Arc::new(
                FactomdClient::builder()
                    .endpoint(self.config.url.clone())
                    .timeout(self.config.timeout)
                    .build()
                    .map_err(MonitorError::Client)?,
            ),
        };

        Monitor::start(self.config, source).await
    }
}

impl std::fmt::Debug for MonitorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorBuilder")
            .field("config", &self.config)
            .field("custom_source", &self.source.is_some())
            .finish()
    }
}
