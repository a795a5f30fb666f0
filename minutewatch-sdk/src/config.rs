//! Per-monitor configuration.

use std::time::Duration;

use crate::error::MonitorError;

/// Public factomd open node, used when no URL is configured.
pub const DEFAULT_URL: &str = "https://api.factomd.net/v2";

/// Settings for one [`Monitor`](crate::Monitor).
///
/// Every instance carries its own copy; nothing is process-global.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// factomd v2 API endpoint.
    pub url: String,

    /// Minimum spacing between two requests.
    pub interval: Duration,

    /// Upper bound on a single request.
    pub timeout: Duration,

    /// How to space out requests after a failure.
    pub retry: RetryPolicy,

    /// Subscriber channel capacities.
    pub buffers: BufferSizes,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::Constant,
            buffers: BufferSizes::default(),
        }
    }
}

impl MonitorConfig {
    /// Reject settings the poller cannot run with.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.interval.is_zero() {
            return Err(MonitorError::Config("interval must be non-zero".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(MonitorError::Config("timeout must be non-zero".to_string()));
        }
        self.buffers.validate()?;
        self.retry.validate()
    }
}

/// Spacing of requests while the node keeps failing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RetryPolicy {
    /// Retry at the normal poll interval, forever.
    #[default]
    Constant,

    /// Grow the wait after each consecutive failure.
    ///
    /// The k-th failure in a row waits `initial * multiplier^(k-1)`, capped
    /// at `max`. The first success returns to the poll interval.
    Exponential {
        /// Wait after the first failure.
        initial: Duration,
        /// Growth factor per additional failure.
        multiplier: f64,
        /// Ceiling for the wait.
        max: Duration,
    },
}

impl RetryPolicy {
    /// Exponential policy with the factomd monitor defaults:
    /// 50ms, growing by 1.5x, capped at 15s.
    pub const fn exponential() -> Self {
        RetryPolicy::Exponential {
            initial: Duration::from_millis(50),
            multiplier: 1.5,
            max: Duration::from_secs(15),
        }
    }

    fn validate(&self) -> Result<(), MonitorError> {
        match *self {
            RetryPolicy::Constant => Ok(()),
            RetryPolicy::Exponential {
                initial,
                multiplier,
                max,
            } => {
                if initial.is_zero() {
                    return Err(MonitorError::Config(
                        "retry initial interval must be non-zero".to_string(),
                    ));
                }
                if !multiplier.is_finite() || multiplier < 1.0 {
                    return Err(MonitorError::Config(format!(
                        "retry multiplier must be >= 1.0, got {multiplier}"
                    )));
                }
                if initial > max {
                    return Err(MonitorError::Config(format!(
                        "retry initial interval {initial:?} exceeds maximum {max:?}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Wait before the next request after `failures` consecutive failures.
    ///
    /// `failures == 0` means the last request succeeded.
    pub fn delay(&self, interval: Duration, failures: u32) -> Duration {
        match *self {
            _ if failures == 0 => interval,
            RetryPolicy::Constant => interval,
            RetryPolicy::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let exponent = i32::try_from(failures - 1).unwrap_or(i32::MAX);
                let secs = initial.as_secs_f64() * multiplier.powi(exponent);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    max
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }
}

/// Capacity of each subscriber channel, per kind.
///
/// A full channel drops new deliveries for that subscriber only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSizes {
    /// Minute event subscribers.
    pub minute: usize,
    /// Height subscribers.
    pub height: usize,
    /// Committed height subscribers.
    pub committed_height: usize,
    /// Error subscribers.
    pub error: usize,
}

impl Default for BufferSizes {
    fn default() -> Self {
        Self {
            minute: 25,
            height: 6,
            committed_height: 6,
            error: 6,
        }
    }
}

impl BufferSizes {
    fn validate(&self) -> Result<(), MonitorError> {
        let sizes = [
            ("minute", self.minute),
            ("height", self.height),
            ("committed_height", self.committed_height),
            ("error", self.error),
        ];
        match sizes.iter().find(|(_, size)| *size == 0) {
            Some((kind, _)) => Err(MonitorError::Config(format!(
                "{kind} buffer size must be at least 1"
            ))),
            None => Ok(()),
        }
    }
}
