//! The polling loop.
//!
//! One request is in flight at a time. Between requests the loop waits for
//! the poll interval (or the retry delay after failures). After a minute
//! transition that landed on schedule it additionally sleeps until shortly
//! before the next expected minute, instead of polling a node that cannot
//! have moved yet. Every wait, and the request itself, races the shutdown
//! signal.

use std::sync::Arc;
use std::time::Duration;

use minutewatch_client::MinuteSource;
use minutewatch_types::Observation;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::PollError;
use crate::lifecycle::ShutdownSignal;
use crate::monitor::Shared;

enum Polled {
    Observed(Observation),
    Failed(PollError),
    Cancelled,
}

pub(crate) struct Poller {
    source: Arc<dyn MinuteSource>,
    shared: Arc<Shared>,
    signal: ShutdownSignal,
    interval: Duration,
    timeout: Duration,
    retry: RetryPolicy,
    failures: u32,
    last_transition: Option<Instant>,
}

impl Poller {
    pub(crate) fn new(
        source: Arc<dyn MinuteSource>,
        shared: Arc<Shared>,
        interval: Duration,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        let signal = shared.shutdown.signal();
        Self {
            source,
            shared,
            signal,
            interval,
            timeout,
            retry,
            failures: 0,
            last_transition: None,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            let wait = self.retry.delay(self.interval, self.failures);
            if !self.sleep(wait).await {
                break;
            }

            match self.poll().await {
                Polled::Cancelled => break,
                Polled::Failed(err) => {
                    self.failures = self.failures.saturating_add(1);
                    warn!(error = %err, failures = self.failures, "poll failed");
                    self.shared.broadcaster.publish_error(&err);
                }
                Polled::Observed(obs) => {
                    self.failures = 0;
                    if let Some(settle) = self.observe(&obs) {
                        debug!(?settle, "minute landed on schedule, backing off");
                        if !self.sleep(settle).await {
                            break;
                        }
                    }
                }
            }
        }
        debug!("poller exited");
    }

    /// Feed an observation through the tracker and broadcaster. Returns the
    /// extra sleep to take when the transition arrived on schedule.
    fn observe(&mut self, obs: &Observation) -> Option<Duration> {
        let shutdown = &self.shared.shutdown;
        let Some(transition) = self
            .shared
            .tracker
            .apply_unless(obs, || shutdown.is_triggered())
        else {
            return None;
        };
        if !transition.is_progress() {
            return None;
        }

        debug!(
            height = transition.position.height,
            committed_height = transition.position.committed_height,
            minute = transition.position.minute,
            progress = ?transition.progress,
            "position advanced"
        );
        self.shared.broadcaster.publish(&transition);

        if !transition.minute_advanced() {
            return None;
        }

        let now = Instant::now();
        let settle = self
            .last_transition
            .and_then(|last| settle_delay(now - last, obs.minute_duration(), self.interval));
        self.last_transition = Some(now);
        settle
    }

    async fn poll(&mut self) -> Polled {
        let request = tokio::time::timeout(self.timeout, self.source.current_minute());

        tokio::select! {
            biased;
            _ = self.signal.wait() => Polled::Cancelled,
            result = request => match result {
                Ok(Ok(obs)) => Polled::Observed(obs),
                Ok(Err(err)) => Polled::Failed(PollError::Rpc(err)),
                Err(_) => Polled::Failed(PollError::Deadline(self.timeout)),
            },
        }
    }

    /// Returns `false` if shutdown interrupted the sleep.
    async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.signal.wait() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

/// Extra sleep after a minute transition, if any.
///
/// When the gap since the previous transition is within one poll interval
/// of the nominal minute, the next minute is predictable and there is no
/// point polling until `nominal - interval` has passed. Irregular gaps keep
/// dense polling.
pub(crate) fn settle_delay(gap: Duration, nominal: Duration, interval: Duration) -> Option<Duration> {
    let drift = if gap > nominal { gap - nominal } else { nominal - gap };
    if drift > interval {
        return None;
    }
    let settle = nominal.saturating_sub(interval);
    (!settle.is_zero()).then_some(settle)
}
