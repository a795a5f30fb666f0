//! Lossy fan-out of transitions and errors to subscribers.
//!
//! Every subscriber owns a bounded channel. Delivery uses `try_send`, so a
//! full channel drops the value for that subscriber only and the poller
//! never waits on anyone.

use std::sync::atomic::{AtomicU64, Ordering};

use minutewatch_types::MinuteEvent;
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::trace;

use crate::config::BufferSizes;
use crate::error::PollError;
use crate::state::Transition;

#[derive(Debug, Default)]
struct Subscribers {
    closed: bool,
    minutes: Vec<Sender<MinuteEvent>>,
    heights: Vec<Sender<u64>>,
    committed_heights: Vec<Sender<u64>>,
    errors: Vec<Sender<PollError>>,
}

/// Per-kind subscriber lists. Append-only.
///
/// `publish` holds the read lock across its `try_send` calls, not just the
/// enumeration. The sends never wait, and [`close`](Broadcaster::close)
/// relies on it: taking the write lock waits out any delivery in progress,
/// so nothing is sent after `close` returns.
#[derive(Debug)]
pub struct Broadcaster {
    buffers: BufferSizes,
    subscribers: RwLock<Subscribers>,
    dropped: AtomicU64,
}

impl Broadcaster {
    /// Create a broadcaster whose channels use the given capacities.
    pub fn new(buffers: BufferSizes) -> Self {
        Self {
            buffers,
            subscribers: RwLock::new(Subscribers::default()),
            dropped: AtomicU64::new(0),
        }
    }

    /// New channel for minute events.
    pub fn subscribe_minutes(&self) -> Receiver<MinuteEvent> {
        let (tx, rx) = mpsc::channel(self.buffers.minute.max(1));
        self.subscribers.write().minutes.push(tx);
        rx
    }

    /// New channel for height changes.
    pub fn subscribe_heights(&self) -> Receiver<u64> {
        let (tx, rx) = mpsc::channel(self.buffers.height.max(1));
        self.subscribers.write().heights.push(tx);
        rx
    }

    /// New channel for committed height changes.
    pub fn subscribe_committed_heights(&self) -> Receiver<u64> {
        let (tx, rx) = mpsc::channel(self.buffers.committed_height.max(1));
        self.subscribers.write().committed_heights.push(tx);
        rx
    }

    /// New channel for poll failures.
    pub fn subscribe_errors(&self) -> Receiver<PollError> {
        let (tx, rx) = mpsc::channel(self.buffers.error.max(1));
        self.subscribers.write().errors.push(tx);
        rx
    }

    /// Deliver a transition to every interested subscriber.
    pub fn publish(&self, transition: &Transition) {
        let subscribers = self.subscribers.read();
        if subscribers.closed {
            return;
        }

        if transition.minute_advanced() {
            self.fan_out(&subscribers.minutes, transition.event(), "minute");
        }
        if transition.height_advanced() {
            self.fan_out(&subscribers.heights, transition.position.height, "height");
        }
        if transition.committed_advanced {
            self.fan_out(
                &subscribers.committed_heights,
                transition.position.committed_height,
                "committed_height",
            );
        }
    }

    /// Deliver a poll failure to every error subscriber.
    pub fn publish_error(&self, error: &PollError) {
        let subscribers = self.subscribers.read();
        if subscribers.closed {
            return;
        }
        self.fan_out(&subscribers.errors, error.clone(), "error");
    }

    /// Stop all future deliveries.
    ///
    /// Waits for any in-progress publish to finish, so nothing is sent
    /// once this returns.
    pub fn close(&self) {
        self.subscribers.write().closed = true;
    }

    /// Deliveries dropped because a subscriber's buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn fan_out<T: Clone>(&self, senders: &[Sender<T>], value: T, kind: &'static str) {
        for tx in senders {
            match tx.try_send(value.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    trace!(kind, "subscriber buffer full, dropping");
                }
                // receiver gone; subscriptions are never removed
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Progress;
    use minutewatch_client::RpcError;
    use minutewatch_types::Position;

    fn transition(progress: Progress, committed_advanced: bool, position: Position) -> Transition {
        Transition {
            progress,
            committed_advanced,
            position,
        }
    }

    fn drain<T>(rx: &mut Receiver<T>) -> Vec<T> {
        let mut out = Vec::new();
        while let Ok(v) = rx.try_recv() {
            out.push(v);
        }
        out
    }

    #[test]
    fn minute_transition_reaches_minute_subscribers_only() {
        let b = Broadcaster::new(BufferSizes::default());
        let mut minutes = b.subscribe_minutes();
        let mut heights = b.subscribe_heights();
        let mut committed = b.subscribe_committed_heights();

        b.publish(&transition(Progress::Minute, false, Position::new(10, 10, 6)));

        assert_eq!(
            drain(&mut minutes),
            vec![MinuteEvent { committed_height: 10, height: 10, minute: 6 }]
        );
        assert!(drain(&mut heights).is_empty());
        assert!(drain(&mut committed).is_empty());
    }

    #[test]
    fn height_transition_reaches_minute_and_height_subscribers() {
        let b = Broadcaster::new(BufferSizes::default());
        let mut minutes = b.subscribe_minutes();
        let mut heights = b.subscribe_heights();

        b.publish(&transition(Progress::Height, false, Position::new(11, 10, 0)));

        assert_eq!(drain(&mut minutes).len(), 1);
        assert_eq!(drain(&mut heights), vec![11]);
    }

    #[test]
    fn committed_only_transition() {
        let b = Broadcaster::new(BufferSizes::default());
        let mut minutes = b.subscribe_minutes();
        let mut committed = b.subscribe_committed_heights();

        b.publish(&transition(Progress::None, true, Position::new(11, 11, 0)));

        assert!(drain(&mut minutes).is_empty());
        assert_eq!(drain(&mut committed), vec![11]);
    }

    #[test]
    fn no_progress_delivers_nothing() {
        let b = Broadcaster::new(BufferSizes::default());
        let mut minutes = b.subscribe_minutes();
        b.publish(&transition(Progress::None, false, Position::new(10, 10, 5)));
        assert!(drain(&mut minutes).is_empty());
    }

    #[test]
    fn every_subscriber_gets_a_copy() {
        let b = Broadcaster::new(BufferSizes::default());
        let mut rxs: Vec<_> = (0..8).map(|_| b.subscribe_minutes()).collect();

        for minute in 1..=3 {
            b.publish(&transition(Progress::Minute, false, Position::new(1, 1, minute)));
        }

        for rx in rxs.iter_mut() {
            let minutes: Vec<u8> = drain(rx).into_iter().map(|e| e.minute).collect();
            assert_eq!(minutes, vec![1, 2, 3]);
        }
    }

    #[test]
    fn full_subscriber_does_not_affect_others() {
        let b = Broadcaster::new(BufferSizes {
            minute: 2,
            ..Default::default()
        });
        let _stalled = b.subscribe_minutes();
        let mut active = b.subscribe_minutes();

        for minute in 1..=5 {
            b.publish(&transition(Progress::Minute, false, Position::new(1, 1, minute)));
            assert_eq!(drain(&mut active).len(), 1);
        }

        // the stalled subscriber kept the first two and lost the other three
        assert_eq!(b.dropped(), 3);
    }

    #[test]
    fn overflow_keeps_oldest_events() {
        let b = Broadcaster::new(BufferSizes {
            minute: 2,
            ..Default::default()
        });
        let mut rx = b.subscribe_minutes();

        for minute in 1..=4 {
            b.publish(&transition(Progress::Minute, false, Position::new(1, 1, minute)));
        }

        let minutes: Vec<u8> = drain(&mut rx).into_iter().map(|e| e.minute).collect();
        assert_eq!(minutes, vec![1, 2]);
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let b = Broadcaster::new(BufferSizes::default());
        drop(b.subscribe_minutes());
        let mut live = b.subscribe_minutes();

        b.publish(&transition(Progress::Minute, false, Position::new(1, 1, 1)));

        assert_eq!(drain(&mut live).len(), 1);
        assert_eq!(b.dropped(), 0);
    }

    #[test]
    fn errors_reach_error_subscribers() {
        let b = Broadcaster::new(BufferSizes::default());
        let mut errors = b.subscribe_errors();
        let mut minutes = b.subscribe_minutes();

        let err = PollError::Rpc(RpcError::Connection("refused".to_string()));
        b.publish_error(&err);

        assert_eq!(drain(&mut errors), vec![err]);
        assert!(drain(&mut minutes).is_empty());
    }

    #[test]
    fn closed_broadcaster_is_silent() {
        let b = Broadcaster::new(BufferSizes::default());
        let mut minutes = b.subscribe_minutes();
        let mut errors = b.subscribe_errors();

        b.close();
        b.publish(&transition(Progress::Height, true, Position::new(2, 2, 0)));
        b.publish_error(&PollError::Rpc(RpcError::Timeout));

        assert!(drain(&mut minutes).is_empty());
        assert!(drain(&mut errors).is_empty());

        // subscribing after close still works, it just never fires
        let mut late = b.subscribe_minutes();
        b.publish(&transition(Progress::Minute, false, Position::new(2, 2, 1)));
        assert!(drain(&mut late).is_empty());
    }
}
