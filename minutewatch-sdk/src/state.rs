//! Position tracking and transition classification.

use minutewatch_types::{MinuteEvent, Observation, Position};
use parking_lot::RwLock;

/// How far the chain moved between two observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Progress {
    /// `(height, minute)` did not increase.
    None,
    /// The minute advanced within the same block.
    Minute,
    /// The height advanced (which is also a minute advance).
    Height,
}

/// Result of feeding one observation to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Minute/height progress.
    pub progress: Progress,
    /// Whether the committed height increased. Independent of `progress`.
    pub committed_advanced: bool,
    /// Position after the update.
    pub position: Position,
}

impl Transition {
    /// True for minute-or-stronger progress.
    pub fn minute_advanced(&self) -> bool {
        self.progress >= Progress::Minute
    }

    /// True if the block height advanced.
    pub fn height_advanced(&self) -> bool {
        self.progress == Progress::Height
    }

    /// True if anything at all changed.
    pub fn is_progress(&self) -> bool {
        self.minute_advanced() || self.committed_advanced
    }

    /// Payload for minute subscribers.
    pub fn event(&self) -> MinuteEvent {
        MinuteEvent::from(self.position)
    }
}

/// Compare `obs` against `current` and compute the next position.
///
/// Height and minute only move when `(height, minute)` strictly increases;
/// committed height only moves up. A raw minute of 10 normalizes to 0, so it
/// never counts as progress on its own.
pub fn classify(current: &Position, obs: &Observation) -> Transition {
    let observed = Position::from_observation(obs);

    let progress = if observed.key() <= current.key() {
        Progress::None
    } else if observed.height > current.height {
        Progress::Height
    } else {
        Progress::Minute
    };
    let committed_advanced = observed.committed_height > current.committed_height;

    let mut next = *current;
    if progress != Progress::None {
        next.height = observed.height;
        next.minute = observed.minute;
    }
    if committed_advanced {
        next.committed_height = observed.committed_height;
    }

    Transition {
        progress,
        committed_advanced,
        position: next,
    }
}

/// Holder of the single live [`Position`].
///
/// Has its own lock so snapshot reads never wait on subscriber delivery.
#[derive(Debug)]
pub struct PositionTracker {
    position: RwLock<Position>,
}

impl PositionTracker {
    /// Seed the tracker with the first observation.
    pub fn new(seed: &Observation) -> Self {
        Self {
            position: RwLock::new(Position::from_observation(seed)),
        }
    }

    /// Snapshot of the current position.
    pub fn current(&self) -> Position {
        *self.position.read()
    }

    /// Classify `obs` and store the resulting position.
    pub fn apply(&self, obs: &Observation) -> Transition {
        let mut position = self.position.write();
        Self::advance(&mut position, obs)
    }

    /// Like [`apply`](Self::apply), unless `stopped` reports true.
    ///
    /// `stopped` is checked under the write lock, so combined with
    /// [`fence`](Self::fence) no update lands after a stop has returned.
    pub fn apply_unless(
        &self,
        obs: &Observation,
        stopped: impl FnOnce() -> bool,
    ) -> Option<Transition> {
        let mut position = self.position.write();
        if stopped() {
            return None;
        }
        Some(Self::advance(&mut position, obs))
    }

    /// Wait for an update in progress to finish.
    pub fn fence(&self) {
        drop(self.position.write());
    }

    fn advance(position: &mut Position, obs: &Observation) -> Transition {
        let transition = classify(position, obs);
        *position = transition.position;
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn obs(height: u64, committed_height: u64, minute: u64) -> Observation {
        Observation {
            committed_height,
            height,
            minute,
            block_seconds: 600,
            ..Default::default()
        }
    }

    #[test]
    fn seed_sets_position() {
        let tracker = PositionTracker::new(&obs(10, 10, 5));
        assert_eq!(tracker.current(), Position::new(10, 10, 5));
    }

    #[test]
    fn same_observation_is_no_progress() {
        let tracker = PositionTracker::new(&obs(10, 10, 5));
        let t = tracker.apply(&obs(10, 10, 5));
        assert_eq!(t.progress, Progress::None);
        assert!(!t.committed_advanced);
        assert!(!t.is_progress());
    }

    #[test]
    fn stopped_tracker_ignores_observations() {
        let tracker = PositionTracker::new(&obs(10, 10, 5));

        assert!(tracker.apply_unless(&obs(10, 10, 6), || true).is_none());
        assert_eq!(tracker.current(), Position::new(10, 10, 5));

        let t = tracker.apply_unless(&obs(10, 10, 6), || false).unwrap();
        assert_eq!(t.progress, Progress::Minute);
        assert_eq!(tracker.current(), Position::new(10, 10, 6));
    }

    #[test]
    fn minute_advance() {
        let tracker = PositionTracker::new(&obs(10, 10, 5));
        let t = tracker.apply(&obs(10, 10, 6));
        assert_eq!(t.progress, Progress::Minute);
        assert!(t.minute_advanced());
        assert!(!t.height_advanced());
        assert_eq!(t.event(), MinuteEvent { committed_height: 10, height: 10, minute: 6 });
        assert_eq!(tracker.current().minute, 6);
    }

    #[test]
    fn height_advance_implies_minute_advance() {
        let tracker = PositionTracker::new(&obs(10, 10, 9));
        let t = tracker.apply(&obs(11, 10, 0));
        assert_eq!(t.progress, Progress::Height);
        assert!(t.minute_advanced());
        assert!(t.height_advanced());
        assert_eq!(tracker.current(), Position::new(11, 10, 0));
    }

    #[test]
    fn rollover_minute_alone_is_absorbed() {
        let tracker = PositionTracker::new(&obs(10, 10, 9));
        let t = tracker.apply(&obs(10, 10, 10));
        assert_eq!(t.progress, Progress::None);
        assert_eq!(tracker.current(), Position::new(10, 10, 9));
    }

    #[test]
    fn rollover_minute_with_new_height_is_height_advance() {
        let tracker = PositionTracker::new(&obs(10, 10, 9));
        let t = tracker.apply(&obs(11, 10, 10));
        assert_eq!(t.progress, Progress::Height);
        assert_eq!(t.position.minute, 0);
    }

    #[test]
    fn committed_only_progress_updates_committed_height() {
        let tracker = PositionTracker::new(&obs(11, 10, 0));
        let t = tracker.apply(&obs(11, 11, 0));
        assert_eq!(t.progress, Progress::None);
        assert!(t.committed_advanced);
        assert!(t.is_progress());
        assert_eq!(tracker.current(), Position::new(11, 11, 0));
    }

    #[test]
    fn committed_and_minute_can_co_occur() {
        let tracker = PositionTracker::new(&obs(11, 10, 0));
        let t = tracker.apply(&obs(11, 11, 1));
        assert_eq!(t.progress, Progress::Minute);
        assert!(t.committed_advanced);
        assert_eq!(t.event().committed_height, 11);
    }

    #[test]
    fn regressions_are_ignored() {
        let tracker = PositionTracker::new(&obs(10, 10, 5));

        // Stale node behind a load balancer reports an older block.
        let t = tracker.apply(&obs(9, 9, 8));
        assert!(!t.is_progress());
        assert_eq!(tracker.current(), Position::new(10, 10, 5));

        // Lower minute at the same height.
        let t = tracker.apply(&obs(10, 10, 3));
        assert!(!t.is_progress());
    }

    #[test]
    fn committed_height_never_decreases_on_minute_progress() {
        let tracker = PositionTracker::new(&obs(10, 10, 5));
        let t = tracker.apply(&obs(10, 8, 6));
        assert_eq!(t.progress, Progress::Minute);
        assert!(!t.committed_advanced);
        assert_eq!(tracker.current().committed_height, 10);
    }

    #[test]
    fn heights_are_monotonic_over_arbitrary_sequences() {
        let sequence = [
            (10, 10, 5),
            (10, 9, 4),
            (11, 10, 10),
            (10, 10, 9),
            (11, 11, 1),
            (9, 12, 0),
            (12, 11, 3),
            (12, 12, 10),
            (12, 12, 2),
        ];

        let tracker = PositionTracker::new(&obs(10, 10, 5));
        let mut last = tracker.current();
        for (h, c, m) in sequence {
            let t = tracker.apply(&obs(h, c, m));
            let now = tracker.current();
            assert!(now.height >= last.height);
            assert!(now.committed_height >= last.committed_height);
            assert!(now.key() >= last.key());
            assert_eq!(t.minute_advanced(), now.key() > last.key());
            assert!(now.minute < 10);
            last = now;
        }
        assert_eq!(last, Position::new(12, 12, 3));
    }

    #[test]
    fn concurrent_readers_see_whole_positions() {
        use std::thread;

        let tracker = Arc::new(PositionTracker::new(&obs(0, 0, 0)));

        let writer = {
            let tracker = tracker.clone();
            thread::spawn(move || {
                for h in 1..=500u64 {
                    // height and committed height always move together here
                    tracker.apply(&obs(h, h, 0));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let tracker = tracker.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let p = tracker.current();
                        assert_eq!(p.height, p.committed_height);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(tracker.current().height, 500);
    }
}
