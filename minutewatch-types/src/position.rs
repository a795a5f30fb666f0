//! Position - the canonical "where is the chain" state.

use crate::Observation;

/// Last known position of the chain.
///
/// Only the tracker mutates it; everyone else reads copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Leader height.
    pub height: u64,

    /// Height of the latest saved directory block.
    pub committed_height: u64,

    /// Minute within the block, always in `0..=9`.
    pub minute: u8,
}

impl Position {
    /// Create a position from its parts. The minute is normalized.
    pub const fn new(height: u64, committed_height: u64, minute: u8) -> Self {
        Self {
            height,
            committed_height,
            minute: minute % crate::MINUTES_PER_BLOCK as u8,
        }
    }

    /// Seed a position from an observation.
    pub const fn from_observation(obs: &Observation) -> Self {
        Self {
            height: obs.height,
            committed_height: obs.committed_height,
            minute: obs.normalized_minute(),
        }
    }

    /// Ordering key: `(height, minute)` compared lexicographically.
    pub const fn key(&self) -> (u64, u8) {
        (self.height, self.minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_observation_normalizes() {
        let obs = Observation {
            committed_height: 9,
            height: 10,
            minute: 10,
            ..Default::default()
        };
        assert_eq!(Position::from_observation(&obs), Position::new(10, 9, 0));
    }

    #[test]
    fn key_orders_height_before_minute() {
        let late_minute = Position::new(10, 10, 9);
        let next_block = Position::new(11, 10, 0);
        assert!(next_block.key() > late_minute.key());
    }
}
