//! Event payloads handed to subscribers.

use crate::Position;

/// Delivered to minute subscribers on every minute (or block) advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MinuteEvent {
    /// Height of the latest saved directory block.
    pub committed_height: u64,

    /// Leader height.
    pub height: u64,

    /// Minute within the block, in `0..=9`.
    pub minute: u8,
}

impl From<Position> for MinuteEvent {
    fn from(position: Position) -> Self {
        Self {
            committed_height: position.committed_height,
            height: position.height,
            minute: position.minute,
        }
    }
}
