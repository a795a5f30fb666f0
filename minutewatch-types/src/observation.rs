//! Observation - one decoded `current-minute` response.

use core::time::Duration;

use crate::MINUTES_PER_BLOCK;

/// A single report from a node, as returned by the `current-minute` call.
///
/// Observations are transient: one is produced for every successful request
/// and handed straight to the position tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Observation {
    /// Height of the most recently saved directory block.
    #[cfg_attr(feature = "serde", serde(rename = "directoryblockheight"))]
    pub committed_height: u64,

    /// Height the network leaders are currently working on.
    #[cfg_attr(feature = "serde", serde(rename = "leaderheight"))]
    pub height: u64,

    /// Raw minute as reported by the node.
    ///
    /// Nominally 0-9; a value of 10 shows up briefly while the node rolls
    /// over to the next block.
    pub minute: u64,

    /// Start of the current block, in the node's clock.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "currentblockstarttime", default)
    )]
    pub block_start_time: i64,

    /// Start of the current minute, in the node's clock.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "currentminutestarttime", default)
    )]
    pub minute_start_time: i64,

    /// The node's clock when the response was produced.
    #[cfg_attr(feature = "serde", serde(rename = "currenttime", default))]
    pub current_time: i64,

    /// Configured length of a directory block, in seconds.
    #[cfg_attr(feature = "serde", serde(rename = "directoryblockinseconds"))]
    pub block_seconds: u64,
}

impl Observation {
    /// The raw minute reduced into `0..=9`.
    pub const fn normalized_minute(&self) -> u8 {
        (self.minute % MINUTES_PER_BLOCK) as u8
    }

    /// Nominal length of one minute on this network.
    ///
    /// Zero if the node did not report a block duration.
    pub fn minute_duration(&self) -> Duration {
        Duration::from_secs(self.block_seconds) / MINUTES_PER_BLOCK as u32
    }
}
