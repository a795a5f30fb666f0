//! # minutewatch-types
//!
//! Core types shared by the minutewatch crates. A factomd node reports its
//! progress as a directory block height plus a "minute" sub-step inside the
//! block; these types describe one such report and the canonical position
//! derived from a stream of them.
//!
//! ## Features
//!
//! - `serde`: Serialize/Deserialize with the factomd wire field names
//!
//! ## Example
//!
//! ```rust
//! use minutewatch_types::{Observation, Position};
//!
//! let observation = Observation {
//!     committed_height: 10,
//!     height: 10,
//!     minute: 10,
//!     block_seconds: 600,
//!     ..Default::default()
//! };
//!
//! // A raw minute of 10 is the node's internal rollover state, not a real minute.
//! assert_eq!(observation.normalized_minute(), 0);
//!
//! let position = Position::from_observation(&observation);
//! assert_eq!(position.key(), (10, 0));
//! ```

mod event;
mod observation;
mod position;

pub use event::*;
pub use observation::*;
pub use position::*;

/// Number of minutes in one directory block.
///
/// Raw minutes are reduced modulo this value before any comparison.
pub const MINUTES_PER_BLOCK: u64 = 10;
