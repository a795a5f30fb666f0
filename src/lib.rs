//! # minutewatch
//!
//! Command line front end for [`minutewatch_sdk`]: follows a factomd node
//! and prints a line for every minute, block and committed block change.
//!
//! ```bash
//! # Follow the public open node
//! minutewatch
//!
//! # Local node, poll faster, machine-readable output
//! minutewatch --url http://localhost:8088/v2 --interval 250ms --json
//!
//! # Settings from a file
//! minutewatch --config minutewatch.toml
//! ```
//!
//! The library half holds the pieces the binary is built from:
//!
//! - **[`settings`]**: layered configuration (file, environment, flags)
//! - **[`duration`]**: human-readable duration parsing
//! - **[`render`]**: text and JSON output lines

pub mod duration;
pub mod render;
pub mod settings;

pub use render::{render, Format, Line};
pub use settings::{Overrides, Settings};
