//! Layered settings for the command line tool.
//!
//! Values come from, lowest precedence first: built-in defaults, an
//! optional TOML file, `MINUTEWATCH_*` environment variables, then
//! command line flags.
//!
//! ```toml
//! url = "http://localhost:8088/v2"
//! interval = "500ms"
//! timeout = "5s"
//!
//! [retry]
//! policy = "exponential"
//! initial = "50ms"
//! multiplier = 1.5
//! max = "15s"
//!
//! [buffers]
//! minute = 25
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `MINUTEWATCH_RETRY__POLICY=exponential`.

use std::path::Path;

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use minutewatch_sdk::{BufferSizes, MonitorConfig, RetryPolicy, DEFAULT_URL};
use serde::Deserialize;

use crate::duration::parse_duration;

/// Values given on the command line. `None` leaves lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub interval: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub url: String,
    pub interval: String,
    pub timeout: String,
    pub retry: RetrySettings,
    pub buffers: BufferSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            interval: "1s".to_string(),
            timeout: "5s".to_string(),
            retry: RetrySettings::default(),
            buffers: BufferSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryKind {
    #[default]
    Constant,
    Exponential,
}

/// Retry section. Unset exponential fields fall back to 50ms / 1.5 / 15s.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub policy: RetryKind,
    pub initial: Option<String>,
    pub multiplier: Option<f64>,
    pub max: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BufferSettings {
    pub minute: usize,
    pub height: usize,
    pub committed_height: usize,
    pub error: usize,
}

impl Default for BufferSettings {
    fn default() -> Self {
        let sizes = BufferSizes::default();
        Self {
            minute: sizes.minute,
            height: sizes.height,
            committed_height: sizes.committed_height,
            error: sizes.error,
        }
    }
}

impl Settings {
    /// Merge every layer into one set of settings.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        Self::layered(builder, environment(), overrides)
    }

    fn layered(
        builder: ConfigBuilder<DefaultState>,
        env: Environment,
        overrides: &Overrides,
    ) -> Result<Self> {
        let config = builder
            .add_source(env)
            .set_override_option("url", overrides.url.clone())?
            .set_override_option("interval", overrides.interval.clone())?
            .set_override_option("timeout", overrides.timeout.clone())?
            .build()
            .context("failed to read settings")?;

        config
            .try_deserialize()
            .context("invalid settings")
    }

    /// Parse the human-readable values into a monitor configuration.
    pub fn monitor_config(&self) -> Result<MonitorConfig> {
        Ok(MonitorConfig {
            url: self.url.clone(),
            interval: parse_duration(&self.interval).context("invalid interval")?,
            timeout: parse_duration(&self.timeout).context("invalid timeout")?,
            retry: self.retry.policy()?,
            buffers: BufferSizes {
                minute: self.buffers.minute,
                height: self.buffers.height,
                committed_height: self.buffers.committed_height,
                error: self.buffers.error,
            },
        })
    }
}

/// `MINUTEWATCH_URL`, `MINUTEWATCH_RETRY__POLICY`, ...
fn environment() -> Environment {
    Environment::with_prefix("MINUTEWATCH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl RetrySettings {
    fn policy(&self) -> Result<RetryPolicy> {
        match self.policy {
            RetryKind::Constant => Ok(RetryPolicy::Constant),
            RetryKind::Exponential => {
                let mut policy = RetryPolicy::exponential();
                if let RetryPolicy::Exponential {
                    initial,
                    multiplier,
                    max,
                } = &mut policy
                {
                    if let Some(s) = &self.initial {
                        *initial = parse_duration(s).context("invalid retry.initial")?;
                    }
                    if let Some(m) = self.multiplier {
                        *multiplier = m;
                    }
                    if let Some(s) = &self.max {
                        *max = parse_duration(s).context("invalid retry.max")?;
                    }
                }
                Ok(policy)
            }
        }
    }
}
