use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use tempctl_lib::transport::SerialSettings;

/// Settings of the demonstration loop.
///
/// ```yaml
/// poll_interval: 5s
/// setpoint: 25.0
/// power_on: true
/// serial:
///   baud_rate: 19200
///   timeout: 1s
/// ```
///
/// A `serial` section replaces the global serial command line options.
/// Missing keys in it fall back to [`SerialSettings::default`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Setpoint in °C, commanded once before polling.
    #[serde(default)]
    pub setpoint: Option<f32>,
    #[serde(default)]
    pub power_on: bool,
    #[serde(default)]
    pub serial: Option<SerialSettings>,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self> {
        log::debug!("Loading config file from {path:?}");
        let file = File::open(path).with_context(|| format!("Cannot open config file {path:?}"))?;
        serde_yaml::from_reader(file).with_context(|| format!("Invalid config file {path:?}"))
    }
}
