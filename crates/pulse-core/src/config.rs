//! Configuration parsing for the pulse sampler.
//!
//! The sampler reads its settings from a single JSON file. Every field is
//! optional; the `effective_*` accessors apply defaults.
//!
//! # Example config
//!
//! ```json
//! {
//!   "Pulse": { "module_name": "lobby", "log_path": "/var/log/pulse" },
//!   "sampler": { "interval_sec": 60, "probe_timeout_ms": 2000 },
//!   "outbound": { "capacity": 4096 }
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::PulseError;

/// Default time between two digests.
pub const DEFAULT_INTERVAL_SEC: u64 = 60;

/// Default execution budget for a single probe.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

/// Default capacity of the outbound broadcast channel.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 4_096;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    #[serde(rename = "Pulse")]
    pub meta: Option<ModuleMeta>,

    /// Scheduler settings.
    pub sampler: Option<SamplerConfig>,

    /// Outbound broadcast buffer settings.
    pub outbound: Option<OutboundConfig>,
}

/// Module metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
    /// Write log files as JSON lines.
    pub log_json: Option<bool>,
}

/// Scheduler settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SamplerConfig {
    /// Seconds between ticks (default: 60).
    pub interval_sec: Option<u64>,

    /// Per-probe budget in milliseconds (default: 2000).
    pub probe_timeout_ms: Option<u64>,

    /// Stop after this many ticks. `None` runs until stopped.
    pub max_ticks: Option<u64>,
}

impl SamplerConfig {
    pub fn effective_interval(&self) -> Duration {
        Duration::from_secs(self.interval_sec.unwrap_or(DEFAULT_INTERVAL_SEC))
    }

    pub fn effective_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.unwrap_or(DEFAULT_PROBE_TIMEOUT_MS))
    }
}

/// Outbound broadcast buffer settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutboundConfig {
    pub capacity: Option<usize>,
}

impl OutboundConfig {
    pub fn effective_capacity(&self) -> usize {
        self.capacity.unwrap_or(DEFAULT_OUTBOUND_CAPACITY)
    }
}

impl AppConfig {
    /// Returns the module name, defaulting to `"pulse"`.
    pub fn module_name(&self) -> String {
        self.meta.as_ref().and_then(|m| m.module_name.clone()).unwrap_or_else(|| "pulse".to_string())
    }

    /// Returns the log path.
    pub fn log_path(&self) -> Option<String> {
        self.meta.as_ref().and_then(|m| m.log_path.clone())
    }

    /// Whether log files are JSON (default: text).
    pub fn log_json(&self) -> bool {
        self.meta.as_ref().and_then(|m| m.log_json).unwrap_or(false)
    }

    /// Returns the sampler block, or defaults when absent.
    pub fn sampler(&self) -> SamplerConfig {
        self.sampler.clone().unwrap_or_default()
    }

    /// Returns the outbound block, or defaults when absent.
    pub fn outbound(&self) -> OutboundConfig {
        self.outbound.clone().unwrap_or_default()
    }

    /// Reject values the sampler cannot run with.
    pub fn validate(&self) -> Result<(), PulseError> {
        let sampler = self.sampler();
        if sampler.effective_interval().is_zero() {
            return Err(PulseError::Config("sampler.interval_sec must be greater than zero".into()));
        }
        if sampler.effective_probe_timeout().is_zero() {
            return Err(PulseError::Config("sampler.probe_timeout_ms must be greater than zero".into()));
        }
        if sampler.max_ticks == Some(0) {
            return Err(PulseError::Config("sampler.max_ticks must be greater than zero when set".into()));
        }
        if self.outbound().effective_capacity() == 0 {
            return Err(PulseError::Config("outbound.capacity must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Parse and validate a JSON config string.
pub fn parse_config(content: &str) -> anyhow::Result<AppConfig> {
    let config: AppConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load, parse and validate a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}
