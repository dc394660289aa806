//! Serializable backtest configuration, loaded from TOML.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration:
//!
//! ```toml
//! [scanner]
//! direction = "down"
//! min_gap_percent = 1.0
//! min_vwap_crosses = 1
//! min_volume_ratio = 1.2
//!
//! [exits]
//! stop_loss_pct = 2.0
//! target_pct = 4.0
//! max_hold_minutes = 120
//! stop_fill = "worst_case"
//!
//! [session]
//! timezone = "America/New_York"
//! start = "09:30"
//! end = "16:00"
//!
//! [data]
//! timeframe = "5min"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gaplab_core::scanner::ScannerConfig;
use gaplab_core::session::{SessionError, SessionWindow};
use gaplab_core::simulator::ExitRules;

/// Unique identifier for a backtest configuration (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(String),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("invalid session window: {0}")]
    Session(#[from] SessionError),
}

/// Bar data settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Bar interval, e.g. `"1min"`, `"5min"`, `"1h"`.
    pub timeframe: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            timeframe: "5min".to_string(),
        }
    }
}

impl DataConfig {
    /// Bar interval in minutes, or `None` for an unrecognised timeframe.
    pub fn interval_minutes(&self) -> Option<u32> {
        let tf = self.timeframe.trim().to_ascii_lowercase();
        let (digits, unit) = tf.split_at(tf.find(|c: char| !c.is_ascii_digit())?);
        let n: u32 = digits.parse().ok().filter(|n| *n > 0)?;
        match unit {
            "m" | "min" | "mins" | "minute" | "minutes" => Some(n),
            "h" | "hour" | "hours" => n.checked_mul(60),
            _ => None,
        }
    }
}

/// Full configuration for one backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub scanner: ScannerConfig,
    pub exits: ExitRules,
    pub session: SessionWindow,
    pub data: DataConfig,
}

impl BacktestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scanner;
        if s.min_gap_percent.is_nan() || s.min_gap_percent < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "scanner.min_gap_percent must be >= 0, got {}",
                s.min_gap_percent
            )));
        }
        if s.min_volume_ratio.is_nan() || s.min_volume_ratio < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "scanner.min_volume_ratio must be >= 0, got {}",
                s.min_volume_ratio
            )));
        }
        let e = &self.exits;
        if e.stop_loss_pct.is_nan() || e.stop_loss_pct <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "exits.stop_loss_pct must be > 0, got {}",
                e.stop_loss_pct
            )));
        }
        if e.target_pct.is_nan() || e.target_pct <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "exits.target_pct must be > 0, got {}",
                e.target_pct
            )));
        }
        self.session.validate()?;
        if self.data.interval_minutes().is_none() {
            return Err(ConfigError::Invalid(format!(
                "data.timeframe '{}' is not a minute or hour interval",
                self.data.timeframe
            )));
        }
        Ok(())
    }

    /// Deterministic hash of the canonical JSON form.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
