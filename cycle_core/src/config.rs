//! Configuration file support for the cycle tracker.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/ctrack/config.toml`.
//! Only the binary touches the filesystem here; the engine receives an
//! [`EngineConfig`] value explicitly.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Days before the predicted period start that bound the fertile window.
///
/// The window is `[next - start, next - end]`, so `start >= end`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OvulationOffset {
    pub start: i64,
    pub end: i64,
}

impl Default for OvulationOffset {
    fn default() -> Self {
        Self { start: 16, end: 11 }
    }
}

impl OvulationOffset {
    /// Move both bounds by `days` (positive moves the window earlier).
    pub fn shifted(self, days: i64) -> Self {
        Self {
            start: self.start + days,
            end: self.end + days,
        }
    }
}

/// How the next period start is derived from history.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMethod {
    /// Most recent start plus `cycle_length_fallback_days`.
    #[default]
    Fixed,
    /// Mean gap between recent starts once two or more cycles exist.
    RollingAverage,
}

/// First column of the calendar grid.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

/// Parameters of the prediction and calendar engine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default = "default_cycle_length_fallback_days")]
    pub cycle_length_fallback_days: i64,

    #[serde(default = "default_period_length_fallback_days")]
    pub period_length_fallback_days: i64,

    #[serde(default)]
    pub ovulation_offset_days: OvulationOffset,

    #[serde(default)]
    pub prediction_method: PredictionMethod,

    #[serde(default = "default_average_window_cycles")]
    pub average_window_cycles: usize,

    #[serde(default)]
    pub week_starts_on: WeekStart,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_length_fallback_days: default_cycle_length_fallback_days(),
            period_length_fallback_days: default_period_length_fallback_days(),
            ovulation_offset_days: OvulationOffset::default(),
            prediction_method: PredictionMethod::default(),
            average_window_cycles: default_average_window_cycles(),
            week_starts_on: WeekStart::default(),
        }
    }
}

impl EngineConfig {
    /// Check that the parameters describe a usable model.
    pub fn validate(&self) -> Result<()> {
        if self.cycle_length_fallback_days <= 0 {
            return Err(Error::Config(format!(
                "cycle_length_fallback_days must be positive, got {}",
                self.cycle_length_fallback_days
            )));
        }
        if self.period_length_fallback_days < 0 {
            return Err(Error::Config(format!(
                "period_length_fallback_days must not be negative, got {}",
                self.period_length_fallback_days
            )));
        }
        let offset = self.ovulation_offset_days;
        if offset.start < offset.end {
            return Err(Error::Config(format!(
                "ovulation_offset_days.start ({}) must be >= end ({})",
                offset.start, offset.end
            )));
        }
        if self.average_window_cycles < 2 {
            return Err(Error::Config(format!(
                "average_window_cycles must be at least 2, got {}",
                self.average_window_cycles
            )));
        }
        Ok(())
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("ctrack")
}

fn default_cycle_length_fallback_days() -> i64 {
    28
}

fn default_period_length_fallback_days() -> i64 {
    5
}

fn default_average_window_cycles() -> usize {
    6
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.engine.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("ctrack").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
