use crate::engine::Timing;
use crate::error::{self, EngineError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,
}

/// User-facing timing knobs, in milliseconds.
///
/// Values are signed so that a negative entry in the config file is reported
/// as [`EngineError::InvalidConfig`] instead of a TOML type error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimingConfig {
    /// Activity must stay pending this long before the indicator is shown.
    #[serde(default)]
    pub debounce_delay_ms: i64,
    /// Once shown, the indicator stays up at least this long.
    #[serde(default)]
    pub min_duration_ms: i64,
    /// Extra hold after activity ends; wins over `min_duration_ms` when larger.
    #[serde(default)]
    pub extra_duration_ms: i64,
}

impl TimingConfig {
    pub fn new(debounce_delay_ms: i64, min_duration_ms: i64, extra_duration_ms: i64) -> Self {
        Self {
            debounce_delay_ms,
            min_duration_ms,
            extra_duration_ms,
        }
    }

    pub fn validate(&self) -> error::Result<Timing> {
        Ok(Timing {
            debounce_delay: non_negative("debounce_delay_ms", self.debounce_delay_ms)?,
            min_duration: non_negative("min_duration_ms", self.min_duration_ms)?,
            extra_duration: non_negative("extra_duration_ms", self.extra_duration_ms)?,
        })
    }
}

fn non_negative(field: &'static str, value: i64) -> error::Result<Duration> {
    u64::try_from(value)
        .map(Duration::from_millis)
        .map_err(|_| EngineError::InvalidConfig { field, value })
}

impl Config {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("busyd")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "parsing config TOML")
    }
}

pub fn socket_path() -> PathBuf {
    // BUSYD_SOCK overrides for testing.
    if let Ok(path) = std::env::var("BUSYD_SOCK") {
        return PathBuf::from(path);
    }
    PathBuf::from("/run/busyd/busyd.sock")
}
