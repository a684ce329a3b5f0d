//! File configuration for the host tools.
//!
//! Read from a TOML file; every key is optional:
//!
//! ```toml
//! port = "/dev/ttyUSB0"
//! baud = 115200
//! timeout_ms = 2000
//! crc = true
//!
//! [fixed_point]
//! data_width = 16
//! frac_width = 10
//! signed = true
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::FixedPointConfig;
use crate::error::{LinkError, Result};
use crate::session::{SessionConfig, DEFAULT_READ_TIMEOUT};
use crate::transport::DEFAULT_BAUD_RATE;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default = "LinkConfig::default_baud")]
    pub baud: u32,
    #[serde(default = "LinkConfig::default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "LinkConfig::default_poll_ms")]
    pub poll_ms: u64,
    #[serde(default)]
    pub crc: bool,
    #[serde(default)]
    pub fixed_point: FixedPointConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: Self::default_baud(),
            timeout_ms: Self::default_timeout_ms(),
            poll_ms: Self::default_poll_ms(),
            crc: false,
            fixed_point: FixedPointConfig::default(),
        }
    }
}

impl LinkConfig {
    fn default_baud() -> u32 {
        DEFAULT_BAUD_RATE
    }
    fn default_timeout_ms() -> u64 {
        DEFAULT_READ_TIMEOUT.as_millis() as u64
    }
    fn default_poll_ms() -> u64 {
        1
    }

    /// Parse TOML text. Zero baud or timeout fall back to defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        let mut cfg: LinkConfig =
            toml::from_str(text).map_err(|e| LinkError::Config(e.to_string()))?;
        if cfg.baud == 0 {
            cfg.baud = Self::default_baud();
        }
        if cfg.timeout_ms == 0 {
            cfg.timeout_ms = Self::default_timeout_ms();
        }
        Ok(cfg)
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let text = std::fs::read_to_string(path)?;
            Self::from_toml(&text)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Session settings derived from this file.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_crc(self.crc)
            .with_read_timeout(Duration::from_millis(self.timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_ms))
    }
}
