//! Session configuration

use nxt_throttle_calibration::{DEFAULT_LEEWAY_TICKS, DEFAULT_THROTTLE_DEAD_ZONE};
use nxt_throttle_protocol::ResponseLayout;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// The brick powers down after this long without traffic at its shortest
/// sleep setting.
pub const DEVICE_MIN_SLEEP_TIMEOUT_MS: u64 = 120_000;

pub const MAX_LEEWAY_TICKS: i32 = 16;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Tunables for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Offset of the rotation count in a received reply: 23 for length
    /// prefixed stream replies, 21 for bare endpoint transfers.
    pub rotation_offset: usize,
    pub leeway_ticks: i32,
    pub throttle_dead_zone_percent: f64,
    pub poll_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub connect_attempts: u32,
    pub connect_retry_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rotation_offset: ResponseLayout::STREAM_ROTATION_OFFSET,
            leeway_ticks: DEFAULT_LEEWAY_TICKS,
            throttle_dead_zone_percent: DEFAULT_THROTTLE_DEAD_ZONE,
            poll_interval_ms: 5,
            heartbeat_interval_ms: 30_000,
            connect_attempts: 5,
            connect_retry_delay_ms: 250,
        }
    }
}

impl SessionConfig {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: SessionConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;

        debug!(path = %path.display(), "loaded session config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.layout()?;

        if !(0..=MAX_LEEWAY_TICKS).contains(&self.leeway_ticks) {
            return Err(ConfigError::invalid(
                "leeway_ticks",
                format!("{} is outside 0..={MAX_LEEWAY_TICKS}", self.leeway_ticks),
            ));
        }
        if !(0.0..100.0).contains(&self.throttle_dead_zone_percent) {
            return Err(ConfigError::invalid(
                "throttle_dead_zone_percent",
                format!("{} is outside 0..100", self.throttle_dead_zone_percent),
            ));
        }
        if !(1..=1000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::invalid(
                "poll_interval_ms",
                format!("{} is outside 1..=1000", self.poll_interval_ms),
            ));
        }
        if self.heartbeat_interval_ms == 0
            || self.heartbeat_interval_ms >= DEVICE_MIN_SLEEP_TIMEOUT_MS
        {
            return Err(ConfigError::invalid(
                "heartbeat_interval_ms",
                format!(
                    "{} must be positive and below the {DEVICE_MIN_SLEEP_TIMEOUT_MS} ms sleep timeout",
                    self.heartbeat_interval_ms
                ),
            ));
        }
        if self.connect_attempts == 0 {
            return Err(ConfigError::invalid(
                "connect_attempts",
                "at least one attempt is required",
            ));
        }
        Ok(())
    }

    /// Reply layout selected by `rotation_offset`.
    pub fn layout(&self) -> Result<ResponseLayout, ConfigError> {
        ResponseLayout::from_rotation_offset(self.rotation_offset)
            .map_err(|e| ConfigError::invalid("rotation_offset", e.to_string()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rotation_offset, 23);
        assert_eq!(config.connect_attempts, 5);
    }

    #[test]
    fn test_endpoint_offset_selects_endpoint_layout() -> Result<(), ConfigError> {
        let config = SessionConfig {
            rotation_offset: 21,
            ..SessionConfig::default()
        };
        assert_eq!(config.layout()?, ResponseLayout::Endpoint);
        Ok(())
    }

    #[test]
    fn test_rejects_unknown_offset() {
        let config = SessionConfig {
            rotation_offset: 22,
            ..SessionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "rotation_offset",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_heartbeat_at_sleep_timeout() {
        let config = SessionConfig {
            heartbeat_interval_ms: DEVICE_MIN_SLEEP_TIMEOUT_MS,
            ..SessionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "heartbeat_interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_zero_attempts_and_wide_leeway() {
        let zero_attempts = SessionConfig {
            connect_attempts: 0,
            ..SessionConfig::default()
        };
        assert!(zero_attempts.validate().is_err());

        let wide_leeway = SessionConfig {
            leeway_ticks: 17,
            ..SessionConfig::default()
        };
        assert!(wide_leeway.validate().is_err());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{ "leeway_ticks": 2, "poll_interval_ms": 20 }}"#)?;

        let config = SessionConfig::load_from_path(file.path())?;
        assert_eq!(config.leeway_ticks, 2);
        assert_eq!(config.poll_interval_ms, 20);
        assert_eq!(config.heartbeat_interval_ms, 30_000);
        Ok(())
    }

    #[test]
    fn test_load_rejects_invalid_values() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{ "rotation_offset": 7 }}"#)?;

        let result = SessionConfig::load_from_path(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        let result = SessionConfig::load_from_path("/nonexistent/nxt/session.json");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
