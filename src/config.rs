//! Driver configuration
//!
//! Stored as TOML. Every field has a default, so a partial file (or none at
//! all) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use panel_transport::FifoConfig;

/// Largest accepted poll timeout; bounds shutdown latency
pub const MAX_POLL_TIMEOUT_MS: u64 = 1000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid setting {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Panel driver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// FIFO device node
    pub device_path: PathBuf,
    /// Separate node for outbound LED bytes, for panels wired as two pipes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_device_path: Option<PathBuf>,
    /// Byte terminating one inbound line
    pub line_delimiter: u8,
    /// Bound on one read attempt
    pub poll_timeout_ms: u64,
    /// Back-off after a non-transient I/O error
    pub error_sleep_ms: u64,
    /// Periodic LED transmission interval; 0 disables the timer
    pub flush_interval_ms: u64,
    /// Initial state of the MIDI routing switch
    pub send_midi: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/mcu_fifo"),
            tx_device_path: None,
            line_delimiter: b'\n',
            poll_timeout_ms: 5,
            error_sleep_ms: 100,
            flush_interval_ms: 20,
            send_midi: true,
        }
    }
}

impl PanelConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("panel-driver")
            .join("panel.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_timeout_ms == 0 || self.poll_timeout_ms > MAX_POLL_TIMEOUT_MS {
            return Err(ConfigError::Invalid {
                field: "poll_timeout_ms",
                reason: format!(
                    "must be between 1 and {MAX_POLL_TIMEOUT_MS}, got {}",
                    self.poll_timeout_ms
                ),
            });
        }
        if self.device_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "device_path",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn error_sleep(&self) -> Duration {
        Duration::from_millis(self.error_sleep_ms)
    }

    /// `None` when periodic transmission is disabled
    pub fn flush_interval(&self) -> Option<Duration> {
        (self.flush_interval_ms > 0).then(|| Duration::from_millis(self.flush_interval_ms))
    }

    pub fn fifo(&self) -> FifoConfig {
        FifoConfig {
            delimiter: self.line_delimiter,
            poll_timeout: self.poll_timeout(),
            tx_path: self.tx_device_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PanelConfig::default();
        assert_eq!(config.device_path, PathBuf::from("/dev/mcu_fifo"));
        assert_eq!(config.line_delimiter, 0x0A);
        assert_eq!(config.flush_interval(), Some(Duration::from_millis(20)));
        assert!(config.send_midi);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: PanelConfig = toml::from_str("send_midi = false\npoll_timeout_ms = 10\n").unwrap();
        assert!(!config.send_midi);
        assert_eq!(config.poll_timeout_ms, 10);
        assert_eq!(config.device_path, PathBuf::from("/dev/mcu_fifo"));
        assert_eq!(config.error_sleep_ms, 100);
    }

    #[test]
    fn test_validate_poll_timeout() {
        let mut config = PanelConfig {
            poll_timeout_ms: 0,
            ..PanelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "poll_timeout_ms",
                ..
            })
        ));
        config.poll_timeout_ms = MAX_POLL_TIMEOUT_MS + 1;
        assert!(config.validate().is_err());
        config.poll_timeout_ms = MAX_POLL_TIMEOUT_MS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_flush_interval_zero_disables_timer() {
        let config = PanelConfig {
            flush_interval_ms: 0,
            ..PanelConfig::default()
        };
        assert_eq!(config.flush_interval(), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel-driver").join("panel.toml");
        let config = PanelConfig {
            device_path: PathBuf::from("/tmp/panel_rx"),
            tx_device_path: Some(PathBuf::from("/tmp/panel_tx")),
            line_delimiter: 0x00,
            send_midi: false,
            ..PanelConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PanelConfig::load(&path).unwrap(), config);
        assert_eq!(config.fifo().tx_path, Some(PathBuf::from("/tmp/panel_tx")));
    }

    #[test]
    fn test_default_omits_tx_device() {
        let text = toml::to_string_pretty(&PanelConfig::default()).unwrap();
        assert!(!text.contains("tx_device_path"));
        assert_eq!(PanelConfig::default().fifo().tx_path, None);
    }

    #[test]
    fn test_missing_file_gives_default() {
        let path = Path::new("/nonexistent/panel-driver/panel.toml");
        assert_eq!(PanelConfig::load(path).unwrap(), PanelConfig::default());
    }

    #[test]
    fn test_parse_error_names_file() {
        let mut file = tempfile::Builder::new()
            .prefix("panel-bad-")
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(b"poll_timeout_ms = \"fast\"").unwrap();
        let err = PanelConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("panel-bad-"));
    }
}
