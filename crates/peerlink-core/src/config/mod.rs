//! Configuration management for PeerLink.
//!
//! Every setting has a default, so a missing configuration file simply means
//! "run with defaults". Settings can be overridden per section in TOML:
//!
//! ```toml
//! [server]
//! port = 9000
//!
//! [share]
//! code_range = [50000, 50999]
//! accept_timeout = "10m"
//!
//! [download]
//! idle_timeout = "1m"
//! ```
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/peerlink/config.toml` |
//! | macOS | `~/Library/Application Support/PeerLink/config.toml` |
//! | Windows | `%APPDATA%\PeerLink\config.toml` |

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::code::CodeGenerator;
use crate::error::{Error, Result};

/// Main configuration struct for PeerLink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP gateway settings
    pub server: ServerConfig,
    /// Share code and file server settings
    pub share: ShareConfig,
    /// Download relay settings
    pub download: DownloadConfig,
    /// Scratch storage settings
    pub storage: StorageConfig,
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Largest accepted upload request body, in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_HTTP_PORT,
            max_upload_bytes: crate::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Socket address for the HTTP listener.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::InvalidConfig {
                key: "server.host".to_string(),
                reason: format!("{e}"),
            })
    }
}

/// Share code and ephemeral file server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Inclusive range share codes (ports) are drawn from
    pub code_range: (u16, u16),
    /// Address the one-shot listeners bind to
    pub bind_address: String,
    /// Bytes written per chunk while streaming a file
    pub chunk_size: usize,
    /// Retire a listener nobody connected to after this long
    #[serde(
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub accept_timeout: Option<Duration>,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            code_range: (
                crate::DEFAULT_CODE_RANGE_START,
                crate::DEFAULT_CODE_RANGE_END,
            ),
            bind_address: "0.0.0.0".to_string(),
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
            accept_timeout: None,
        }
    }
}

impl ShareConfig {
    /// Build a code generator over the configured range.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is empty or includes port 0.
    pub fn code_generator(&self) -> Result<CodeGenerator> {
        CodeGenerator::new(self.code_range.0, self.code_range.1)
    }
}

/// Download relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Host the relay dials to reach a share's listener
    pub connect_host: String,
    /// Give up connecting after this long
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Give up when no byte arrives for this long
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            connect_host: "127.0.0.1".to_string(),
            connect_timeout: Duration::from_secs(crate::DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(crate::DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

/// Scratch storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for uploaded and relayed bytes (defaults to the system temp dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the scratch directory.
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(crate::SCRATCH_DIR_NAME))
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit path, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {e}"))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| Error::ConfigError(format!("Failed to write config: {e}")))
    }

    /// Check values that would only fail later at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        self.share.code_generator()?;

        if self.share.chunk_size == 0 {
            return Err(invalid("share.chunk_size", "must be greater than 0"));
        }
        if self.share.accept_timeout == Some(Duration::ZERO) {
            return Err(invalid("share.accept_timeout", "must be greater than 0"));
        }
        if self.download.connect_timeout.is_zero() {
            return Err(invalid("download.connect_timeout", "must be greater than 0"));
        }
        if self.download.idle_timeout.is_zero() {
            return Err(invalid("download.idle_timeout", "must be greater than 0"));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(invalid("server.max_upload_bytes", "must be greater than 0"));
        }
        let (start, end) = self.share.code_range;
        if (start..=end).contains(&self.server.port) {
            return Err(invalid("server.port", "must lie outside share.code_range"));
        }
        Ok(())
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "peerlink", "PeerLink")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

fn invalid(key: &str, reason: &str) -> Error {
    Error::InvalidConfig {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Durations as `"500ms"`, `"30s"` or `"5m"`.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let number = |digits: &str| {
            digits
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("invalid duration '{s}': {e}"))
        };

        if let Some(ms) = s.strip_suffix("ms") {
            number(ms).map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            number(secs).map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            number(mins)?
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or_else(|| format!("duration '{s}' is too large"))
        } else {
            Err(format!("invalid duration format '{s}'"))
        }
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| super::parse(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
