//! TOML-based configuration for the server.
//!
//! Reads and writes `AppConfig` at the platform-appropriate path unless the
//! command line names a file explicitly:
//! - Linux:    `$XDG_CONFIG_HOME/langsync/config.toml` (or `~/.config/langsync`)
//! - macOS:    `~/Library/Application Support/LangSync/config.toml`
//! - Windows:  `%APPDATA%\LangSync\config.toml`
//!
//! ```toml
//! [server]
//! name = "desk"
//! log_level = "info"
//!
//! [network]
//! port = 24800
//! keep_alive_secs = 3.0
//!
//! [keyboard]
//! backend = "static"
//! layouts = ["en", "fr"]
//! active = "en"
//! ```
//!
//! Every field has a serde default, so a missing file, an empty file, or a
//! file written by an older release all load.

use std::path::{Path, PathBuf};
use std::time::Duration;

use langsync_core::{LayoutCode, ProtocolVersion};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub keyboard: KeyboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Name of this screen, used in log lines.
    #[serde(default = "default_name")]
    pub name: String,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Highest 1.x minor version offered in the hello.
    #[serde(default = "default_max_protocol_minor")]
    pub max_protocol_minor: u16,
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// IP address to listen on.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Interval between keep-alives sent to 1.3+ clients.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: f64,
}

/// Which keyboard-layout backend to use.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardBackend {
    /// Layouts come from this file; switching only updates memory.
    #[default]
    Static,
    /// X11 keyboard groups via XKB (Linux only).
    Xkb,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyboardConfig {
    #[serde(default)]
    pub backend: KeyboardBackend,
    /// Installed layouts for the static backend, in priority order.
    #[serde(default = "default_layouts")]
    pub layouts: Vec<LayoutCode>,
    /// Initially active layout; the first listed layout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<LayoutCode>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_name() -> String {
    "server".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_protocol_minor() -> u16 {
    ProtocolVersion::CURRENT.minor
}
fn default_handshake_timeout_secs() -> u64 {
    30
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    24800
}
fn default_keep_alive_secs() -> f64 {
    3.0
}
fn default_layouts() -> Vec<LayoutCode> {
    vec![LayoutCode::new('e', 'n')]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            max_protocol_minor: default_max_protocol_minor(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            backend: KeyboardBackend::default(),
            layouts: default_layouts(),
            active: None,
        }
    }
}

impl AppConfig {
    /// The version offered in the hello, capped at what this build speaks.
    pub fn protocol_version(&self) -> ProtocolVersion {
        ProtocolVersion::new(
            1,
            self.server
                .max_protocol_minor
                .min(ProtocolVersion::CURRENT.minor),
        )
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.server.handshake_timeout_secs)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `keep_alive_secs` is not a
    /// positive, finite number.
    pub fn keep_alive(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.network.keep_alive_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "keep_alive_secs must be positive, got {}",
                    self.network.keep_alive_secs
                ))
            })
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.network.bind_address, self.network.port)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform path, or defaults if no file exists.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("LangSync"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("langsync"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("LangSync")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
