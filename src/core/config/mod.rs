//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (applied with the `with_*` builders)
//!
//! # Example
//!
//! ```no_run
//! use gitapi::core::config::Config;
//!
//! let result = Config::load(None).unwrap();
//! let config = result.config;
//!
//! println!("Repositories live in {}", config.storage_root().display());
//! println!("Listening on {}", config.listen());
//! ```

pub mod schema;

pub use schema::{GatewayConfig, HooksConfig};

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::types::BranchName;

/// Default HTTP listen address.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:4567";

/// Default branch-lock timeout.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Effective configuration.
///
/// Accessors apply defaults, so callers never see an unset value.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Values read from the config file
    pub file: GatewayConfig,
    /// Path to the config file (if loaded)
    file_path: Option<PathBuf>,
}

impl Config {
    /// Build a configuration from already-parsed file values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn from_file_config(file: GatewayConfig) -> Result<Self, ConfigError> {
        file.validate()?;
        Ok(Self {
            file,
            file_path: None,
        })
    }

    /// Load configuration.
    ///
    /// `explicit` (from `--config`) wins over the standard locations. Missing
    /// files at standard locations are not an error (defaults are used); a
    /// missing explicit file is.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed or
    /// validated.
    pub fn load(explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let found = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::locate(),
        };

        let (file, file_path) = match found {
            Some(path) => (Self::read_config(&path)?, Some(path)),
            None => (GatewayConfig::default(), None),
        };

        file.validate()?;

        if let (Some(root), Some(path)) = (&file.storage_root, &file_path) {
            if root.is_relative() {
                warnings.push(ConfigWarning {
                    message: format!(
                        "storage_root '{}' is relative and resolves against the working directory",
                        root.display()
                    ),
                    path: path.clone(),
                });
            }
        }

        Ok(ConfigLoadResult {
            config: Config { file, file_path },
            warnings,
        })
    }

    /// Find the config file in the standard locations.
    fn locate() -> Option<PathBuf> {
        // 1. Check $GITAPI_CONFIG
        if let Ok(path) = std::env::var("GITAPI_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/gitapi/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gitapi/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.gitapi/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".gitapi/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Read and parse a config file.
    fn read_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    // =========================================================================
    // CLI overrides
    // =========================================================================

    /// Override the storage root.
    pub fn with_storage_root(mut self, root: PathBuf) -> Self {
        self.file.storage_root = Some(root);
        self
    }

    /// Override the listen address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the address does not parse.
    pub fn with_listen(mut self, listen: String) -> Result<Self, ConfigError> {
        self.file.listen = Some(listen);
        self.file.validate()?;
        Ok(self)
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    /// Directory holding the bare repositories.
    ///
    /// Defaults to `<data dir>/gitapi/repos`, or `./repos` when the platform
    /// has no data directory.
    pub fn storage_root(&self) -> PathBuf {
        match &self.file.storage_root {
            Some(root) => root.clone(),
            None => dirs::data_local_dir()
                .map(|dir| dir.join("gitapi").join("repos"))
                .unwrap_or_else(|| PathBuf::from("repos")),
        }
    }

    /// HTTP listen address.
    ///
    /// Defaults to `127.0.0.1:4567`.
    pub fn listen(&self) -> SocketAddr {
        self.file
            .listen
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 4567)))
    }

    /// Branch `HEAD` points at in new repositories.
    ///
    /// Defaults to `master`.
    pub fn default_branch(&self) -> BranchName {
        self.file
            .default_branch
            .as_deref()
            .and_then(|name| BranchName::new(name).ok())
            .unwrap_or_default()
    }

    /// Maximum wait for a contended branch lock.
    ///
    /// Defaults to 5 seconds.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.file.lock_timeout_ms.unwrap_or(DEFAULT_LOCK_TIMEOUT_MS))
    }

    /// Hooks enabled on every created repository.
    pub fn default_hooks(&self) -> &[String] {
        self.file
            .hooks
            .as_ref()
            .and_then(|h| h.enable.as_deref())
            .unwrap_or(&[])
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }
}
