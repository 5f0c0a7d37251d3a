//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Location
//!
//! Searched in order:
//! 1. `--config <path>` on the command line
//! 2. `$GITAPI_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/gitapi/config.toml`
//! 4. `~/.gitapi/config.toml`
//!
//! # Validation
//!
//! Values are validated after parsing (e.g., `default_branch` must be a
//! valid branch name).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Gateway configuration file.
///
/// # Example
///
/// ```toml
/// storage_root = "/srv/git"
/// listen = "0.0.0.0:4567"
/// default_branch = "master"
/// lock_timeout_ms = 5000
///
/// [hooks]
/// enable = ["post-update"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Directory holding the bare repositories
    pub storage_root: Option<PathBuf>,

    /// Socket address the HTTP server binds to
    pub listen: Option<String>,

    /// Branch `HEAD` points at in newly created repositories
    pub default_branch: Option<String>,

    /// Maximum wait for a contended branch lock, in milliseconds
    pub lock_timeout_ms: Option<u64>,

    /// Hook defaults for created repositories
    pub hooks: Option<HooksConfig>,
}

impl GatewayConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.default_branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid default_branch: {}", e))
            })?;
        }

        if self.lock_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue(
                "lock_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if let Some(listen) = &self.listen {
            listen.parse::<std::net::SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue(format!("invalid listen address '{}': {}", listen, e))
            })?;
        }

        if let Some(root) = &self.storage_root {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "storage_root cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Hook activation defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HooksConfig {
    /// Hooks enabled on every repository the gateway creates
    pub enable: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_empty() {
        let config = GatewayConfig::default();
        assert!(config.storage_root.is_none());
        assert!(config.listen.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_default_branch() {
        let config = GatewayConfig {
            default_branch: Some("bad..name".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_lock_timeout_rejected() {
        let config = GatewayConfig {
            lock_timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_listen_rejected() {
        let config = GatewayConfig {
            listen: Some("not-an-address".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn roundtrip() {
        let config = GatewayConfig {
            storage_root: Some(PathBuf::from("/srv/git")),
            listen: Some("127.0.0.1:8080".to_string()),
            default_branch: Some("main".to_string()),
            lock_timeout_ms: Some(250),
            hooks: Some(HooksConfig {
                enable: Some(vec!["post-update".to_string()]),
            }),
        };

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: GatewayConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn reject_unknown_fields() {
        let toml = r#"
            storage_root = "/srv/git"
            unknown_field = true
        "#;

        let result: Result<GatewayConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
