//! Server configuration.
//!
//! Loaded with precedence:
//! 1. `--config PATH` (or `CHATINPUT_CONFIG`)
//! 2. `~/.chatinput/config.toml`
//! 3. Default values
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:4000"
//! ansi_colors = true
//!
//! [prompts]
//! nickname_timeout_secs = 60
//! feedback_timeout_secs = 120
//!
//! [input]
//! cancel_keyword = "exit"
//! color_code_char = "&"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chatinput_core::{ConfigValidationError, CoordinatorConfig};
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "CHATINPUT_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener settings
    pub server: ServerConfig,

    /// Built-in prompt flows
    pub prompts: PromptConfig,

    /// Input coordinator defaults
    pub input: CoordinatorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind: String,

    /// Render color codes as ANSI escapes (otherwise strip them)
    pub ansi_colors: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Seconds before an unanswered nickname prompt assigns a guest name (0 = never)
    pub nickname_timeout_secs: u64,

    /// Seconds before an unanswered feedback prompt expires (0 = never)
    pub feedback_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            ansi_colors: true,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            nickname_timeout_secs: 60,
            feedback_timeout_secs: 120,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:4000".to_string()
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bind address {0:?}: expected HOST:PORT")]
    InvalidBind(String),

    #[error(transparent)]
    Input(#[from] ConfigValidationError),
}

impl Config {
    /// Load from `path` if given, otherwise from the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::config_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load and parse a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            PathBuf::from(path)
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".chatinput")
                .join("config.toml")
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let port_ok = self
            .server
            .bind
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
        if !port_ok {
            return Err(ConfigError::InvalidBind(self.server.bind.clone()));
        }

        self.input.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:4000");
        assert!(config.server.ansi_colors);
        assert_eq!(config.prompts.nickname_timeout_secs, 60);
        assert_eq!(config.input.cancel_keyword, "exit");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nansi_colors = false\n\n[input]\ncancel_keyword = \"quit\""
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert!(!config.server.ansi_colors);
        assert_eq!(config.server.bind, "127.0.0.1:4000");
        assert_eq!(config.input.cancel_keyword, "quit");
        assert_eq!(config.prompts.feedback_timeout_secs, 120);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nbind = ").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_validate_bind() {
        let mut config = Config::default();
        for bad in ["4000", ":4000", "localhost:http", ""] {
            config.server.bind = bad.to_string();
            assert!(matches!(config.validate(), Err(ConfigError::InvalidBind(_))), "{bad}");
        }

        config.server.bind = "[::1]:0".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_input_section() {
        let mut config = Config::default();
        config.input.cancel_keyword = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Input(_))));
    }

    #[test]
    fn test_config_path_ends_with_file_name() {
        assert!(
            Config::config_path().ends_with("config.toml") || std::env::var(CONFIG_ENV).is_ok()
        );
    }
}
