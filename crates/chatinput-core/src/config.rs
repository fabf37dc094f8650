//! Coordinator configuration.

use serde::{Deserialize, Serialize};

/// Cancel keyword used when neither the config nor the builder sets one.
pub const DEFAULT_CANCEL_KEYWORD: &str = "exit";

/// Alternate color-code prefix translated in prompts by default.
pub const DEFAULT_COLOR_CODE_CHAR: char = '&';

/// Defaults applied to every context built through a coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Keyword that cancels a pending context (default: "exit")
    pub cancel_keyword: String,

    /// Prefix of alternate color codes in prompts (default: '&').
    /// `None` sends prompts verbatim.
    pub color_code_char: Option<char>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            cancel_keyword: DEFAULT_CANCEL_KEYWORD.to_string(),
            color_code_char: Some(DEFAULT_COLOR_CODE_CHAR),
        }
    }
}

impl CoordinatorConfig {
    /// Set the default cancel keyword
    pub fn with_cancel_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.cancel_keyword = keyword.into();
        self
    }

    /// Set or disable the color-code prefix
    pub fn with_color_code_char(mut self, prefix: Option<char>) -> Self {
        self.color_code_char = prefix;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.cancel_keyword.trim().is_empty() {
            return Err(ConfigValidationError::InvalidValue {
                field: "cancel_keyword".into(),
                message: "must not be blank".into(),
            });
        }

        if let Some(prefix) = self.color_code_char {
            if prefix.is_whitespace() || prefix == crate::formatting::SECTION_SIGN {
                return Err(ConfigValidationError::InvalidValue {
                    field: "color_code_char".into(),
                    message: format!("{prefix:?} cannot be used as a color-code prefix"),
                });
            }
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.cancel_keyword, "exit");
        assert_eq!(config.color_code_char, Some('&'));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CoordinatorConfig::default()
            .with_cancel_keyword("quit")
            .with_color_code_char(None);

        assert_eq!(config.cancel_keyword, "quit");
        assert_eq!(config.color_code_char, None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = CoordinatorConfig::default().with_cancel_keyword("  ");
        assert!(config.validate().is_err());

        config.cancel_keyword = "stop".into();
        assert!(config.validate().is_ok());

        config.color_code_char = Some(' ');
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CoordinatorConfig = toml::from_str(r#"cancel_keyword = "cancel""#).unwrap();
        assert_eq!(config.cancel_keyword, "cancel");
        assert_eq!(config.color_code_char, Some('&'));
    }
}
