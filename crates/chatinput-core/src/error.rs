//! Error types for chatinput-core.
//!
//! Only misuse crosses the public contract. Validation failures and lost
//! races are ordinary outcomes, not errors.

use thiserror::Error;

use crate::config::ConfigValidationError;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, InputError>;

/// Errors raised by the input coordinator
#[derive(Debug, Error)]
pub enum InputError {
    /// `instance()` was called before `initialize()`
    #[error("input coordinator not initialized; call chatinput_core::initialize first")]
    NotInitialized,

    /// The coordinator configuration was rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigValidationError),
}

impl InputError {
    /// Check if this error is an initialization-order error
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = InputError::NotInitialized;
        assert!(err.is_not_initialized());
        assert!(err.to_string().contains("not initialized"));

        let err: InputError = ConfigValidationError::InvalidValue {
            field: "cancel_keyword".into(),
            message: "must not be blank".into(),
        }
        .into();
        assert!(!err.is_not_initialized());
        assert!(err.to_string().contains("cancel_keyword"));
    }
}
