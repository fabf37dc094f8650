//! Outcome of validating a user's answer.

/// Result of an input validation check.
///
/// A failed result always carries the reason shown to the user; a valid one
/// never does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    /// Successful validation.
    pub fn ok() -> Self {
        Self::Valid
    }

    /// Failed validation with the message to report back to the user.
    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Failure reason, `None` when valid.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Invalid(reason) => Some(reason),
        }
    }
}

impl<E: Into<String>> From<Result<(), E>> for ValidationResult {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(reason) => Self::fail(reason),
        }
    }
}
