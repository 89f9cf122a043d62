//! Error types shared across the crate.
use std::error::Error;
use std::fmt;

/// Indicates that the supplied run configuration is malformed or inconsistent.
///
/// Raised before model construction; a configuration that passes validation never
/// fails inside the optimisation itself for input-related reasons.
#[derive(Debug, Clone)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// Create a new error with the given message
    pub fn new(message: impl Into<String>) -> ValidationError {
        ValidationError {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid configuration: {}", self.message)
    }
}

/// This is needed so that ValidationError can be treated like standard errors are.
impl Error for ValidationError {}

/// Shorthand for results in the validation layer
pub type ValidationResult<T> = Result<T, ValidationError>;
