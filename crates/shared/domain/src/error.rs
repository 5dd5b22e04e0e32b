//! Domain-level errors.
//!
//! These errors represent rule violations detected before storage is touched.
//! They are independent of infrastructure concerns (CLI, database).

use thiserror::Error;

/// Domain-specific errors for business rule violations.
#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// Validation failed for a field or input
    #[error("{0}")]
    Validation(String),

    /// Password hashing or hash parsing failed
    #[error("Password error: {0}")]
    Password(String),
}

impl DomainError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    /// Create a password error
    pub fn password(msg: impl Into<String>) -> Self {
        DomainError::Password(msg.into())
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
