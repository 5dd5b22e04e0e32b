//! Unified error handling for account operations.
//!
//! Provides a single error type with stable codes, user-facing messages that
//! hide storage details, and conversion into the `(success, message)` outcome
//! handed to callers.

use domain::DomainError;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Lookup
    #[error("{0}")]
    NotFound(String),

    // Uniqueness
    #[error("{0}")]
    DuplicateAccount(String),

    // Authentication
    #[error("{0}")]
    InvalidCredentials(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    // External service errors
    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    // Internal
    #[error("Internal error")]
    Internal(String),
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateAccount(_) => "DUPLICATE_ACCOUNT",
            AppError::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            AppError::Validation(_) => "VALIDATION_ERROR",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            // Client errors carry their own message
            _ => self.to_string(),
        }
    }

    /// Whether the caller can fix this by changing its input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_)
                | AppError::DuplicateAccount(_)
                | AppError::InvalidCredentials(_)
                | AppError::Validation(_)
        )
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::Password(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

// =============================================================================
// Outcome
// =============================================================================

/// `(success, human-readable message)` pair returned for mutating operations.
pub type Outcome = (bool, String);

/// Collapse a result into an [`Outcome`].
pub trait IntoOutcome {
    fn into_outcome(self, success_message: &str) -> Outcome;
}

impl<T> IntoOutcome for AppResult<T> {
    fn into_outcome(self, success_message: &str) -> Outcome {
        match self {
            Ok(_) => (true, success_message.to_string()),
            Err(e) => (false, e.user_message()),
        }
    }
}

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self, msg: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, msg: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::not_found(msg))
    }
}

/// Convenience constructors
impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        AppError::DuplicateAccount(msg.into())
    }

    pub fn invalid_credentials(msg: impl Into<String>) -> Self {
        AppError::InvalidCredentials(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
