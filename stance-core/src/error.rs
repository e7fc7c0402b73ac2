//! Error types for Stance operations
//!
//! Every failure carries an explicit discriminant set at the point the
//! underlying error is classified. "Not found" is never an error: reads
//! return `Ok(None)` for absent documents.

use thiserror::Error;

/// Backing-store errors.
///
/// `PermissionDenied` is the access-control rejection the store's rules
/// produce - most commonly rate limiting - and must stay distinguishable
/// from generic failure so callers can surface a "too many requests"
/// condition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Permission denied during {operation}")]
    PermissionDenied { operation: String },

    #[error("Backend unavailable during {operation}: {reason}")]
    Unavailable { operation: String, reason: String },

    #[error("Corrupted document data: {reason}")]
    Corrupted { reason: String },
}

impl BackendError {
    /// Unavailable error for a named operation.
    pub fn unavailable(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Permission rejection for a named operation.
    pub fn permission_denied(operation: impl Into<String>) -> Self {
        Self::PermissionDenied {
            operation: operation.into(),
        }
    }
}

/// Local key-value bucket store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Settings storage error: {reason}")]
    Storage { reason: String },

    #[error("Settings serialization error: {reason}")]
    Serialization { reason: String },
}

/// Content validation errors, raised before any network call is attempted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please don't use domains or URLs in comments")]
    UrlNotAllowed,

    #[error("Comment text is empty")]
    Empty,

    #[error("Comment is {length} characters, maximum is {max}")]
    TooLong { length: usize, max: usize },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Stance errors.
#[derive(Debug, Clone, Error)]
pub enum StanceError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl StanceError {
    /// True when the failure is the backing store's access-control
    /// rejection - the condition presented to users as "too many requests".
    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            Self::Backend(BackendError::PermissionDenied { .. })
        )
    }

    /// True when the failure came from local validation, i.e. no network
    /// call was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for Stance operations.
pub type StanceResult<T> = Result<T, StanceError>;

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

// ============================================================================
// TESTS
// ============================================================================
