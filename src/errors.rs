//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. Each [`Error`]
//! variant maps onto one of the four action codes the UI understands
//! (see [`ActionErrorCode`]); the HTTP layer turns that into a status code
//! and a JSON body.

use serde::Serialize;
use thiserror::Error;

/// Error codes returned to action callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionErrorCode {
    /// Missing session, bad credentials or insufficient role
    Unauthorized,
    /// Anything unexpected; details stay in the server log
    InternalError,
    /// The addressed row does not exist
    NotFound,
    /// Input failed validation
    ValidationError,
}

impl ActionErrorCode {
    /// Wire representation of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::ValidationError => "VALIDATION_ERROR",
        }
    }
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("{message}")]
    Validation { message: String },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("Payment provider error: {message}")]
    Payment { message: String },

    #[error("Webhook rejected: {reason}")]
    Webhook { reason: String },

    #[error("Password hashing error: {message}")]
    PasswordHash { message: String },

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a missing row.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Shorthand for an authorization failure.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// The action code this error is reported as.
    #[must_use]
    pub const fn code(&self) -> ActionErrorCode {
        match self {
            Self::Validation { .. } | Self::InvalidAmount { .. } => ActionErrorCode::ValidationError,
            Self::NotFound { .. } => ActionErrorCode::NotFound,
            Self::Unauthorized { .. } | Self::Token(_) => ActionErrorCode::Unauthorized,
            Self::Config { .. }
            | Self::Database(_)
            | Self::Payment { .. }
            | Self::Webhook { .. }
            | Self::PasswordHash { .. }
            | Self::Http(_)
            | Self::Json(_)
            | Self::Io(_)
            | Self::EnvVar(_) => ActionErrorCode::InternalError,
        }
    }

    /// True when the underlying database error is a unique constraint violation.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(db_err)
                if matches!(db_err.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_)))
        )
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
