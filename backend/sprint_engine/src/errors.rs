//! Application-wide error types.

use sprint_rules::{RulesError, WarCommand, WarStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    BusinessRule(String),

    #[error("cannot {command} a word war that is {from}")]
    InvalidStateTransition { from: WarStatus, command: WarCommand },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("enrollment {enrollment_id} has already been validated")]
    AlreadyValidated { enrollment_id: i64 },

    #[error("operation cancelled before any write")]
    Cancelled,
}

/// How an outer adapter should surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected request: the caller broke a domain rule.
    ClientError,
    NotFound,
    Forbidden,
    /// Opaque to the caller.
    Internal,
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn rule(message: impl Into<String>) -> Self {
        Self::BusinessRule(message.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::BusinessRule(_)
            | Self::InvalidStateTransition { .. }
            | Self::AlreadyValidated { .. } => ErrorClass::ClientError,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Forbidden(_) => ErrorClass::Forbidden,
            Self::Database(_) | Self::Migrate(_) | Self::Config(_) | Self::Cancelled => {
                ErrorClass::Internal
            }
        }
    }
}

impl From<RulesError> for EngineError {
    fn from(err: RulesError) -> Self {
        match err {
            // Event data, not process configuration: the request is rejected.
            RulesError::Configuration(msg) => Self::BusinessRule(msg),
            RulesError::InvalidTransition { from, command } => {
                Self::InvalidStateTransition { from, command }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
