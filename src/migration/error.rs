use std::time::Duration;

use thiserror::Error;

use crate::ternary::TernaryError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("{operation} failed: {message}")]
    Network {
        operation: &'static str,
        message: String,
    },
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("{0}")]
    ProtocolViolation(String),
    #[error("balance {available} is below the minimum migratable amount {minimum}")]
    InsufficientBalance { available: u64, minimum: u64 },
    #[error("bundle mining did not finish within {0:?}")]
    MiningTimeout(Duration),
    #[error("encoding failed: {0}")]
    Encoding(String),
    #[error("no migration bundle with index {0}")]
    MissingBundle(u32),
    #[error("{message}")]
    RequestRejected {
        status: Option<u16>,
        message: String,
    },
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },
    #[error("{operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl MigrationError {
    pub fn protocol(message: impl Into<String>) -> Self {
        MigrationError::ProtocolViolation(message.into())
    }

    pub fn collaborator(collaborator: &'static str, message: impl ToString) -> Self {
        MigrationError::Collaborator {
            collaborator,
            message: message.to_string(),
        }
    }

    /// Machine readable code surfaced through [`crate::AppError`].
    pub fn code(&self) -> &'static str {
        match self {
            MigrationError::Network { .. } => "MIGRATION/NETWORK",
            MigrationError::Timeout { .. } => "MIGRATION/TIMEOUT",
            MigrationError::ProtocolViolation(_) => "MIGRATION/PROTOCOL",
            MigrationError::InsufficientBalance { .. } => "MIGRATION/INSUFFICIENT_BALANCE",
            MigrationError::MiningTimeout(_) => "MIGRATION/MINING_TIMEOUT",
            MigrationError::Encoding(_) => "MIGRATION/ENCODING",
            MigrationError::MissingBundle(_) => "MIGRATION/MISSING_BUNDLE",
            MigrationError::RequestRejected { .. } => "MIGRATION/REQUEST_REJECTED",
            MigrationError::Collaborator { .. } => "MIGRATION/COLLABORATOR",
            MigrationError::Io { .. } => "MIGRATION/IO",
        }
    }

    /// Localisation key the UI renders for this failure.
    pub fn locale_key(&self) -> &'static str {
        match self {
            MigrationError::MissingBundle(_) => "error.migration.missingBundle",
            MigrationError::InsufficientBalance { .. } => "error.migration.insufficientBalance",
            MigrationError::MiningTimeout(_) => "error.migration.miningTimeout",
            MigrationError::Timeout { .. } | MigrationError::Network { .. } => {
                "error.migration.network"
            }
            _ => "error.global.generic",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            MigrationError::Network { .. }
            | MigrationError::Timeout { .. }
            | MigrationError::MiningTimeout(_) => true,
            MigrationError::RequestRejected { status, .. } => {
                matches!(status, Some(code) if *code >= 500)
            }
            _ => false,
        }
    }
}

impl From<TernaryError> for MigrationError {
    fn from(error: TernaryError) -> Self {
        MigrationError::ProtocolViolation(error.to_string())
    }
}

impl From<serde_json::Error> for MigrationError {
    fn from(error: serde_json::Error) -> Self {
        MigrationError::Encoding(error.to_string())
    }
}
