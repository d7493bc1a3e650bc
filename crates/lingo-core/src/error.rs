//! Error types for lingo operations.
//!
//! A single error enum covers the scheduler and the review store. Each variant
//! maps to a stable [`ErrorCode`] for programmatic handling.

use thiserror::Error;

/// Result type alias for lingo operations.
pub type LingoResult<T> = Result<T, LingoError>;

/// Main error type for all lingo operations.
#[derive(Error, Debug)]
pub enum LingoError {
    /// Review outcome label is not one of `again`, `hard`, `good`, `easy`.
    #[error("Invalid outcome: '{label}' (expected one of again, hard, good, easy)")]
    InvalidOutcome { label: String, code: ErrorCode },

    /// Flashcard not found.
    #[error("Flashcard not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        card_id: Option<String>,
    },

    /// Another writer updated the card since it was read.
    #[error("Concurrent update on flashcard '{card_id}': expected version {expected}, found {actual}")]
    Conflict {
        card_id: String,
        expected: u64,
        actual: u64,
        code: ErrorCode,
    },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Review (REV_xxx)
    RevInvalidOutcome,

    // Flashcard (CARD_xxx)
    CardNotFound,
    CardConflict,
    CardCorrupted,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Configuration
    Config,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RevInvalidOutcome => "REV_001",
            ErrorCode::CardNotFound => "CARD_001",
            ErrorCode::CardConflict => "CARD_002",
            ErrorCode::CardCorrupted => "CARD_003",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::Config => "CFG_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl LingoError {
    /// Create an invalid outcome error.
    pub fn invalid_outcome(label: impl Into<String>) -> Self {
        Self::InvalidOutcome {
            label: label.into(),
            code: ErrorCode::RevInvalidOutcome,
        }
    }

    /// Create a not found error.
    pub fn not_found(card_id: impl Into<String>) -> Self {
        let id = card_id.into();
        Self::NotFound {
            message: format!("Flashcard with id '{}' not found", id),
            code: ErrorCode::CardNotFound,
            card_id: Some(id),
        }
    }

    /// Create a version conflict error.
    pub fn conflict(card_id: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::Conflict {
            card_id: card_id.into(),
            expected,
            actual,
            code: ErrorCode::CardConflict,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create a database error for a row that could not be decoded.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::CardCorrupted,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidOutcome { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Conflict { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::Config,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::InvalidOutcome { .. } => Some("Use one of: again, hard, good, easy"),
            Self::NotFound { .. } => Some("Please check the flashcard ID and ensure it exists"),
            Self::Conflict { .. } => Some("Reload the flashcard and submit the review again"),
            Self::Configuration(_) => Some("Please check your scheduler and store settings"),
            _ => None,
        }
    }

    /// Whether the failed operation can be retried after reloading state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<rusqlite::Error> for LingoError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}
