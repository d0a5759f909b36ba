//! Error hierarchy for Blister
//!
//! The metrics core itself never fails: missing or malformed platform data
//! degrades to empty contributions. These types cover the boundary around
//! it, where raw JSON blobs and configuration files are read.

use thiserror::Error;

/// Top-level error type for all Blister operations
#[derive(Debug, Error)]
pub enum BlisterError {
    /// Platform payload could not be decoded
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Record-level ingestion errors
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors raised while normalizing platform-native records
#[derive(Debug, Error, PartialEq)]
pub enum IngestError {
    /// Record carries no timestamp at all
    #[error("Missing timestamp in {platform} {category} record")]
    MissingTimestamp { platform: String, category: String },

    /// Timestamp present but not RFC 3339 or epoch milliseconds
    #[error("Invalid timestamp in {platform} record: {value}")]
    InvalidTimestamp { platform: String, value: String },

    /// Platform key not known to the engine
    #[error("Unsupported platform: {name}")]
    UnsupportedPlatform { name: String },
}

/// Result type alias for Blister operations
pub type Result<T> = std::result::Result<T, BlisterError>;

impl BlisterError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BlisterError::Ingest(IngestError::MissingTimestamp { .. }) => ErrorSeverity::Warning,
            BlisterError::Ingest(IngestError::InvalidTimestamp { .. }) => ErrorSeverity::Warning,
            BlisterError::Ingest(IngestError::UnsupportedPlatform { .. }) => ErrorSeverity::Info,
            BlisterError::Validation(_) => ErrorSeverity::Warning,
            BlisterError::Configuration(_) => ErrorSeverity::Error,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            BlisterError::Parse(_) => {
                "Platform data is not valid JSON. Try syncing your platforms again.".to_string()
            }
            BlisterError::Ingest(IngestError::UnsupportedPlatform { name }) => {
                format!("{} is not a supported platform yet", name)
            }
            BlisterError::Configuration(reason) => {
                format!("Configuration problem: {}. Check your config.toml.", reason)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents the operation
    Error,
    /// Record or value was skipped, operation continued
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
