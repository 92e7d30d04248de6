//! Error types for relock

use thiserror::Error;

/// Result type alias for preference store operations
pub type Result<T> = std::result::Result<T, PreferencesError>;

/// The monotonic clock could not be read.
///
/// There is no safe fallback for this: guessing that the grace period has
/// elapsed locks users out, guessing that it has not exposes protected
/// content. The policy turns it into a panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The OS primitive returned an error
    #[error("Monotonic clock unavailable (errno {0})")]
    Unavailable(i32),
}

/// Errors raised while loading or saving preferences
#[derive(Debug, Error)]
pub enum PreferencesError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No data directory could be resolved for the default path
    #[error("No data directory available for preferences")]
    NoDataDir,
}

impl From<serde_json::Error> for PreferencesError {
    fn from(e: serde_json::Error) -> Self {
        PreferencesError::Serialization(e.to_string())
    }
}
