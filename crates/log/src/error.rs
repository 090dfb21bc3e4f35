/// Result type for logger operations
pub type LogResult<T> = Result<T, LogError>;

/// Error type for logger operations
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LogError {
    /// Filter parsing error
    #[error("Invalid filter: {0}")]
    Filter(String),

    /// The global subscriber could not be installed
    #[error("Cannot install subscriber: {0}")]
    Init(String),
}
