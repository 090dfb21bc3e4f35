//! Runtime error types.

use cirrus_json::ParseError;
use cirrus_loader::{InvocationError, LoadError};

/// Errors from the lifecycle controller. Every variant ends the request it
/// occurred in; none of them change the runtime state.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RuntimeError {
    /// `init` after a successful `init`.
    #[error("Cannot initialize the action more than once.")]
    AlreadyInitialized,

    /// `run` before a successful `init`.
    #[error("Cannot invoke an uninitialized action.")]
    Uninitialized,

    /// The request body is not a well-formed document.
    #[error("malformed document: {0}")]
    Parse(#[from] ParseError),

    /// The document parsed but does not have the expected shape.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// The archive or entry point could not be loaded.
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// The loaded action failed while running.
    #[error("{0}")]
    Invocation(#[from] InvocationError),

    /// A blocking task was lost.
    #[error("runtime error: {0}")]
    Internal(String),
}

impl RuntimeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidDocument(message.into())
    }

    /// The message sent back to the caller. Lifecycle rejections are sent
    /// verbatim; everything else is wrapped in a generic prefix, and the
    /// details go to the log.
    pub fn wire_message(&self) -> String {
        match self {
            Self::AlreadyInitialized | Self::Uninitialized => self.to_string(),
            other => format!("An error has occurred (see logs for details): {other}"),
        }
    }

    /// Whether the error is a lifecycle rejection rather than a failure of
    /// the request itself.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::AlreadyInitialized | Self::Uninitialized)
    }
}
