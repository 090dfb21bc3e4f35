/// Error type for everything loaded code and its engine can report.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ActionError {
    /// Permanent failure raised by the action's own logic.
    #[error("fatal: {error}")]
    Fatal {
        /// Human-readable error message.
        error: String,
        /// Optional structured details about the failure.
        details: Option<serde_json::Value>,
    },

    /// The input did not have the shape the action expects.
    #[error("validation: {0}")]
    Validation(String),

    /// The action requested a capability it was not granted.
    #[error("sandbox violation: capability `{capability}` denied for action `{action}`")]
    SandboxViolation {
        /// The capability that was denied.
        capability: String,
        /// The entry point that requested it.
        action: String,
    },

    /// The engine could not be configured, started or driven.
    #[error("engine: {0}")]
    Engine(String),
}

impl ActionError {
    /// Create a fatal error.
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal {
            error: msg.into(),
            details: None,
        }
    }

    /// Create a fatal error with structured details.
    pub fn fatal_with_details(msg: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Fatal {
            error: msg.into(),
            details: Some(details),
        }
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an engine error.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Returns `true` if the error was raised by a capability check.
    pub fn is_sandbox_violation(&self) -> bool {
        matches!(self, Self::SandboxViolation { .. })
    }

    /// Structured details, if present.
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Fatal { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_with_details() {
        let details = serde_json::json!({"field": "amount"});
        let err = ActionError::fatal_with_details("rejected", details.clone());
        assert_eq!(err.details(), Some(&details));
        assert!(!err.is_sandbox_violation());
    }

    #[test]
    fn display_formatting() {
        assert_eq!(ActionError::fatal("bad input").to_string(), "fatal: bad input");
        assert_eq!(
            ActionError::validation("missing field").to_string(),
            "validation: missing field"
        );
        assert_eq!(
            ActionError::engine("no input route").to_string(),
            "engine: no input route"
        );
        let err = ActionError::SandboxViolation {
            capability: "Network(evil.com)".into(),
            action: "demo.Echo".into(),
        };
        assert!(err.is_sandbox_violation());
        assert_eq!(
            err.to_string(),
            "sandbox violation: capability `Network(evil.com)` denied for action `demo.Echo`"
        );
    }
}
