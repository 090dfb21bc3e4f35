use std::path::Path;
use std::sync::Arc;

use crate::Object;
use crate::capability::{Capability, Policy};
use crate::error::ActionError;

/// Per-activation metadata supplied by the orchestrator in the run
/// environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activation {
    pub activation_id: Option<String>,
    pub action_name: Option<String>,
    pub namespace: Option<String>,
    /// Deadline in milliseconds since the Unix epoch.
    pub deadline: Option<u64>,
}

impl Activation {
    pub const ACTIVATION_ID: &'static str = "__OW_ACTIVATION_ID";
    pub const ACTION_NAME: &'static str = "__OW_ACTION_NAME";
    pub const NAMESPACE: &'static str = "__OW_NAMESPACE";
    pub const DEADLINE: &'static str = "__OW_DEADLINE";

    /// Read the well-known keys out of a run environment. Missing or
    /// mistyped keys are left empty.
    pub fn from_env(env: &Object) -> Self {
        let text = |key: &str| env.get(key).and_then(|v| v.as_str()).map(str::to_owned);
        let deadline = env.get(Self::DEADLINE).and_then(|v| {
            v.as_u64()
                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        });
        Self {
            activation_id: text(Self::ACTIVATION_ID),
            action_name: text(Self::ACTION_NAME),
            namespace: text(Self::NAMESPACE),
            deadline,
        }
    }
}

/// Invocation-scoped capability object handed to loaded code.
///
/// Every resource access the action makes should go through one of the
/// `check_*` methods. Denials are [`ActionError::SandboxViolation`].
#[derive(Debug, Clone)]
pub struct SandboxedContext {
    action: Arc<str>,
    policy: Arc<Policy>,
    activation: Activation,
}

impl SandboxedContext {
    pub fn new(action: impl Into<Arc<str>>, policy: Arc<Policy>) -> Self {
        Self {
            action: action.into(),
            policy,
            activation: Activation::default(),
        }
    }

    /// Attach the activation metadata of the current run.
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// The entry point being invoked.
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn activation(&self) -> &Activation {
        &self.activation
    }

    pub fn activation_id(&self) -> Option<&str> {
        self.activation.activation_id.as_deref()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.activation.deadline
    }

    /// Check an arbitrary capability.
    pub fn check_capability(&self, required: &Capability) -> Result<(), ActionError> {
        if self.policy.permits(required) {
            Ok(())
        } else {
            Err(self.violation(format!("{required:?}")))
        }
    }

    /// Check whether network access to a host is allowed.
    pub fn check_network(&self, host: &str) -> Result<(), ActionError> {
        if self.policy.permits_host(host) {
            Ok(())
        } else {
            Err(self.violation(format!("Network({host})")))
        }
    }

    /// Check whether a path may be read, or written when `write` is set.
    pub fn check_path(&self, path: &Path, write: bool) -> Result<(), ActionError> {
        if self.policy.permits_path(path, write) {
            Ok(())
        } else {
            let mode = if write { "write" } else { "read" };
            Err(self.violation(format!("FileSystem({}, {mode})", path.display())))
        }
    }

    /// Check whether an environment variable of the host may be read.
    pub fn check_env(&self, key: &str) -> Result<(), ActionError> {
        if self.policy.permits_env(key) {
            Ok(())
        } else {
            Err(self.violation(format!("Environment({key})")))
        }
    }

    /// Check whether child processes may be spawned.
    pub fn check_process(&self) -> Result<(), ActionError> {
        self.check_capability(&Capability::Process)
    }

    fn violation(&self, capability: String) -> ActionError {
        tracing::warn!(action = %self.action, %capability, "capability denied");
        ActionError::SandboxViolation {
            capability,
            action: self.action.to_string(),
        }
    }
}
