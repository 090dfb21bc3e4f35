//! End-of-activation signalling.
//!
//! The log collector reading the process output splits it into activations
//! at a fixed sentinel line. Every run request ends with exactly one.

use std::io::{self, Write};
use std::sync::Arc;

/// Written after every run request.
pub const ACTIVATION_SENTINEL: &str = "XXX_THE_END_OF_A_WHISK_ACTIVATION_XXX";

/// Receives the end-of-activation signal.
pub trait ActivationLog: Send + Sync {
    fn end_of_activation(&self);
}

/// Writes [`ACTIVATION_SENTINEL`] to stderr and flushes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrActivationLog;

impl ActivationLog for StderrActivationLog {
    fn end_of_activation(&self) {
        let mut stderr = io::stderr().lock();
        if let Err(error) = writeln!(stderr, "{ACTIVATION_SENTINEL}").and_then(|()| stderr.flush()) {
            tracing::warn!(%error, "cannot write the activation sentinel");
        }
    }
}

/// Emits the end-of-activation signal once, when dropped.
///
/// Held for the whole run request, so the signal is sent on every exit:
/// success, error, panic, or the request future being dropped.
#[must_use = "the signal is sent when the boundary is dropped"]
pub struct ActivationBoundary {
    log: Arc<dyn ActivationLog>,
}

impl ActivationBoundary {
    pub fn open(log: Arc<dyn ActivationLog>) -> Self {
        Self { log }
    }
}

impl Drop for ActivationBoundary {
    fn drop(&mut self) {
        self.log.end_of_activation();
    }
}
