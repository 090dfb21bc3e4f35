use std::any::Any;
use std::path::PathBuf;

use cirrus_action::ActionError;

/// Errors from turning an archive and an entry-point name into a running
/// engine.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoadError {
    /// The archive file could not be opened as a library.
    #[error("cannot open archive '{}': {reason}", .path.display())]
    Open {
        /// The archive that failed to open.
        path: PathBuf,
        /// The underlying error message.
        reason: String,
    },

    /// The archive has no manifest, or producing it failed.
    #[error("archive '{}' has no usable manifest: {reason}", .path.display())]
    Manifest {
        /// The archive.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The archive was built against incompatible framework types.
    #[error(
        "archive built for ABI {found_abi} / API {found_api}{}, runtime expects ABI {expected_abi} / API {expected_api}",
        build_note(.same_build)
    )]
    AbiMismatch {
        /// ABI version stamped in the archive.
        found_abi: u32,
        /// API version stamped in the archive.
        found_api: String,
        /// ABI version of this runtime.
        expected_abi: u32,
        /// API version of this runtime.
        expected_api: &'static str,
        /// Whether the archive's framework types are the runtime's own.
        same_build: bool,
    },

    /// No entry point with the requested name.
    #[error("entry point '{name}' not found (available: {})", .available.join(", "))]
    EntryPointNotFound {
        /// The requested name.
        name: String,
        /// Names the archive does export.
        available: Vec<String>,
    },

    /// The entry point's constructor panicked.
    #[error("entry point '{name}' could not be instantiated: {reason}")]
    Instantiate {
        /// The entry point.
        name: String,
        /// Panic message.
        reason: String,
    },

    /// The instance cannot be registered with an engine.
    #[error("entry point '{name}' is not a route builder")]
    NotAnAction {
        /// The entry point.
        name: String,
    },

    /// The engine rejected the entry point's routes.
    #[error("entry point '{name}' could not be started: {source}")]
    Engine {
        /// The entry point.
        name: String,
        /// The engine's error.
        #[source]
        source: ActionError,
    },
}

/// Errors from running a loaded entry point. Never produced while loading.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum InvocationError {
    /// The action or its engine reported an error.
    #[error("invocation failed: {0}")]
    Failed(#[source] ActionError),

    /// The action panicked.
    #[error("the action panicked: {0}")]
    Panicked(String),

    /// The action completed without producing a body.
    #[error("the action returned no result")]
    NoResult,
}

fn build_note(same_build: &bool) -> &'static str {
    if *same_build {
        ""
    } else {
        " from a different cirrus-action build"
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}
