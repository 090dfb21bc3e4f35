use std::path::PathBuf;

/// Lifecycle state of an [`ActionRuntime`](crate::ActionRuntime).
///
/// `Uninitialized` becomes `Initialized` once, on the first successful
/// init. Nothing moves it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeState {
    Uninitialized,
    Initialized {
        /// Name the action was loaded under.
        entry_point: String,
        /// Archive the action was loaded from.
        archive: PathBuf,
    },
}

impl RuntimeState {
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized { .. })
    }
}
