use std::sync::Arc;

use crate::ambient::{AMBIENT, Ambient};

/// Installs an [`Ambient`] for as long as the guard lives.
///
/// Dropping the guard, including while unwinding, puts back the exact `Arc`
/// that was installed when it was created. Guards must be dropped in reverse
/// order of creation; [`InvocationGate`](crate::InvocationGate) guarantees
/// that for invocations.
#[must_use = "the ambient context is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SandboxGuard {
    previous: Arc<Ambient>,
    installed: Arc<Ambient>,
}

impl SandboxGuard {
    pub fn enter(ambient: Ambient) -> Self {
        let installed = Arc::new(ambient);
        let previous = AMBIENT.swap(Arc::clone(&installed));
        tracing::trace!(
            entry_point = installed.entry_point(),
            "sandbox entered"
        );
        Self {
            previous,
            installed,
        }
    }

    /// The context this guard installed.
    pub fn installed(&self) -> &Arc<Ambient> {
        &self.installed
    }

    /// The context that will be restored on drop.
    pub fn previous(&self) -> &Arc<Ambient> {
        &self.previous
    }
}

impl Drop for SandboxGuard {
    fn drop(&mut self) {
        let replaced = AMBIENT.swap(Arc::clone(&self.previous));
        if !Arc::ptr_eq(&replaced, &self.installed) {
            tracing::warn!(
                entry_point = self.installed.entry_point(),
                "sandbox context changed while entered; restored anyway"
            );
        }
        tracing::trace!(entry_point = self.installed.entry_point(), "sandbox exited");
    }
}
