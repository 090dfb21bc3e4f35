use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, const_mutex};

use crate::ambient::Ambient;
use crate::guard::SandboxGuard;

static GATE: Mutex<()> = const_mutex(());

/// Serialises invocations of loaded code.
///
/// The ambient context is process-global, so two invocations running at once
/// would see each other's scope and policy. The gate admits one invocation
/// at a time and keeps it admitted for as long as its sandbox is entered.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvocationGate;

impl InvocationGate {
    /// Wait for the gate, then enter `ambient`.
    pub fn enter(ambient: Ambient) -> Invocation {
        let lock = GATE.lock();
        let guard = SandboxGuard::enter(ambient);
        Invocation {
            guard,
            _lock: lock,
        }
    }

    /// Run `f` as the only in-flight invocation with `ambient` installed.
    /// The previous context is restored even if `f` panics.
    pub fn run<T>(ambient: Ambient, f: impl FnOnce() -> T) -> T {
        let _invocation = Self::enter(ambient);
        f()
    }

    /// Whether an invocation currently holds the gate.
    pub fn is_busy() -> bool {
        GATE.is_locked()
    }
}

/// An admitted invocation. The sandbox is exited before the gate is
/// released.
#[must_use = "the invocation ends as soon as this is dropped"]
#[derive(Debug)]
pub struct Invocation {
    // Field order is drop order.
    guard: SandboxGuard,
    _lock: MutexGuard<'static, ()>,
}

impl Invocation {
    pub fn ambient(&self) -> &Arc<Ambient> {
        self.guard.installed()
    }
}
