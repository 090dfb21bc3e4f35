#![forbid(unsafe_code)]

//! # Cirrus Sandbox
//!
//! The ambient context loaded code runs under, and the discipline for
//! entering and leaving it.
//!
//! - [`Ambient`] / [`Scope`] -- code-resolution scope plus installed policy
//! - [`current`] -- snapshot of the installed context
//! - [`SandboxGuard`] -- installs a context, restores the previous one on drop
//! - [`InvocationGate`] -- admits one invocation at a time
//!
//! Loaded code receives its policy explicitly through
//! [`SandboxedContext`](cirrus_action::SandboxedContext); the ambient
//! context records which scope is active for everything that cannot be
//! handed a context, such as log attribution and panic reporting.

pub mod ambient;
pub mod gate;
pub mod guard;

pub use ambient::{Ambient, Scope, current};
pub use gate::{Invocation, InvocationGate};
pub use guard::SandboxGuard;

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use cirrus_action::{Capability, Policy};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::*;

    // Every test here swaps the process-wide context.
    static TEST_LOCK: Mutex<()> = parking_lot::const_mutex(());

    fn action(name: &str) -> Ambient {
        Ambient::action(
            Arc::from(name),
            Arc::from(Path::new("/tmp/archive.so")),
            Arc::new(Policy::deny_all().grant(Capability::Process)),
        )
    }

    #[test]
    fn host_is_the_initial_context() {
        let _lock = TEST_LOCK.lock();
        let ambient = current();
        assert!(ambient.is_host());
        assert!(ambient.policy().is_none());
        assert_eq!(ambient.entry_point(), None);
    }

    #[test]
    fn guard_installs_and_restores_the_same_arc() {
        let _lock = TEST_LOCK.lock();
        let before = current();
        {
            let guard = SandboxGuard::enter(action("demo.Echo"));
            let inside = current();
            assert!(Arc::ptr_eq(&inside, guard.installed()));
            assert!(Arc::ptr_eq(&before, guard.previous()));
            assert_eq!(inside.entry_point(), Some("demo.Echo"));
            assert!(inside.policy().is_some_and(|p| p.permits(&Capability::Process)));
        }
        assert!(Arc::ptr_eq(&before, &current()));
    }

    #[test]
    fn nested_guards_unwind_in_order() {
        let _lock = TEST_LOCK.lock();
        let before = current();
        {
            let _outer = SandboxGuard::enter(action("outer"));
            {
                let _inner = SandboxGuard::enter(action("inner"));
                assert_eq!(current().entry_point(), Some("inner"));
            }
            assert_eq!(current().entry_point(), Some("outer"));
        }
        assert!(Arc::ptr_eq(&before, &current()));
    }

    #[test]
    fn panics_restore_the_previous_context() {
        let _lock = TEST_LOCK.lock();
        let before = current();
        let result = std::panic::catch_unwind(|| {
            InvocationGate::run(action("demo.Panics"), || -> () {
                panic!("boom");
            })
        });
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &current()));
        assert!(!InvocationGate::is_busy());
    }

    #[test]
    fn gate_returns_the_closure_result() {
        let _lock = TEST_LOCK.lock();
        let seen = InvocationGate::run(action("demo.Echo"), || current().entry_point().map(str::to_owned));
        assert_eq!(seen.as_deref(), Some("demo.Echo"));
        assert!(current().is_host());
    }

    #[test]
    fn concurrent_invocations_never_interleave() {
        let _lock = TEST_LOCK.lock();
        let before = current();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let in_flight = Arc::clone(&in_flight);
                let max_in_flight = Arc::clone(&max_in_flight);
                std::thread::spawn(move || {
                    let name = format!("action-{i}");
                    InvocationGate::run(action(&name), || {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_in_flight.fetch_max(now, Ordering::SeqCst);
                        for _ in 0..5 {
                            assert_eq!(current().entry_point(), Some(name.as_str()));
                            std::thread::sleep(Duration::from_millis(1));
                        }
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&before, &current()));
    }
}
