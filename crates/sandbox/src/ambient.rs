use std::path::Path;
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use cirrus_action::Policy;

/// Process-wide ambient context. Starts out as [`Ambient::host`].
pub(crate) static AMBIENT: LazyLock<ArcSwap<Ambient>> =
    LazyLock::new(|| ArcSwap::from_pointee(Ambient::host()));

/// Where names are currently resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The runtime's own code.
    Host,
    /// A loaded entry point and the archive it came from.
    Action {
        entry_point: Arc<str>,
        archive: Arc<Path>,
    },
}

/// The ambient scope and policy observed by code running in this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambient {
    scope: Scope,
    policy: Option<Arc<Policy>>,
}

impl Ambient {
    /// Host scope with no policy installed.
    pub fn host() -> Self {
        Self {
            scope: Scope::Host,
            policy: None,
        }
    }

    /// Scope of a loaded entry point running under `policy`.
    pub fn action(entry_point: Arc<str>, archive: Arc<Path>, policy: Arc<Policy>) -> Self {
        Self {
            scope: Scope::Action {
                entry_point,
                archive,
            },
            policy: Some(policy),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn policy(&self) -> Option<&Arc<Policy>> {
        self.policy.as_ref()
    }

    pub fn is_host(&self) -> bool {
        self.scope == Scope::Host
    }

    /// The entry point whose scope is installed, if any.
    pub fn entry_point(&self) -> Option<&str> {
        match &self.scope {
            Scope::Action { entry_point, .. } => Some(entry_point),
            Scope::Host => None,
        }
    }
}

/// Snapshot of the currently installed ambient context.
pub fn current() -> Arc<Ambient> {
    AMBIENT.load_full()
}
