//! The table of entry points an action archive exports.
//!
//! An archive is a shared library built against this crate. It exports one
//! Rust-ABI function, [`MANIFEST_SYMBOL`], returning a [`Manifest`]; the
//! [`export_actions!`](crate::export_actions) macro generates it. Because the
//! manifest crosses the library boundary as Rust types, the archive must be
//! built with the same compiler and the same `cirrus-action` build as the
//! runtime; [`ABI_VERSION`], [`API_VERSION`] and [`build_id`] let the loader
//! check that.

use std::any::{Any, TypeId};
use std::fmt;

use crate::routes::RouteBuilder;

/// Bumped whenever the layout of [`Manifest`] or [`EntryPoint`] changes.
pub const ABI_VERSION: u32 = 1;

/// Version of the framework types shared with archives.
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fingerprint of the `cirrus-action` build this code was compiled against.
///
/// Two builds of the same version still produce distinct types when their
/// compiler or build metadata differ, and entry points from such an archive
/// never downcast to the runtime's [`RouteBuilder`].
pub fn build_id() -> TypeId {
    TypeId::of::<Box<dyn RouteBuilder>>()
}

/// Name of the exported manifest function.
pub const MANIFEST_SYMBOL: &str = "cirrus_action_manifest";

/// Signature of the exported manifest function.
pub type ManifestFn = fn() -> Manifest;

/// Creates a fresh instance of an entry point, type-erased.
///
/// Action entry points produce a `Box<dyn RouteBuilder>` inside the `Any`.
pub type Factory = fn() -> Box<dyn Any + Send>;

/// A named unit inside an archive.
#[derive(Clone, Copy)]
pub struct EntryPoint {
    pub name: &'static str,
    pub factory: Factory,
}

impl EntryPoint {
    /// An entry point that instantiates `T` as a route builder.
    pub fn action<T: RouteBuilder + Default + 'static>(name: &'static str) -> Self {
        Self {
            name,
            factory: instantiate_action::<T>,
        }
    }

    /// An entry point whose instances are not route builders.
    pub fn opaque<T: Any + Send + Default>(name: &'static str) -> Self {
        Self {
            name,
            factory: instantiate_opaque::<T>,
        }
    }

    pub fn instantiate(&self) -> Box<dyn Any + Send> {
        (self.factory)()
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint").field("name", &self.name).finish()
    }
}

fn instantiate_action<T: RouteBuilder + Default + 'static>() -> Box<dyn Any + Send> {
    let builder: Box<dyn RouteBuilder> = Box::new(T::default());
    Box::new(builder)
}

fn instantiate_opaque<T: Any + Send + Default>() -> Box<dyn Any + Send> {
    Box::new(T::default())
}

/// Everything an archive exports.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub abi_version: u32,
    pub api_version: &'static str,
    pub build_id: TypeId,
    pub entries: Vec<EntryPoint>,
}

impl Manifest {
    /// A manifest stamped with this crate's versions.
    pub fn new(entries: Vec<EntryPoint>) -> Self {
        Self {
            abi_version: ABI_VERSION,
            api_version: API_VERSION,
            build_id: build_id(),
            entries,
        }
    }

    pub fn find(&self, name: &str) -> Option<&EntryPoint> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }

    /// Whether the manifest was produced by a compatible build.
    pub fn is_compatible(&self) -> bool {
        self.abi_version == ABI_VERSION
            && self.api_version == API_VERSION
            && self.build_id == build_id()
    }
}

/// Export the entry points of an action archive.
///
/// ```ignore
/// #[derive(Default)]
/// struct Echo;
///
/// impl cirrus_action::RouteBuilder for Echo { /* ... */ }
///
/// cirrus_action::export_actions! {
///     "demo.Echo" => Echo,
/// }
/// ```
#[macro_export]
macro_rules! export_actions {
    ($($name:literal => $ty:ty),* $(,)?) => {
        #[allow(unsafe_code)]
        #[unsafe(no_mangle)]
        pub fn cirrus_action_manifest() -> $crate::manifest::Manifest {
            $crate::manifest::Manifest::new(vec![
                $($crate::manifest::EntryPoint::action::<$ty>($name)),*
            ])
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;
    use crate::routes::Routes;

    #[derive(Default)]
    struct Echo;

    impl RouteBuilder for Echo {
        fn configure(&mut self, routes: &mut Routes) -> Result<(), ActionError> {
            routes.from_input().transform(|body| body);
            Ok(())
        }
    }

    #[derive(Default)]
    struct NotAnAction;

    fn manifest() -> Manifest {
        Manifest::new(vec![
            EntryPoint::action::<Echo>("demo.Echo"),
            EntryPoint::opaque::<NotAnAction>("demo.Plain"),
        ])
    }

    #[test]
    fn find_by_name() {
        let manifest = manifest();
        assert!(manifest.is_compatible());
        assert_eq!(manifest.names(), vec!["demo.Echo", "demo.Plain"]);
        assert!(manifest.find("demo.Echo").is_some());
        assert!(manifest.find("demo.Missing").is_none());
    }

    #[test]
    fn action_entries_instantiate_route_builders() {
        let manifest = manifest();
        let instance = manifest.find("demo.Echo").unwrap().instantiate();
        assert!(instance.downcast::<Box<dyn RouteBuilder>>().is_ok());

        let instance = manifest.find("demo.Plain").unwrap().instantiate();
        assert!(instance.downcast::<Box<dyn RouteBuilder>>().is_err());
    }

    #[test]
    fn version_mismatch_is_incompatible() {
        let mut manifest = manifest();
        manifest.abi_version += 1;
        assert!(!manifest.is_compatible());
    }

    #[test]
    fn foreign_build_is_incompatible() {
        let mut manifest = manifest();
        manifest.build_id = TypeId::of::<NotAnAction>();
        assert_eq!(manifest.abi_version, ABI_VERSION);
        assert_eq!(manifest.api_version, API_VERSION);
        assert!(!manifest.is_compatible());
    }
}
