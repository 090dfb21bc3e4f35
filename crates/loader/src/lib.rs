//! # Cirrus Loader
//!
//! Turns a code archive and an entry-point name into an invokable action.
//!
//! - [`ActionLoader`] -- opens the archive, resolves and instantiates the
//!   entry point, registers it with a [`FunctionEngine`](cirrus_action::FunctionEngine)
//!   and starts it
//! - [`LoadedAction`] -- the started engine; [`invoke`](LoadedAction::invoke)
//!   runs one input through it inside the invocation sandbox
//! - [`ArchiveOpener`] -- how archives are opened: [`DylibOpener`] for shared
//!   libraries, [`StaticOpener`] for manifests linked into the host
//!
//! Load failures ([`LoadError`]) and invocation failures
//! ([`InvocationError`]) are separate types and never mixed.

pub mod archive;
pub mod error;
pub mod loader;

pub use archive::{Archive, ArchiveOpener, DylibOpener, StaticOpener};
pub use error::{InvocationError, LoadError};
pub use loader::{ActionLoader, ArchiveSource, LoadedAction};
