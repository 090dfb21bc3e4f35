#![forbid(unsafe_code)]

//! # Cirrus Runtime
//!
//! Lifecycle controller for a single-tenant action container.
//!
//! This crate provides:
//! - [`ActionRuntime`] -- init once, run many; parsing, loading and
//!   invocation are moved to the blocking pool
//! - [`RuntimeState`] -- `Uninitialized` or `Initialized`, never back
//! - [`InitRequest`] / [`RunRequest`] -- the expected shapes of the two
//!   control documents
//! - [`ActivationLog`] -- where the end-of-activation sentinel goes
//! - [`RuntimeError`] -- every failure, with the message sent to callers
//!
//! The runtime sits between the HTTP surface (which owns the request
//! bodies) and the loader (which owns the archive and the engine).

pub mod activation;
pub mod document;
pub mod error;
pub mod runtime;
pub mod state;

pub use activation::{ACTIVATION_SENTINEL, ActivationBoundary, ActivationLog, StderrActivationLog};
pub use document::{InitRequest, RunRequest, VALUE_KEY};
pub use error::RuntimeError;
pub use runtime::ActionRuntime;
pub use state::RuntimeState;
