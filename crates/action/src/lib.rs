//! # Cirrus Action API
//!
//! Types shared between the runtime and the action archives it loads.
//!
//! ## Core Types
//!
//! - [`RouteBuilder`] -- the shape every loadable entry point must have
//! - [`Routes`] / [`RouteDefinition`] -- routes an entry point declares
//! - [`Engine`] / [`FunctionEngine`] -- the engine routes are registered with
//! - [`Exchange`] -- message passed through a route (body, headers, beans)
//! - [`SandboxedContext`] -- invocation-scoped capability checks
//! - [`Policy`] / [`Capability`] -- what loaded code is allowed to do
//! - [`ActionError`] -- errors raised by loaded code and the engine
//! - [`Manifest`] / [`export_actions!`] -- the archive export table
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cirrus_action::{ActionError, RouteBuilder, Routes};
//!
//! #[derive(Default)]
//! struct Echo;
//!
//! impl RouteBuilder for Echo {
//!     fn configure(&mut self, routes: &mut Routes) -> Result<(), ActionError> {
//!         routes.from_input().transform(|body| body);
//!         Ok(())
//!     }
//! }
//!
//! cirrus_action::export_actions! { "demo.Echo" => Echo }
//! ```

/// Capability declarations and granted policies.
pub mod capability;
/// Route engine driving one loaded entry point.
pub mod engine;
/// Error type shared by loaded code and the engine.
pub mod error;
/// Archive export table and version stamps.
pub mod manifest;
/// Route declarations and the bean registry.
pub mod routes;
/// Invocation-scoped capability enforcement.
pub mod sandbox;

/// JSON object used for run inputs, outputs and environments.
pub type Object = serde_json::Map<String, serde_json::Value>;

pub use capability::{Capability, Policy};
pub use engine::{Engine, Exchange, FunctionEngine};
pub use error::ActionError;
pub use manifest::{
    ABI_VERSION, API_VERSION, EntryPoint, MANIFEST_SYMBOL, Manifest, ManifestFn, build_id,
};
pub use routes::{INPUT_ENDPOINT, Processor, Registry, RouteBuilder, RouteDefinition, Routes};
pub use sandbox::{Activation, SandboxedContext};
