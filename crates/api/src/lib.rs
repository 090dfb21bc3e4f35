#![forbid(unsafe_code)]

//! # Cirrus API
//!
//! HTTP surface of the action runtime.
//!
//! - [`router`] -- `POST /init` and `POST /run` over a shared
//!   [`ActionRuntime`](cirrus_runtime::ActionRuntime); bodies are streamed
//!   into the runtime, never buffered whole
//! - [`ApiError`] -- every failure as `502 {"error": <message>}`
//! - [`ServerConfig`] -- flags and environment of the `cirrus-server` binary
//! - [`self_test`] -- engine smoke test behind `--self-test`
//! - [`serve`] / [`shutdown_signal`] -- the server loop, stopped by ctrl-c or
//!   SIGTERM

pub mod config;
pub mod error;
pub mod routes;
pub mod self_test;
pub mod server;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::{INIT_ROUTE, RUN_ROUTE, router};
pub use self_test::{SELF_TEST_OK, self_test};
pub use server::{serve, shutdown_signal};
