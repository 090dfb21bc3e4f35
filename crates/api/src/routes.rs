//! `POST /init` and `POST /run`.

use std::io::{self, Read};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use cirrus_action::Object;
use cirrus_runtime::ActionRuntime;
use futures::TryStreamExt;
use serde_json::{Value, json};
use tokio_util::io::{StreamReader, SyncIoBridge};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

pub const INIT_ROUTE: &str = "/init";
pub const RUN_ROUTE: &str = "/run";

/// The runtime's HTTP surface.
pub fn router(runtime: Arc<ActionRuntime>) -> Router {
    Router::new()
        .route(INIT_ROUTE, post(init))
        .route(RUN_ROUTE, post(run))
        .layer(TraceLayer::new_for_http())
        .with_state(runtime)
}

async fn init(
    State(runtime): State<Arc<ActionRuntime>>,
    body: Body,
) -> Result<Json<Value>, ApiError> {
    runtime.init(blocking_reader(body)).await?;
    Ok(Json(json!({ "OK": true })))
}

async fn run(
    State(runtime): State<Arc<ActionRuntime>>,
    body: Body,
) -> Result<Json<Object>, ApiError> {
    Ok(Json(runtime.run(blocking_reader(body)).await?))
}

/// The request body as a blocking reader, fed chunk by chunk from the
/// connection. Only usable off the async workers, which is where the
/// runtime parses.
fn blocking_reader(body: Body) -> impl Read + Send + 'static {
    let chunks = body.into_data_stream().map_err(io::Error::other);
    SyncIoBridge::new(StreamReader::new(chunks))
}
