use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cirrus_runtime::RuntimeError;
use serde_json::json;

/// Any failure of `/init` or `/run`, sent as `502 {"error": <message>}`.
///
/// The body never distinguishes a bad request from a failing action; the
/// details are in the log written by the runtime.
#[derive(Debug)]
pub struct ApiError(pub RuntimeError);

impl From<RuntimeError> for ApiError {
    fn from(error: RuntimeError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": self.0.wire_message() })),
        )
            .into_response()
    }
}
