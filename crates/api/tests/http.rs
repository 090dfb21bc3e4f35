use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use cirrus_action::{ActionError, EntryPoint, Manifest, Policy, RouteBuilder, Routes};
use cirrus_api::router;
use cirrus_loader::{ActionLoader, StaticOpener};
use cirrus_runtime::ActionRuntime;
use http::{Method, Request, StatusCode};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};
use tower::ServiceExt;

#[derive(Default)]
struct Echo;

impl RouteBuilder for Echo {
    fn configure(&mut self, routes: &mut Routes) -> Result<(), ActionError> {
        routes.from_input().transform(|body| body);
        Ok(())
    }
}

#[derive(Default)]
struct Null;

impl RouteBuilder for Null {
    fn configure(&mut self, routes: &mut Routes) -> Result<(), ActionError> {
        routes.from_input().transform(|_| None);
        Ok(())
    }
}

#[derive(Default)]
struct Failing;

impl RouteBuilder for Failing {
    fn configure(&mut self, routes: &mut Routes) -> Result<(), ActionError> {
        routes
            .from_input()
            .process(|_| Err(ActionError::fatal("bad input")));
        Ok(())
    }
}

fn manifest() -> Manifest {
    Manifest::new(vec![
        EntryPoint::action::<Echo>("demo.Echo"),
        EntryPoint::action::<Null>("demo.Null"),
        EntryPoint::action::<Failing>("demo.Failing"),
    ])
}

fn runtime() -> ActionRuntime {
    ActionRuntime::new(ActionLoader::with_opener(
        Arc::new(StaticOpener::new(manifest)),
        Arc::new(Policy::deny_all()),
    ))
}

fn app() -> Router {
    router(Arc::new(runtime()))
}

async fn post(app: &Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn init(app: &Router, entry_point: &str) -> (StatusCode, Value) {
    let doc = json!({"value": {"main": entry_point, "code": "/tmp/echo.so"}});
    post(app, "/init", doc.to_string()).await
}

#[tokio::test(flavor = "multi_thread")]
async fn init_then_run() {
    let app = app();
    assert_eq!(init(&app, "demo.Echo").await, (StatusCode::OK, json!({"OK": true})));

    let run = json!({"value": {"a": 1}, "__OW_ACTIVATION_ID": "abc"});
    assert_eq!(
        post(&app, "/run", run.to_string()).await,
        (StatusCode::OK, json!({"a": 1}))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn second_init_is_a_bad_gateway() {
    let app = app();
    init(&app, "demo.Echo").await;
    assert_eq!(
        init(&app, "demo.Echo").await,
        (
            StatusCode::BAD_GATEWAY,
            json!({"error": "Cannot initialize the action more than once."})
        )
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn run_before_init_is_a_bad_gateway() {
    let app = app();
    assert_eq!(
        post(&app, "/run", r#"{"value": {}}"#).await,
        (
            StatusCode::BAD_GATEWAY,
            json!({"error": "Cannot invoke an uninitialized action."})
        )
    );
}

#[rstest]
#[case::null_result("demo.Null", "the action returned no result")]
#[case::action_error("demo.Failing", "invocation failed: fatal: bad input")]
#[tokio::test(flavor = "multi_thread")]
async fn failed_runs_are_wrapped(#[case] entry_point: &str, #[case] detail: &str) {
    let app = app();
    init(&app, entry_point).await;
    let (status, body) = post(&app, "/run", r#"{"value": {"a": 1}}"#).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body,
        json!({"error": format!("An error has occurred (see logs for details): {detail}")})
    );
}

#[rstest]
#[case::malformed("{\"value\": ")]
#[case::missing_main(r#"{"value": {"code": "/tmp/echo.so"}}"#)]
#[case::unknown_entry_point(r#"{"value": {"main": "demo.Missing", "code": "/tmp/echo.so"}}"#)]
#[tokio::test(flavor = "multi_thread")]
async fn failed_inits_keep_the_runtime_uninitialized(#[case] doc: &'static str) {
    let app = app();
    let (status, body) = post(&app, "/init", doc).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("An error has occurred (see logs for details): "), "{message}");

    assert_eq!(init(&app, "demo.Echo").await.0, StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread")]
async fn chunked_binary_init_is_streamed_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(runtime().with_spill_dir(dir.path()));
    let app = router(Arc::clone(&runtime));

    let payload = "QUJD".repeat(64 * 1024);
    let doc = format!(
        r#"{{"value": {{"main": "demo.Echo", "code": {{"binary": true, "value": "{payload}"}}}}}}"#
    );
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> = doc
        .into_bytes()
        .chunks(1000)
        .map(|chunk| Ok(chunk.to_vec()))
        .collect();
    let body = Body::from_stream(futures::stream::iter(chunks));

    assert_eq!(post(&app, "/init", body).await, (StatusCode::OK, json!({"OK": true})));

    let cirrus_runtime::RuntimeState::Initialized { archive, .. } = runtime.state() else {
        panic!("expected initialized state")
    };
    let written = std::fs::read(archive).unwrap();
    assert_eq!(written.len(), 3 * 64 * 1024);
    assert!(written.chunks(3).all(|c| c == b"ABC"));
}

#[tokio::test(flavor = "multi_thread")]
async fn only_post_is_routed() {
    let app = app();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/run")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
