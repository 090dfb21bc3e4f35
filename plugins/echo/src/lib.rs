//! Demo action archive.
//!
//! Build with `cargo build -p cirrus-demo-actions` and pass the resulting
//! shared library to `/init` either as a path or base64-encoded:
//!
//! ```text
//! {"value": {"main": "demo.Echo", "code": "target/debug/libcirrus_demo_actions.so"}}
//! ```

use cirrus_action::{ActionError, Exchange, Object, RouteBuilder, Routes};
use serde_json::Value;

/// Returns its input unchanged.
#[derive(Default)]
pub struct Echo;

impl RouteBuilder for Echo {
    fn configure(&mut self, routes: &mut Routes) -> Result<(), ActionError> {
        routes.from_input().route_id("echo").transform(|body| body);
        Ok(())
    }
}

/// `{"name": "Ada"}` -> `{"greeting": "Hello, Ada!", "activation": ...}`.
///
/// Formatting lives on a second route so the input route only has to
/// validate.
#[derive(Default)]
pub struct Hello;

impl RouteBuilder for Hello {
    fn configure(&mut self, routes: &mut Routes) -> Result<(), ActionError> {
        routes.bind("salutation", String::from("Hello"));
        routes
            .from_input()
            .route_id("hello")
            .process(|exchange| match exchange.body().and_then(|b| b.get("name")) {
                None | Some(Value::String(_)) => Ok(()),
                Some(other) => Err(ActionError::validation(format!(
                    "`name` must be a string, got {other}"
                ))),
            })
            .to("direct:format");
        routes.from("direct:format").process(format_greeting);
        Ok(())
    }
}

fn format_greeting(exchange: &mut Exchange<'_>) -> Result<(), ActionError> {
    let salutation = exchange.bean::<String>("salutation")?;
    let name = exchange
        .body()
        .and_then(|b| b.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("stranger")
        .to_owned();

    let mut reply = Object::new();
    reply.insert("greeting".into(), Value::String(format!("{salutation}, {name}!")));
    if let Some(id) = exchange.sandbox().activation_id() {
        reply.insert("activation".into(), Value::String(id.to_owned()));
    }
    exchange.set_body(Some(reply));
    Ok(())
}

/// `{"key": "HOME"}` -> `{"key": "HOME", "value": "/root"}`, if the
/// invocation policy lets the action read `HOME`.
#[derive(Default)]
pub struct Env;

impl RouteBuilder for Env {
    fn configure(&mut self, routes: &mut Routes) -> Result<(), ActionError> {
        routes.from_input().route_id("env").process(|exchange| {
            let key = exchange
                .body()
                .and_then(|b| b.get("key"))
                .and_then(Value::as_str)
                .ok_or_else(|| ActionError::validation("missing string `key`"))?
                .to_owned();
            exchange.sandbox().check_env(&key)?;

            let value = std::env::var(&key).map_or(Value::Null, Value::String);
            tracing::debug!(%key, found = !value.is_null(), "environment lookup");
            let mut reply = Object::new();
            reply.insert("key".into(), Value::String(key));
            reply.insert("value".into(), value);
            exchange.set_body(Some(reply));
            Ok(())
        });
        Ok(())
    }
}

cirrus_action::export_actions! {
    "demo.Echo" => Echo,
    "demo.Hello" => Hello,
    "demo.Env" => Env,
}
