//! Smoke test of the engine, run by `cirrus-server --self-test`.

use std::sync::Arc;

use cirrus_action::{
    ActionError, Engine, FunctionEngine, Object, Policy, RouteBuilder, Routes, SandboxedContext,
};

/// Printed on success.
pub const SELF_TEST_OK: &str = "OK !";

struct EmptyReply;

impl RouteBuilder for EmptyReply {
    fn configure(&mut self, routes: &mut Routes) -> Result<(), ActionError> {
        routes.from_input().transform(|_| Some(Object::new()));
        Ok(())
    }
}

/// Start an engine with a route answering every input with an empty
/// object, and execute it once.
pub fn self_test() -> Result<Object, ActionError> {
    let mut engine = FunctionEngine::new();
    engine.add_routes(&mut EmptyReply)?;
    engine.start()?;

    let sandbox = SandboxedContext::new("self-test", Arc::new(Policy::deny_all()));
    engine
        .execute(Object::new(), Object::new(), &sandbox)?
        .ok_or_else(|| ActionError::engine("self-test route produced no body"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_test_returns_an_empty_object() {
        assert_eq!(self_test().unwrap(), Object::new());
    }
}
