//! The business-execution engine loaded code registers itself with.

use std::any::Any;
use std::sync::Arc;

use crate::Object;
use crate::error::ActionError;
use crate::routes::{INPUT_ENDPOINT, Registry, RouteBuilder, RouteDefinition, Routes, Step};
use crate::sandbox::SandboxedContext;

/// Hops through `to(..)` steps before an exchange is considered looping.
const MAX_HOPS: usize = 32;

/// Engine that owns the routes of exactly one loaded entry point.
pub trait Engine: Send + Sync {
    /// Let `builder` declare its routes. Only valid before [`start`](Self::start).
    fn add_routes(&mut self, builder: &mut dyn RouteBuilder) -> Result<(), ActionError>;

    /// Validate the declared routes and accept executions. Starting is
    /// irreversible.
    fn start(&mut self) -> Result<(), ActionError>;

    fn is_started(&self) -> bool;

    /// Feed one input through the input route. `None` means the routes left
    /// no body.
    fn execute(
        &self,
        input: Object,
        env: Object,
        sandbox: &SandboxedContext,
    ) -> Result<Option<Object>, ActionError>;
}

/// The message travelling through a route.
pub struct Exchange<'a> {
    body: Option<Object>,
    headers: Object,
    registry: &'a Registry,
    sandbox: &'a SandboxedContext,
}

impl<'a> Exchange<'a> {
    pub fn new(
        body: Option<Object>,
        headers: Object,
        registry: &'a Registry,
        sandbox: &'a SandboxedContext,
    ) -> Self {
        Self {
            body,
            headers,
            registry,
            sandbox,
        }
    }

    pub fn body(&self) -> Option<&Object> {
        self.body.as_ref()
    }

    pub fn body_mut(&mut self) -> Option<&mut Object> {
        self.body.as_mut()
    }

    pub fn set_body(&mut self, body: Option<Object>) {
        self.body = body;
    }

    pub fn take_body(&mut self) -> Option<Object> {
        self.body.take()
    }

    /// The run environment.
    pub fn headers(&self) -> &Object {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&serde_json::Value> {
        self.headers.get(key)
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Look up a bean, failing with a validation error if it is missing or
    /// has another type.
    pub fn bean<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ActionError> {
        self.registry
            .lookup(name)
            .ok_or_else(|| ActionError::validation(format!("no bean named `{name}`")))
    }

    pub fn sandbox(&self) -> &SandboxedContext {
        self.sandbox
    }

    fn into_body(self) -> Option<Object> {
        self.body
    }
}

/// In-process route engine.
///
/// ```
/// use cirrus_action::{Engine, FunctionEngine, RouteBuilder, Routes, ActionError};
/// use cirrus_action::{Policy, SandboxedContext};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Echo;
///
/// impl RouteBuilder for Echo {
///     fn configure(&mut self, routes: &mut Routes) -> Result<(), ActionError> {
///         routes.from_input().transform(|body| body);
///         Ok(())
///     }
/// }
///
/// let mut engine = FunctionEngine::new();
/// engine.add_routes(&mut Echo)?;
/// engine.start()?;
///
/// let input = serde_json::json!({"a": 1}).as_object().cloned().unwrap();
/// let sandbox = SandboxedContext::new("demo.Echo", Arc::new(Policy::deny_all()));
/// let output = engine.execute(input.clone(), Default::default(), &sandbox)?;
/// assert_eq!(output, Some(input));
/// # Ok::<(), ActionError>(())
/// ```
#[derive(Debug, Default)]
pub struct FunctionEngine {
    routes: Vec<RouteDefinition>,
    registry: Registry,
    started: bool,
}

impl FunctionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn route(&self, endpoint: &str) -> Option<&RouteDefinition> {
        self.routes.iter().find(|r| r.endpoint() == endpoint)
    }

    fn run_route(
        &self,
        route: &RouteDefinition,
        exchange: &mut Exchange<'_>,
        hops: usize,
    ) -> Result<(), ActionError> {
        for step in &route.steps {
            match step {
                Step::Process(processor) => processor(exchange)?,
                Step::Transform(transform) => {
                    let body = exchange.take_body();
                    exchange.set_body(transform(body));
                }
                Step::To(endpoint) => {
                    if hops >= MAX_HOPS {
                        return Err(ActionError::engine(format!(
                            "route loop detected at `{endpoint}`"
                        )));
                    }
                    let next = self.route(endpoint).ok_or_else(|| {
                        ActionError::engine(format!("no route consumes from `{endpoint}`"))
                    })?;
                    self.run_route(next, exchange, hops + 1)?;
                }
            }
        }
        Ok(())
    }
}

impl Engine for FunctionEngine {
    fn add_routes(&mut self, builder: &mut dyn RouteBuilder) -> Result<(), ActionError> {
        if self.started {
            return Err(ActionError::engine("routes cannot be added to a started engine"));
        }
        let mut routes = Routes::new();
        builder.configure(&mut routes)?;
        let (definitions, registry) = routes.into_parts();
        self.routes.extend(definitions);
        self.registry.extend(registry);
        Ok(())
    }

    fn start(&mut self) -> Result<(), ActionError> {
        if self.started {
            return Err(ActionError::engine("engine already started"));
        }
        for (i, route) in self.routes.iter().enumerate() {
            if self.routes[..i]
                .iter()
                .any(|earlier| earlier.endpoint() == route.endpoint())
            {
                return Err(ActionError::engine(format!(
                    "more than one route consumes from `{}`",
                    route.endpoint()
                )));
            }
        }
        if self.route(INPUT_ENDPOINT).is_none() {
            return Err(ActionError::engine(format!(
                "no route consumes from `{INPUT_ENDPOINT}`"
            )));
        }
        self.started = true;
        tracing::debug!(routes = self.routes.len(), beans = self.registry.len(), "engine started");
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn execute(
        &self,
        input: Object,
        env: Object,
        sandbox: &SandboxedContext,
    ) -> Result<Option<Object>, ActionError> {
        if !self.started {
            return Err(ActionError::engine("engine has not been started"));
        }
        let route = self.route(INPUT_ENDPOINT).ok_or_else(|| {
            ActionError::engine(format!("no route consumes from `{INPUT_ENDPOINT}`"))
        })?;
        let mut exchange = Exchange::new(Some(input), env, &self.registry, sandbox);
        self.run_route(route, &mut exchange, 0)?;
        Ok(exchange.into_body())
    }
}
