//! Route definitions registered by loaded code.
//!
//! A loaded entry point is a [`RouteBuilder`]: the engine hands it a
//! [`Routes`] collector, the builder declares the routes it serves and the
//! beans they share, and the engine takes ownership of the result.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::Object;
use crate::engine::Exchange;
use crate::error::ActionError;

/// Endpoint the engine feeds every run's input into.
pub const INPUT_ENDPOINT: &str = "function:input";

/// The shape every entry point must satisfy to be registered with an engine.
pub trait RouteBuilder: Send {
    fn configure(&mut self, routes: &mut Routes) -> Result<(), ActionError>;
}

/// A processing step that may read and replace the exchange body.
pub type Processor = Box<dyn Fn(&mut Exchange<'_>) -> Result<(), ActionError> + Send + Sync>;

type Transformer = Box<dyn Fn(Option<Object>) -> Option<Object> + Send + Sync>;

pub(crate) enum Step {
    Process(Processor),
    Transform(Transformer),
    To(String),
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process(_) => f.write_str("Process"),
            Self::Transform(_) => f.write_str("Transform"),
            Self::To(endpoint) => f.debug_tuple("To").field(endpoint).finish(),
        }
    }
}

/// One route: a consuming endpoint and the steps applied to each exchange.
#[derive(Debug)]
pub struct RouteDefinition {
    endpoint: String,
    id: Option<String>,
    pub(crate) steps: Vec<Step>,
}

impl RouteDefinition {
    fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            id: None,
            steps: Vec::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn route_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = Some(id.into());
        self
    }

    /// Run `processor` against the exchange.
    pub fn process<F>(&mut self, processor: F) -> &mut Self
    where
        F: Fn(&mut Exchange<'_>) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.steps.push(Step::Process(Box::new(processor)));
        self
    }

    /// Replace the body with the result of `transform`.
    pub fn transform<F>(&mut self, transform: F) -> &mut Self
    where
        F: Fn(Option<Object>) -> Option<Object> + Send + Sync + 'static,
    {
        self.steps.push(Step::Transform(Box::new(transform)));
        self
    }

    /// Hand the exchange to the route consuming from `endpoint`.
    pub fn to(&mut self, endpoint: impl Into<String>) -> &mut Self {
        self.steps.push(Step::To(endpoint.into()));
        self
    }
}

/// Named beans shared by the routes of one engine.
#[derive(Default, Clone)]
pub struct Registry {
    beans: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bean. Overwrites any bean with the same name.
    pub fn bind<T: Any + Send + Sync>(&mut self, name: impl Into<String>, bean: T) {
        self.beans.insert(name.into(), Arc::new(bean));
    }

    /// Look up a bean by name and type.
    pub fn lookup<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.beans
            .get(name)
            .and_then(|bean| Arc::clone(bean).downcast::<T>().ok())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.beans.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.beans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beans.is_empty()
    }

    pub(crate) fn extend(&mut self, other: Registry) {
        self.beans.extend(other.beans);
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("beans", &self.beans.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Collector passed to [`RouteBuilder::configure`].
#[derive(Debug, Default)]
pub struct Routes {
    definitions: Vec<RouteDefinition>,
    registry: Registry,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a route consuming from `endpoint`.
    pub fn from(&mut self, endpoint: impl Into<String>) -> &mut RouteDefinition {
        self.definitions.push(RouteDefinition::new(endpoint.into()));
        let last = self.definitions.len() - 1;
        &mut self.definitions[last]
    }

    /// Start the route that receives each run's input.
    pub fn from_input(&mut self) -> &mut RouteDefinition {
        self.from(INPUT_ENDPOINT)
    }

    /// Register a bean shared by every route of the engine.
    pub fn bind<T: Any + Send + Sync>(&mut self, name: impl Into<String>, bean: T) -> &mut Self {
        self.registry.bind(name, bean);
        self
    }

    pub fn definitions(&self) -> &[RouteDefinition] {
        &self.definitions
    }

    pub(crate) fn into_parts(self) -> (Vec<RouteDefinition>, Registry) {
        (self.definitions, self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_collect_definitions_and_beans() {
        let mut routes = Routes::new();
        routes
            .from_input()
            .route_id("main")
            .transform(|body| body)
            .to("direct:next");
        routes.from("direct:next").process(|_| Ok(()));
        routes.bind("greeting", String::from("hello"));

        let definitions = routes.definitions();
        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions[0].endpoint(), INPUT_ENDPOINT);
        assert_eq!(definitions[0].id(), Some("main"));
        assert_eq!(definitions[0].step_count(), 2);
        assert_eq!(definitions[1].endpoint(), "direct:next");

        let (_, registry) = routes.into_parts();
        assert_eq!(registry.lookup::<String>("greeting").as_deref(), Some(&"hello".to_owned()));
    }

    #[test]
    fn registry_lookup_checks_type() {
        let mut registry = Registry::new();
        registry.bind("count", 3_u32);
        assert_eq!(registry.lookup::<u32>("count").as_deref(), Some(&3));
        assert!(registry.lookup::<String>("count").is_none());
        assert!(registry.lookup::<u32>("missing").is_none());
        assert!(registry.contains("count"));
        assert_eq!(registry.len(), 1);
    }
}
