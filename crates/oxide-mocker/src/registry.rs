//! Handler registry and route resolution.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::warn;

use crate::action::ReturnValue;
use crate::binder::{Arguments, ParamSpec};
use crate::error::Result;
use crate::request::Method;
use crate::template::{RouteTemplate, RouteValues};

/// How a handler method is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// Associated function without `self`.
    Static,
    /// Method taking `&self`.
    Instance,
}

/// Calls a handler method with bound arguments.
pub type Invoker<C> =
    Arc<dyn Fn(Option<Arc<C>>, Arguments) -> BoxFuture<'static, Result<ReturnValue>> + Send + Sync>;

/// A handler method as described by its annotations.
///
/// Usually generated by `#[controller]`, in declaration order.
pub struct RouteDefinition<C> {
    /// Method name, for diagnostics.
    pub handler: &'static str,
    /// HTTP verb.
    pub method: Method,
    /// Route template string.
    pub template: &'static str,
    /// How the method is called.
    pub receiver: Receiver,
    /// Parameter bindings in declaration order.
    pub params: Vec<ParamSpec>,
    /// The call itself.
    pub invoke: Invoker<C>,
}

impl<C> RouteDefinition<C> {
    /// Creates a route definition.
    pub fn new<F>(
        handler: &'static str,
        method: Method,
        template: &'static str,
        receiver: Receiver,
        invoke: F,
    ) -> Self
    where
        F: Fn(Option<Arc<C>>, Arguments) -> BoxFuture<'static, Result<ReturnValue>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            handler,
            method,
            template,
            receiver,
            params: Vec::new(),
            invoke: Arc::new(invoke),
        }
    }

    /// Adds a parameter binding.
    #[must_use]
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }
}

/// A type whose annotated methods can be dispatched to.
///
/// Implemented by the `#[controller]` attribute.
pub trait Controller: Send + Sync + 'static {
    /// Returns every annotated method, in declaration order.
    fn routes() -> Vec<RouteDefinition<Self>>
    where
        Self: Sized;
}

/// A route ready for resolution.
pub struct RegisteredRoute<C> {
    /// HTTP verb.
    pub method: Method,
    /// Parsed template.
    pub template: RouteTemplate,
    /// Method name.
    pub handler: &'static str,
    /// Parameter bindings.
    pub params: Vec<ParamSpec>,
    /// The call itself.
    pub invoke: Invoker<C>,
}

impl<C> fmt::Debug for RegisteredRoute<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredRoute")
            .field("method", &self.method)
            .field("template", &self.template.template())
            .field("handler", &self.handler)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Immutable route table, built once per dispatcher.
pub struct Registry<C> {
    routes: Vec<RegisteredRoute<C>>,
}

impl<C> Registry<C> {
    /// Builds the table from route definitions.
    ///
    /// Only definitions whose receiver matches are kept: instance methods
    /// when an instance is available, associated functions otherwise.
    /// Registration order is preserved.
    ///
    /// # Errors
    ///
    /// Fails on the first template that does not parse.
    pub fn build(definitions: Vec<RouteDefinition<C>>, with_instance: bool) -> Result<Self> {
        let wanted = if with_instance {
            Receiver::Instance
        } else {
            Receiver::Static
        };

        let mut routes = Vec::new();
        for def in definitions.into_iter().filter(|d| d.receiver == wanted) {
            let template = RouteTemplate::parse(def.template).inspect_err(|err| {
                warn!(handler = def.handler, error = %err, "Rejected route template");
            })?;
            routes.push(RegisteredRoute {
                method: def.method,
                template,
                handler: def.handler,
                params: def.params,
                invoke: def.invoke,
            });
        }

        Ok(Self { routes })
    }

    /// Finds the first route whose verb and template match.
    pub fn resolve(
        &self,
        method: Method,
        host: Option<&str>,
        path: &str,
    ) -> Option<(&RegisteredRoute<C>, RouteValues)> {
        self.routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| {
                route
                    .template
                    .match_path(host, path)
                    .map(|values| (route, values))
            })
    }

    /// Returns the registered routes in order.
    pub fn routes(&self) -> &[RegisteredRoute<C>] {
        &self.routes
    }

    /// Returns the number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true when no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<C> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.routes).finish()
    }
}
