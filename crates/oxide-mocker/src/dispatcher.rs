//! The mock dispatcher: resolve, bind, invoke, convert.

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use tracing::debug;

use crate::binder::{self, Arguments};
use crate::convert::convert;
use crate::error::{BoxError, Result};
use crate::registry::{Controller, Registry};
use crate::request::Request;
use crate::response::Response;

/// In-process stand-in for a network listener.
///
/// Built once per controller type: the route table is read-only afterwards
/// and shared between clones, so concurrent requests only share lookups.
///
/// # Example
///
/// ```ignore
/// use oxide_mocker::{controller, ActionResult, MockDispatcher, Request};
///
/// struct Items;
///
/// #[controller]
/// impl Items {
///     #[route("/items/{id}")]
///     #[get]
///     pub fn show(id: u32) -> ActionResult<u32> {
///         ActionResult::ok(id)
///     }
/// }
///
/// let dispatcher = MockDispatcher::<Items>::new()?;
/// let response = dispatcher.handle(Request::get("/items/3")).await?;
/// assert_eq!(response.body_string(), Some("3".to_string()));
/// ```
pub struct MockDispatcher<C> {
    registry: Arc<Registry<C>>,
    instance: Option<Arc<C>>,
}

impl<C: Controller> MockDispatcher<C> {
    /// Creates a dispatcher over the controller's associated functions.
    ///
    /// # Errors
    ///
    /// Fails when a route template does not parse.
    pub fn new() -> Result<Self> {
        Ok(Self {
            registry: Arc::new(Registry::build(C::routes(), false)?),
            instance: None,
        })
    }

    /// Creates a dispatcher over the `&self` methods of `instance`.
    ///
    /// # Errors
    ///
    /// Fails when a route template does not parse.
    pub fn with_instance(instance: C) -> Result<Self> {
        Self::from_arc(Arc::new(instance))
    }

    /// Creates a dispatcher over a shared instance.
    ///
    /// # Errors
    ///
    /// Fails when a route template does not parse.
    pub fn from_arc(instance: Arc<C>) -> Result<Self> {
        Ok(Self {
            registry: Arc::new(Registry::build(C::routes(), true)?),
            instance: Some(instance),
        })
    }
}

impl<C> MockDispatcher<C> {
    /// Returns the route table.
    pub fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    /// Handles a request.
    ///
    /// An unmatched request is answered with an empty 404.
    ///
    /// # Errors
    ///
    /// Binding faults, body faults and handler failures abort the request
    /// and are returned as-is.
    pub async fn handle(&self, mut request: Request) -> Result<Response> {
        let resolved = request.method.and_then(|method| {
            self.registry
                .resolve(method, request.host.as_deref(), &request.path)
        });

        let Some((route, route_values)) = resolved else {
            debug!(method = ?request.method, path = %request.path, "No route matched");
            return Ok(Response::not_found());
        };

        debug!(
            method = %route.method,
            path = %request.path,
            handler = route.handler,
            "Resolved route"
        );

        let args = binder::bind(&route.params, &route_values, &mut request).await?;
        let value = (route.invoke)(self.instance.clone(), Arguments::new(route.handler, args)).await?;
        let response = convert(value).await?;

        debug!(handler = route.handler, status = response.status, "Handled request");
        Ok(response)
    }

    /// Handles an `http::Request`, reading its body only if a parameter
    /// needs it.
    ///
    /// # Errors
    ///
    /// As [`handle`](Self::handle), plus
    /// [`DispatchError::InvalidStatus`](crate::DispatchError::InvalidStatus)
    /// when the response status cannot be represented.
    pub async fn send<B>(&self, request: http::Request<B>) -> Result<http::Response<Full<Bytes>>>
    where
        B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        self.handle(Request::from_http(request)).await?.into_http()
    }
}

impl<C> Clone for MockDispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            instance: self.instance.clone(),
        }
    }
}

impl<C> std::fmt::Debug for MockDispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDispatcher")
            .field("routes", &self.registry.len())
            .field("has_instance", &self.instance.is_some())
            .finish()
    }
}
