//! # oxide-mocker
//!
//! In-process HTTP dispatching for testing request handlers without a
//! network listener.
//!
//! This crate provides:
//! - Route templates with literal, `{name}` and `*` segments
//! - A `#[controller]` attribute that registers annotated methods
//! - Argument binding from route values, query string, headers and body
//! - Conversion of handler results (plain values, [`ActionResult`],
//!   futures, `()`) into HTTP responses
//! - A [`MockDispatcher`] usable directly or as a `tower::Service`
//!
//! ## Quick Start
//!
//! ```ignore
//! use oxide_mocker::{controller, ActionResult, MockDispatcher, Request};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct NewItem {
//!     name: String,
//! }
//!
//! struct Items;
//!
//! #[controller]
//! impl Items {
//!     #[route("http://service-test/api/items/{id}")]
//!     #[post]
//!     pub fn update(
//!         id: u32,
//!         #[from_query] dry_run: Option<bool>,
//!         #[from_header(name = "x-user")] user: String,
//!         #[from_body] item: NewItem,
//!     ) -> ActionResult<NewItem> {
//!         ActionResult::ok(item)
//!     }
//! }
//!
//! let dispatcher = MockDispatcher::<Items>::new()?;
//! let request = Request::post("http://service-test/api/items/3?dry_run=true")
//!     .header("x-user", "alice")
//!     .json(&NewItem { name: "pen".into() })?;
//! let response = dispatcher.handle(request).await?;
//! assert_eq!(response.status, 200);
//! ```
//!
//! ## Route Templates
//!
//! Templates are split on `/` after trimming leading and trailing slashes
//! and must have as many segments as the request path. Literal segments
//! compare case-insensitively, `{name}` captures a segment under the
//! lower-cased name, `*` matches a segment without capturing it. When the
//! template names a host, the request host must match too.
//!
//! When several routes match, the first one declared wins.
//!
//! ## Binding
//!
//! | Annotation | Source |
//! |------------|--------|
//! | none or `#[from_route]` | captured route value, by parameter name |
//! | `#[from_query]` / `#[from_query(name = "..")]` | query string |
//! | `#[from_header]` / `#[from_header(name = "..")]` | first header value |
//! | `#[from_body]` | request body: `String` as text, `Vec<u8>` raw, others JSON |
//!
//! `#[default(expr)]` supplies a value when nothing was bound; `Option<T>`
//! parameters receive `None`.

mod action;
mod binder;
mod convert;
mod dispatcher;
mod error;
mod registry;
mod request;
mod response;
mod service;
mod template;

pub use action::{ActionResult, IntoReturnValue, ReturnValue};
pub use binder::{
    bind, coerce, Arguments, BindingSource, BoundArgument, DefaultValue, ParamSpec, ValueKind,
};
pub use convert::{convert, convert_action};
pub use dispatcher::MockDispatcher;
pub use error::{BoxError, DispatchError, Result};
pub use oxide_mocker_derive::controller;
pub use registry::{Controller, Invoker, Receiver, RegisteredRoute, Registry, RouteDefinition};
pub use request::{parse_query_string, Method, Request, RequestBody, UnknownMethod};
pub use response::{Response, APPLICATION_JSON};
pub use template::{RouteTemplate, RouteValues, Segment};

/// Support items for code generated by `#[controller]`. Not public API.
#[doc(hidden)]
pub mod __private {
    pub use futures::future::BoxFuture;

    use crate::error::{DispatchError, Result};

    /// Serializes a parameter default.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Serialization`] when the value has no JSON
    /// form.
    pub fn default_value<T: serde::Serialize>(value: T) -> Result<serde_json::Value> {
        serde_json::to_value(value).map_err(DispatchError::Serialization)
    }
}
