//! Error types for dispatching.

use thiserror::Error;

/// Boxed error produced by a handler method.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dispatch-time faults.
///
/// A request that matches no route is not an error: it is answered with a
/// 404 [`Response`](crate::Response). Every variant here aborts the request
/// without synthesizing a response.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A route template could not be parsed.
    #[error("invalid route template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// A route, query or header value could not be coerced to the declared
    /// parameter type.
    #[error("cannot bind `{value}` to parameter `{parameter}`: {reason}")]
    BindingConversion {
        parameter: String,
        value: String,
        reason: String,
    },

    /// The request body does not decode into the declared parameter type.
    #[error("cannot deserialize request body into parameter `{parameter}`: {source}")]
    BodyDeserialization {
        parameter: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request body is not valid UTF-8 text.
    #[error("request body bound to `{parameter}` is not valid UTF-8")]
    BodyEncoding { parameter: String },

    /// Reading the request body stream failed.
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] BoxError),

    /// No value was bound and the parameter type cannot represent absence.
    #[error("no value bound for required parameter `{0}`")]
    MissingArgument(String),

    /// An instance route was invoked on a dispatcher built without an
    /// instance.
    #[error("handler `{0}` requires an instance but the dispatcher has none")]
    MissingInstance(&'static str),

    /// The invoker consumed more arguments than the binder produced.
    #[error("handler `{0}` received fewer arguments than it declares")]
    ArgumentCount(&'static str),

    /// A handler produced a status code outside `100..=999`.
    #[error("invalid HTTP status code: {0}")]
    InvalidStatus(u16),

    /// A handler result could not be serialized to JSON.
    #[error("failed to serialize handler result: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The handler method itself failed. The original error is kept as-is.
    #[error(transparent)]
    Handler(BoxError),
}

impl DispatchError {
    /// Wraps a handler failure without translating it.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    /// Returns the handler error if this fault came from the handler.
    pub fn handler_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Handler(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
