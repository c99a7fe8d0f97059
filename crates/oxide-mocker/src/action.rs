//! Handler return values.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DispatchError, Result};

/// A structured handler result that dictates status and content.
///
/// # Example
///
/// ```
/// use oxide_mocker::ActionResult;
///
/// fn find(id: u32) -> ActionResult<String> {
///     if id == 0 {
///         ActionResult::not_found()
///     } else {
///         ActionResult::ok(format!("item {id}"))
///     }
/// }
/// # let _ = find(1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult<T = Value> {
    /// A value serialized as JSON. Status defaults to 200; a missing value
    /// produces an empty body.
    Object {
        status: Option<u16>,
        value: Option<T>,
    },
    /// A bare status code with no body.
    StatusCode(u16),
    /// Raw text content. Status defaults to 200, content type to
    /// `text/plain`.
    Content {
        status: Option<u16>,
        content: Option<String>,
        content_type: Option<String>,
    },
    /// Any other result: 200 with an empty JSON body.
    Other,
}

impl<T> ActionResult<T> {
    /// 200 with a JSON value.
    pub const fn ok(value: T) -> Self {
        Self::object(200, value)
    }

    /// 201 with a JSON value.
    pub const fn created(value: T) -> Self {
        Self::object(201, value)
    }

    /// 202 with a JSON value.
    pub const fn accepted(value: T) -> Self {
        Self::object(202, value)
    }

    /// 400 with a JSON value.
    pub const fn bad_request(value: T) -> Self {
        Self::object(400, value)
    }

    /// The given status with a JSON value.
    pub const fn object(status: u16, value: T) -> Self {
        Self::Object {
            status: Some(status),
            value: Some(value),
        }
    }

    /// 404 with no body.
    pub const fn not_found() -> Self {
        Self::StatusCode(404)
    }

    /// 204 with no body.
    pub const fn no_content() -> Self {
        Self::StatusCode(204)
    }

    /// The given status with no body.
    pub const fn status(code: u16) -> Self {
        Self::StatusCode(code)
    }

    /// 200 with `text/plain` content.
    pub fn content(content: impl Into<String>) -> Self {
        Self::Content {
            status: None,
            content: Some(content.into()),
            content_type: None,
        }
    }

    /// 200 with content of the given media type.
    pub fn content_with_type(content: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self::Content {
            status: None,
            content: Some(content.into()),
            content_type: Some(content_type.into()),
        }
    }

    /// Maps the object value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActionResult<U> {
        match self {
            Self::Object { status, value } => ActionResult::Object {
                status,
                value: value.map(f),
            },
            Self::StatusCode(code) => ActionResult::StatusCode(code),
            Self::Content {
                status,
                content,
                content_type,
            } => ActionResult::Content {
                status,
                content,
                content_type,
            },
            Self::Other => ActionResult::Other,
        }
    }
}

/// A handler return value, normalized for conversion.
pub enum ReturnValue {
    /// Nothing was returned.
    Void,
    /// A plain value, serialized as JSON.
    Json(Value),
    /// A structured action result.
    Action(ActionResult),
    /// A result that is not available yet.
    Deferred(BoxFuture<'static, Result<ReturnValue>>),
}

impl ReturnValue {
    /// Wraps a future whose output is converted once it resolves.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future + Send + 'static,
        F::Output: IntoReturnValue,
    {
        Self::Deferred(Box::pin(async move { future.await.into_return_value() }))
    }
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("Void"),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Conversion of handler results into a [`ReturnValue`].
///
/// Implemented for every `Serialize` type (`()` and `None` count as void),
/// for [`ActionResult`] and for [`ReturnValue`] itself.
pub trait IntoReturnValue {
    /// Performs the conversion.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Serialization`] when a value cannot be
    /// represented as JSON.
    fn into_return_value(self) -> Result<ReturnValue>;
}

impl<T: Serialize> IntoReturnValue for T {
    fn into_return_value(self) -> Result<ReturnValue> {
        match serde_json::to_value(self).map_err(DispatchError::Serialization)? {
            Value::Null => Ok(ReturnValue::Void),
            value => Ok(ReturnValue::Json(value)),
        }
    }
}

impl<T: Serialize> IntoReturnValue for ActionResult<T> {
    fn into_return_value(self) -> Result<ReturnValue> {
        let action = match self {
            Self::Object { status, value } => ActionResult::Object {
                status,
                value: value
                    .map(serde_json::to_value)
                    .transpose()
                    .map_err(DispatchError::Serialization)?,
            },
            other => other.map(|_| Value::Null),
        };
        Ok(ReturnValue::Action(action))
    }
}

impl IntoReturnValue for ReturnValue {
    fn into_return_value(self) -> Result<ReturnValue> {
        Ok(self)
    }
}
