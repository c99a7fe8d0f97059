//! Conversion of handler return values into responses.

use serde_json::Value;
use tracing::debug;

use crate::action::{ActionResult, ReturnValue};
use crate::error::{DispatchError, Result};
use crate::response::Response;

/// Converts a handler return value into a [`Response`].
///
/// Deferred values are awaited until a concrete value is available.
///
/// # Errors
///
/// Propagates the failure of a deferred value unchanged, and serialization
/// faults.
pub async fn convert(mut value: ReturnValue) -> Result<Response> {
    loop {
        value = match value {
            ReturnValue::Deferred(pending) => pending.await?,
            ReturnValue::Void => return Ok(Response::ok()),
            ReturnValue::Json(value) => return json_response(None, Some(value)),
            ReturnValue::Action(action) => return convert_action(action),
        };
    }
}

/// Converts an action result.
///
/// # Errors
///
/// Returns [`DispatchError::Serialization`] when the object value cannot be
/// encoded.
pub fn convert_action(action: ActionResult) -> Result<Response> {
    let response = match action {
        ActionResult::Object { status, value } => json_response(status, value)?,
        ActionResult::StatusCode(status) => Response::new(status),
        ActionResult::Content {
            status,
            content,
            content_type,
        } => Response::text(
            status.unwrap_or(200),
            content.unwrap_or_default(),
            content_type.as_deref().unwrap_or("text/plain"),
        ),
        ActionResult::Other => json_response(None, None)?,
    };
    debug!(status = response.status, "Converted action result");
    Ok(response)
}

/// A JSON response; a missing or `null` value yields an empty body.
fn json_response(status: Option<u16>, value: Option<Value>) -> Result<Response> {
    let body = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => serde_json::to_vec(&value).map_err(DispatchError::Serialization)?,
    };
    Ok(Response::json_bytes(status.unwrap_or(200), body))
}
