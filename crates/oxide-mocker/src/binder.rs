//! Argument binding.
//!
//! Each handler parameter draws its value from exactly one source:
//!
//! 1. a header (`#[from_header]`), first value wins
//! 2. the query string (`#[from_query]`), case-sensitive key
//! 3. the request body (`#[from_body]`), read fully before binding goes on
//! 4. the captured route values (default), case-insensitive name
//!
//! An absent value falls back to the declared default. Raw strings are
//! coerced through a closed set of converters selected by [`ValueKind`];
//! everything is carried as a [`serde_json::Value`] until the invoker
//! deserializes it into the declared Rust type.

use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use tracing::trace;

use crate::error::{DispatchError, Result};
use crate::request::Request;
use crate::template::RouteValues;

/// Declared type tag of a handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `String`, `str`, `char`.
    Text,
    /// Integer primitives.
    Integer,
    /// `f32`, `f64`.
    Float,
    /// `bool`.
    Boolean,
    /// A unit-variant enum deserialized from its name.
    Enum,
    /// Raw bytes (`Vec<u8>`, `Bytes`). Body only.
    Bytes,
    /// Any other type. Body only, decoded as JSON.
    Json,
}

/// Where a parameter takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    /// Captured route value, looked up by parameter name.
    Route,
    /// Query string value for the given key.
    Query(&'static str),
    /// First value of the given header.
    Header(&'static str),
    /// The request body.
    Body,
}

/// Produces the default value of a parameter.
///
/// Fails with [`DispatchError::Serialization`] when the default has no JSON
/// form.
pub type DefaultValue = fn() -> Result<Value>;

/// Static binding description of one handler parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    /// Parameter name as declared.
    pub name: &'static str,
    /// Declared type tag.
    pub kind: ValueKind,
    /// Binding source.
    pub source: BindingSource,
    /// Default used when no value is bound.
    pub default: Option<DefaultValue>,
}

impl ParamSpec {
    /// Creates a route-bound parameter with no default.
    pub const fn new(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            kind,
            source: BindingSource::Route,
            default: None,
        }
    }

    /// Sets the binding source.
    #[must_use]
    pub const fn source(mut self, source: BindingSource) -> Self {
        self.source = source;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub const fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// A bound argument, not yet converted to its Rust type.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgument {
    /// Parameter name.
    pub name: &'static str,
    /// Source the value came from.
    pub source: BindingSource,
    /// The value, or `None` when nothing was bound.
    pub value: Option<Value>,
}

impl BoundArgument {
    /// Deserializes the argument into the declared parameter type.
    ///
    /// # Errors
    ///
    /// An absent value is only accepted by types that deserialize from
    /// `null` (such as `Option<T>`), otherwise this is
    /// [`DispatchError::MissingArgument`]. A value of the wrong shape is a
    /// [`DispatchError::BodyDeserialization`] for body parameters and a
    /// [`DispatchError::BindingConversion`] for the others.
    pub fn extract<T: DeserializeOwned>(self) -> Result<T> {
        let Some(value) = self.value else {
            return serde_json::from_value(Value::Null)
                .map_err(|_| DispatchError::MissingArgument(self.name.to_string()));
        };

        let raw = match &value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        serde_json::from_value(value).map_err(|err| match self.source {
            BindingSource::Body => DispatchError::BodyDeserialization {
                parameter: self.name.to_string(),
                source: err,
            },
            _ => DispatchError::BindingConversion {
                parameter: self.name.to_string(),
                value: raw,
                reason: err.to_string(),
            },
        })
    }
}

/// Bound arguments in declaration order, consumed by the handler invoker.
#[derive(Debug)]
pub struct Arguments {
    handler: &'static str,
    args: std::vec::IntoIter<BoundArgument>,
}

impl Arguments {
    /// Wraps bound arguments for a handler.
    pub fn new(handler: &'static str, args: Vec<BoundArgument>) -> Self {
        Self {
            handler,
            args: args.into_iter(),
        }
    }

    /// Takes the next argument as type `T`.
    ///
    /// # Errors
    ///
    /// See [`BoundArgument::extract`]. Running out of arguments is a
    /// [`DispatchError::ArgumentCount`].
    pub fn take<T: DeserializeOwned>(&mut self) -> Result<T> {
        self.args
            .next()
            .ok_or(DispatchError::ArgumentCount(self.handler))?
            .extract()
    }
}

/// Binds every parameter of a handler against a request.
///
/// The body is read (and awaited) only when a parameter is body-bound.
///
/// # Errors
///
/// Fails on the first value that cannot be coerced, on malformed bodies and
/// on body read failures.
pub async fn bind(
    params: &[ParamSpec],
    route_values: &RouteValues,
    request: &mut Request,
) -> Result<Vec<BoundArgument>> {
    let mut args = Vec::with_capacity(params.len());

    for spec in params {
        let value = match spec.source {
            BindingSource::Header(header) => request
                .get_header(header)
                .map(|raw| coerce(spec, raw))
                .transpose()?,
            BindingSource::Query(key) => request
                .get_query(key)
                .map(|raw| coerce(spec, raw))
                .transpose()?,
            BindingSource::Body => read_body(spec, request).await?,
            BindingSource::Route => route_values
                .get(spec.name)
                .map(|raw| coerce(spec, raw))
                .transpose()?,
        };

        // A JSON `null` counts as absent, so the default still applies.
        let value = match value.filter(|v| !v.is_null()) {
            Some(value) => Some(value),
            None => spec
                .default
                .map(|default| default())
                .transpose()?
                .filter(|v| !v.is_null()),
        };
        trace!(parameter = spec.name, source = ?spec.source, value = ?value, "Bound argument");

        args.push(BoundArgument {
            name: spec.name,
            source: spec.source,
            value,
        });
    }

    Ok(args)
}

/// Coerces a raw route, query or header string to the parameter's kind.
///
/// Conversion is locale-invariant: `.` is the only decimal separator and
/// booleans are `true`/`false` in any case.
///
/// # Errors
///
/// Returns [`DispatchError::BindingConversion`] when the text does not
/// parse, or when the kind has no string form (bytes, JSON objects).
pub fn coerce(spec: &ParamSpec, raw: &str) -> Result<Value> {
    let fail = |reason: &str| DispatchError::BindingConversion {
        parameter: spec.name.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    match spec.kind {
        ValueKind::Text | ValueKind::Enum => Ok(Value::String(raw.to_string())),
        ValueKind::Integer => {
            let trimmed = raw.trim();
            trimmed
                .parse::<i64>()
                .map(Number::from)
                .or_else(|_| trimmed.parse::<u64>().map(Number::from))
                .map(Value::Number)
                .map_err(|_| fail("not an integer"))
        }
        ValueKind::Float => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| fail("not a finite number")),
        ValueKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(fail("not a boolean")),
        },
        ValueKind::Bytes | ValueKind::Json => {
            Err(fail("type cannot be bound from route, query or header values"))
        }
    }
}

/// Reads the body for a body-bound parameter.
async fn read_body(spec: &ParamSpec, request: &mut Request) -> Result<Option<Value>> {
    let Some(bytes) = request.body.read().await? else {
        return Ok(None);
    };

    let value = match spec.kind {
        ValueKind::Text => {
            let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                DispatchError::BodyEncoding {
                    parameter: spec.name.to_string(),
                }
            })?;
            Value::String(text)
        }
        ValueKind::Bytes => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
        _ => serde_json::from_slice(&bytes).map_err(|err| DispatchError::BodyDeserialization {
            parameter: spec.name.to_string(),
            source: err,
        })?,
    };

    Ok(Some(value))
}
