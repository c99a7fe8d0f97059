//! Incoming request type.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::BodyExt;

use crate::error::{BoxError, DispatchError, Result};
use crate::template::split_target;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method
    Get,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// PATCH method
    Patch,
    /// DELETE method
    Delete,
    /// HEAD method
    Head,
    /// OPTIONS method
    Options,
    /// TRACE method
    Trace,
    /// CONNECT method
    Connect,
}

impl Method {
    /// Returns the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Connect => "CONNECT",
        }
    }
}

/// Error returned when a method name is not a standard HTTP verb.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "TRACE" => Ok(Self::Trace),
            "CONNECT" => Ok(Self::Connect),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = UnknownMethod;

    fn try_from(method: &http::Method) -> std::result::Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request body, read at most once and only when a parameter asks for it.
pub struct RequestBody {
    state: BodyState,
}

enum BodyState {
    Empty,
    Buffered(Bytes),
    Pending(BoxBody<Bytes, BoxError>),
}

impl RequestBody {
    /// A body with no content.
    pub fn empty() -> Self {
        Self {
            state: BodyState::Empty,
        }
    }

    /// A body whose bytes are already in memory.
    pub fn buffered(bytes: impl Into<Bytes>) -> Self {
        Self {
            state: BodyState::Buffered(bytes.into()),
        }
    }

    /// A body that is collected from a stream on first read.
    pub fn streaming<B>(body: B) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        Self {
            state: BodyState::Pending(body.map_err(Into::<BoxError>::into).boxed()),
        }
    }

    /// Reads the whole body. An empty body reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::BodyRead`] when the stream fails.
    pub async fn read(&mut self) -> Result<Option<Bytes>> {
        self.state = match std::mem::replace(&mut self.state, BodyState::Empty) {
            BodyState::Pending(body) => {
                let collected = body.collect().await.map_err(DispatchError::BodyRead)?;
                BodyState::Buffered(collected.to_bytes())
            }
            state => state,
        };

        Ok(match &self.state {
            BodyState::Buffered(bytes) if !bytes.is_empty() => Some(bytes.clone()),
            _ => None,
        })
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            BodyState::Empty => f.write_str("RequestBody::Empty"),
            BodyState::Buffered(bytes) => write!(f, "RequestBody::Buffered({} bytes)", bytes.len()),
            BodyState::Pending(_) => f.write_str("RequestBody::Pending"),
        }
    }
}

/// An incoming request, decomposed for route resolution and binding.
#[derive(Debug, Default)]
pub struct Request {
    /// HTTP method.
    pub method: Option<Method>,
    /// Lower-cased host, when the request target was absolute.
    pub host: Option<String>,
    /// Request path, without query string.
    pub path: String,
    /// Query string parameters. The last value wins for duplicate keys.
    pub query: HashMap<String, String>,
    /// Request headers, keyed by lower-cased name.
    pub headers: HashMap<String, Vec<String>>,
    /// Request body.
    pub body: RequestBody,
}

impl Request {
    /// Creates a new request.
    ///
    /// `target` is either an absolute URL (`http://host/path?query`) or a
    /// path with an optional query string.
    pub fn new(method: Method, target: &str) -> Self {
        let target = split_target(target);
        Self {
            method: Some(method),
            host: target.host,
            path: target.path.to_string(),
            query: target.query.map(parse_query_string).unwrap_or_default(),
            headers: HashMap::new(),
            body: RequestBody::empty(),
        }
    }

    /// Creates a GET request.
    pub fn get(target: &str) -> Self {
        Self::new(Method::Get, target)
    }

    /// Creates a POST request.
    pub fn post(target: &str) -> Self {
        Self::new(Method::Post, target)
    }

    /// Creates a PUT request.
    pub fn put(target: &str) -> Self {
        Self::new(Method::Put, target)
    }

    /// Creates a DELETE request.
    pub fn delete(target: &str) -> Self {
        Self::new(Method::Delete, target)
    }

    /// Converts an `http::Request`, keeping its body stream unread.
    ///
    /// Extension methods that are not standard verbs leave `method` empty,
    /// which no route matches.
    pub fn from_http<B>(request: http::Request<B>) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();
        let target = split_target(
            parts
                .uri
                .path_and_query()
                .map_or("/", http::uri::PathAndQuery::as_str),
        );

        let mut headers: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in &parts.headers {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let host = parts
            .uri
            .host()
            .map(str::to_lowercase)
            .or_else(|| {
                headers
                    .get("host")
                    .and_then(|values| values.first())
                    .map(|h| h.split(':').next().unwrap_or_default().to_lowercase())
            });

        Self {
            method: Method::try_from(&parts.method).ok(),
            host,
            path: target.path.to_string(),
            query: target.query.map(parse_query_string).unwrap_or_default(),
            headers,
            body: RequestBody::streaming(body),
        }
    }

    /// Appends a header value.
    #[must_use]
    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(key.to_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    /// Sets a query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::buffered(body);
        self
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Serialization`] when `value` cannot be
    /// serialized.
    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value).map_err(DispatchError::Serialization)?;
        Ok(self
            .header("content-type", "application/json; charset=utf-8")
            .body(body))
    }

    /// Gets the first value of a header, ignoring case.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Gets a query parameter. Keys are case-sensitive.
    pub fn get_query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

/// Parses query parameters from a query string.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (urlencoding_decode(key), urlencoding_decode(value))
        })
        .collect()
}

/// Percent-decoding with `+` as space. Invalid escapes are kept verbatim.
fn urlencoding_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let byte = s
                    .get(i + 1..i + 3)
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                if let Some(byte) = byte {
                    decoded.push(byte);
                    i += 3;
                    continue;
                }
                decoded.push(b'%');
            }
            b'+' => decoded.push(b' '),
            b => decoded.push(b),
        }
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}
