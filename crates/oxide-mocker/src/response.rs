//! Canonical HTTP response type.

use std::collections::HashMap;

use bytes::Bytes;
use http_body_util::Full;

use crate::error::{DispatchError, Result};

/// Media type of JSON responses.
pub const APPLICATION_JSON: &str = "application/json; charset=utf-8";

/// An HTTP response produced by the dispatcher.
///
/// A response carries content exactly when it has a `Content-Type` header;
/// the body of a content-less response is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a new response with the given status and no content.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Creates a 200 OK response.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Creates a 404 Not Found response with an empty body.
    pub fn not_found() -> Self {
        Self::new(404)
    }

    /// Creates a response with already serialized JSON content.
    pub fn json_bytes(status: u16, body: Vec<u8>) -> Self {
        Self::new(status)
            .header("Content-Type", APPLICATION_JSON)
            .body(body)
    }

    /// Creates a response with text content of the given media type.
    ///
    /// A `charset=utf-8` parameter is added unless the media type names one.
    pub fn text(status: u16, content: impl Into<String>, media_type: &str) -> Self {
        let content_type = if media_type.to_ascii_lowercase().contains("charset=") {
            media_type.to_string()
        } else {
            format!("{media_type}; charset=utf-8")
        };
        let content: String = content.into();
        Self::new(status)
            .header("Content-Type", content_type)
            .body(content)
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the `Content-Type` header, if the response has content.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the decoding error for empty or malformed bodies.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Converts into an `http::Response`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidStatus`] for status codes `http`
    /// cannot represent. Headers with invalid names or values are skipped.
    pub fn into_http(self) -> Result<http::Response<Full<Bytes>>> {
        let status = http::StatusCode::from_u16(self.status)
            .map_err(|_| DispatchError::InvalidStatus(self.status))?;

        let mut response = http::Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (key, value) in self.headers {
            if let (Ok(name), Ok(value)) = (
                http::HeaderName::from_bytes(key.as_bytes()),
                http::HeaderValue::from_str(&value),
            ) {
                headers.insert(name, value);
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text() {
        let res = Response::text(200, "hello", "text/plain");
        assert_eq!(res.status, 200);
        assert_eq!(res.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(res.body_string(), Some("hello".to_string()));

        let res = Response::text(200, "x", "text/csv; charset=latin1");
        assert_eq!(res.content_type(), Some("text/csv; charset=latin1"));
    }

    #[test]
    fn test_response_json() {
        let res = Response::json_bytes(201, br#"{"name":"test"}"#.to_vec());
        assert_eq!(res.status, 201);
        assert_eq!(res.content_type(), Some(APPLICATION_JSON));
        let value: serde_json::Value = res.json().unwrap();
        assert_eq!(value, serde_json::json!({"name": "test"}));
    }

    #[test]
    fn test_not_found_has_no_content() {
        let res = Response::not_found();
        assert_eq!(res.status, 404);
        assert!(res.body.is_empty());
        assert_eq!(res.content_type(), None);
    }

    #[test]
    fn test_into_http() {
        let res = Response::text(202, "done", "text/plain").header("X-Custom", "value");
        let http = res.into_http().unwrap();
        assert_eq!(http.status(), http::StatusCode::ACCEPTED);
        assert_eq!(http.headers()["x-custom"], "value");
        assert_eq!(http.headers()["content-type"], "text/plain; charset=utf-8");
    }

    #[test]
    fn test_into_http_rejects_invalid_status() {
        assert!(matches!(
            Response::new(1000).into_http(),
            Err(DispatchError::InvalidStatus(1000))
        ));
    }
}
