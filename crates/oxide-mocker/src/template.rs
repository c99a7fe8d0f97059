//! Route template matching.

use std::collections::HashMap;

use crate::error::{DispatchError, Result};

/// A segment in a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A literal segment, stored lower-cased.
    Literal(String),
    /// `*`: matches any single segment and captures nothing.
    Wildcard,
    /// `{name}`: matches any single segment and captures it under the
    /// lower-cased name.
    Param(String),
}

/// A parsed route template.
///
/// Templates may carry a scheme and host
/// (`http://service-test/api/{id}`); only the host takes part in matching,
/// the scheme and port are ignored.
#[derive(Debug, Clone)]
pub struct RouteTemplate {
    /// The original template string.
    template: String,
    /// Lower-cased host, when the template encodes one.
    host: Option<String>,
    /// Parsed path segments.
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Parses a template string.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_mocker::RouteTemplate;
    ///
    /// let template = RouteTemplate::parse("/posts/{Id}/*").unwrap();
    /// let values = template.match_path(None, "/POSTS/42/comments").unwrap();
    /// assert_eq!(values.get("id"), Some("42"));
    /// assert!(template.match_path(None, "/posts/42").is_none());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidTemplate`] for empty parameter names
    /// and catch-all parameters (`{*rest}`).
    pub fn parse(template: &str) -> Result<Self> {
        let target = split_target(template);
        let invalid = |reason: &str| DispatchError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        for part in split_segments(target.path) {
            if part == "*" {
                segments.push(Segment::Wildcard);
            } else if let Some(name) = part.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                let name = name.trim();
                if name.is_empty() {
                    return Err(invalid("empty parameter name"));
                }
                if name.starts_with('*') {
                    return Err(invalid("multi-segment parameters are not supported"));
                }
                segments.push(Segment::Param(name.to_lowercase()));
            } else {
                segments.push(Segment::Literal(part.to_lowercase()));
            }
        }

        Ok(Self {
            template: template.to_string(),
            host: target.host,
            segments,
        })
    }

    /// Attempts to match a request host and path against this template.
    ///
    /// The host is only compared when the template encodes one. Returns the
    /// captured route values on success.
    pub fn match_path(&self, host: Option<&str>, path: &str) -> Option<RouteValues> {
        if let Some(expected) = &self.host {
            if !host.is_some_and(|h| h.eq_ignore_ascii_case(expected)) {
                return None;
            }
        }

        let parts: Vec<&str> = split_segments(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut values = RouteValues::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Wildcard => {}
                Segment::Param(name) => values.insert(name.clone(), part),
                Segment::Literal(literal) => {
                    if !eq_ignore_case(literal, part) {
                        return None;
                    }
                }
            }
        }

        Some(values)
    }

    /// Returns the original template string.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the host the template is bound to, if any.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Returns the parsed segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

/// Route values captured by a template match, keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteValues {
    values: HashMap<String, String>,
}

impl RouteValues {
    /// Creates an empty set of route values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value. The key is lower-cased.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .insert(key.as_ref().to_lowercase(), value.into());
    }

    /// Gets a value by name, ignoring case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Returns the number of captured values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The pieces of a request target or template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target<'a> {
    pub host: Option<String>,
    pub path: &'a str,
    pub query: Option<&'a str>,
}

/// Splits `scheme://host:port/path?query#fragment` (or a bare
/// `/path?query`) into host, path and query.
pub(crate) fn split_target(target: &str) -> Target<'_> {
    let target = target.split('#').next().unwrap_or_default();

    let (host, rest) = match target.split_once("://") {
        Some((_, after_scheme)) => {
            let end = after_scheme
                .find(['/', '?'])
                .unwrap_or(after_scheme.len());
            let (authority, rest) = after_scheme.split_at(end);
            (authority_host(authority), rest)
        }
        None => (None, target),
    };

    match rest.split_once('?') {
        Some((path, query)) => Target {
            host,
            path,
            query: Some(query),
        },
        None => Target {
            host,
            path: rest,
            query: None,
        },
    }
}

/// Extracts the lower-cased host from an authority, dropping user info and
/// port.
fn authority_host(authority: &str) -> Option<String> {
    let authority = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);

    let host = if authority.starts_with('[') {
        authority
            .find(']')
            .map_or(authority, |end| &authority[..=end])
    } else {
        authority.split(':').next().unwrap_or_default()
    };

    (!host.is_empty()).then(|| host.to_lowercase())
}

/// Splits a path into segments after trimming leading and trailing slashes.
fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches('/').split('/')
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(s: &str) -> RouteTemplate {
        RouteTemplate::parse(s).unwrap()
    }

    #[test]
    fn test_literal_path() {
        let t = template("/users");
        assert!(t.match_path(None, "/users").is_some());
        assert!(t.match_path(None, "/users/").is_some());
        assert!(t.match_path(None, "users").is_some());
        assert!(t.match_path(None, "/posts").is_none());
    }

    #[test]
    fn test_parsed_segments() {
        let t = template("http://host/Files/{Name}/*/");
        assert_eq!(
            t.segments(),
            [
                Segment::Literal("files".to_string()),
                Segment::Param("name".to_string()),
                Segment::Wildcard,
            ]
        );
        assert_eq!(t.template(), "http://host/Files/{Name}/*/");
    }

    #[test]
    fn test_literal_is_case_insensitive() {
        let t = template("/Api/Test");
        assert!(t.match_path(None, "/api/TEST").is_some());
    }

    #[test]
    fn test_segment_count_must_match() {
        let t = template("/api/{id}");
        assert!(t.match_path(None, "/api").is_none());
        assert!(t.match_path(None, "/api/1/2").is_none());
    }

    #[test]
    fn test_param_capture_keeps_raw_value() {
        let t = template("/posts/{PostId}/comments/{comment_id}");
        let values = t.match_path(None, "/posts/AbC/comments/7").unwrap();
        assert_eq!(values.get("postid"), Some("AbC"));
        assert_eq!(values.get("PostId"), Some("AbC"));
        assert_eq!(values.get("comment_id"), Some("7"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_wildcard_captures_nothing() {
        let t = template("/files/*/raw");
        let values = t.match_path(None, "/files/readme/raw").unwrap();
        assert!(values.is_empty());
        assert!(t.match_path(None, "/files/a/b/raw").is_none());
    }

    #[test]
    fn test_root_template() {
        let t = template("/");
        assert!(t.match_path(None, "/").is_some());
        assert!(t.match_path(None, "").is_some());
        assert!(t.match_path(None, "/x").is_none());
    }

    #[test]
    fn test_host_is_matched_when_present() {
        let t = template("http://Service-Test/api/test");
        assert_eq!(t.host(), Some("service-test"));
        assert!(t.match_path(Some("service-test"), "/api/test").is_some());
        assert!(t.match_path(Some("SERVICE-TEST"), "/api/test").is_some());
        assert!(t.match_path(Some("other"), "/api/test").is_none());
        assert!(t.match_path(None, "/api/test").is_none());
    }

    #[test]
    fn test_host_is_ignored_when_absent() {
        let t = template("/api/test");
        assert!(t.match_path(Some("anything"), "/api/test").is_some());
    }

    #[test]
    fn test_invalid_templates() {
        assert!(matches!(
            RouteTemplate::parse("/api/{}"),
            Err(DispatchError::InvalidTemplate { .. })
        ));
        assert!(matches!(
            RouteTemplate::parse("/files/{*path}"),
            Err(DispatchError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_split_target() {
        let t = split_target("https://user@Example.com:8080/a/b?x=1#frag");
        assert_eq!(t.host.as_deref(), Some("example.com"));
        assert_eq!(t.path, "/a/b");
        assert_eq!(t.query, Some("x=1"));

        let t = split_target("/a?b=c");
        assert_eq!(t.host, None);
        assert_eq!(t.path, "/a");
        assert_eq!(t.query, Some("b=c"));

        let t = split_target("http://host?q");
        assert_eq!(t.host.as_deref(), Some("host"));
        assert_eq!(t.path, "");
        assert_eq!(t.query, Some("q"));
    }
}
