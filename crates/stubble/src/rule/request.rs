//! The view of an incoming request that rules are scored against.

use super::core::canonical_header_name;
use super::types::RuleDefinition;
use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::HeaderMap;
use std::collections::{BTreeMap, HashMap};

/// Materialized request fields: method, query-stripped path, decoded query
/// parameters, headers and the raw body.
#[derive(Debug, Clone, Default)]
pub struct MatchRequest {
    method: String,
    path: String,
    query: HashMap<String, Vec<String>>,
    headers: HeaderMap,
    body: Bytes,
}

impl MatchRequest {
    /// Build a request from a method and a request target (`/path?query`).
    pub fn new(method: impl Into<String>, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        Self {
            method: method.into(),
            path: decode_path(path),
            query: parse_query(query),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Build a request from hyper request parts and an already collected body.
    pub fn from_parts(parts: &hyper::http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method.as_str().to_string(),
            path: decode_path(parts.uri.path()),
            query: parse_query(parts.uri.query()),
            headers: parts.headers.clone(),
            body,
        }
    }

    /// Append a header value. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Percent-decoded request path with any query string stripped.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// All values of a query parameter, or `None` when the key is absent.
    pub fn query_values(&self, name: &str) -> Option<&[String]> {
        self.query.get(name).map(Vec::as_slice)
    }

    /// All values of a header, compared by case-insensitive name.
    ///
    /// Returns `None` when the header is absent. Values that are not valid
    /// visible ASCII are skipped.
    pub fn header_values(&self, name: &str) -> Option<Vec<&str>> {
        let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
        if !self.headers.contains_key(&name) {
            return None;
        }
        Some(
            self.headers
                .get_all(&name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect(),
        )
    }

    /// Describe this request in the rule wire format.
    pub fn to_definition(&self) -> RuleDefinition {
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in &self.headers {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(canonical_header_name(name.as_str()))
                    .or_default()
                    .push(value.to_string());
            }
        }
        RuleDefinition {
            method: self.method.clone(),
            path: self.path().to_string(),
            params: self
                .query
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            headers,
            body_string: String::from_utf8_lossy(&self.body).into_owned(),
            ..Default::default()
        }
    }
}

/// Parse a query string into a multi-valued map.
///
/// Keys without `=` get an empty value, `+` decodes to a space and empty
/// segments are skipped.
pub fn parse_query(query: Option<&str>) -> HashMap<String, Vec<String>> {
    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    let Some(query) = query else {
        return params;
    };
    for pair in query.split('&').filter(|s| !s.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params
            .entry(decode_component(key))
            .or_default()
            .push(decode_component(value));
    }
    params
}

/// Percent-decode a path. `+` stays literal; an undecodable path is kept raw.
fn decode_path(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_query_and_parses_params() {
        let req = MatchRequest::new("GET", "/foo?a=b&x=z&x=y&x=bla");
        assert_eq!(req.path(), "/foo");
        assert_eq!(req.query_values("a"), Some(&["b".to_string()][..]));
        assert_eq!(
            req.query_values("x").map(|v| v.to_vec()),
            Some(vec!["z".to_string(), "y".to_string(), "bla".to_string()])
        );
        assert!(req.query_values("missing").is_none());
    }

    #[test]
    fn test_path_is_percent_decoded() {
        let req = MatchRequest::new("GET", "/caf%C3%A9%20menu?q=1");
        assert_eq!(req.path(), "/café menu");

        let req = MatchRequest::new("GET", "/a+b");
        assert_eq!(req.path(), "/a+b");

        // Not valid UTF-8 once decoded
        let req = MatchRequest::new("GET", "/bad%FF");
        assert_eq!(req.path(), "/bad%FF");
    }

    #[test]
    fn test_parse_query_decoding() {
        let params = parse_query(Some("name=hello%20world&q=a+b&flag&&empty="));
        assert_eq!(params["name"], vec!["hello world"]);
        assert_eq!(params["q"], vec!["a b"]);
        assert_eq!(params["flag"], vec![""]);
        assert_eq!(params["empty"], vec![""]);
        assert_eq!(params.len(), 4);

        assert!(parse_query(None).is_empty());
    }

    #[test]
    fn test_header_values_case_insensitive() {
        let req = MatchRequest::new("GET", "/")
            .with_header("x-api-key", "secret")
            .with_header("X-Api-Key", "other");
        assert_eq!(
            req.header_values("X-API-KEY"),
            Some(vec!["secret", "other"])
        );
        assert!(req.header_values("x-missing").is_none());
        assert!(req.header_values("bad header").is_none());
    }

    #[test]
    fn test_to_definition() {
        let req = MatchRequest::new("POST", "/items?id=7")
            .with_header("content-type", "application/json")
            .with_body(r#"{"a":1}"#);
        let def = req.to_definition();
        assert_eq!(def.method, "POST");
        assert_eq!(def.path, "/items");
        assert_eq!(def.params["id"], vec!["7"]);
        assert_eq!(def.headers["Content-Type"], vec!["application/json"]);
        assert_eq!(def.body_string, r#"{"a":1}"#);
    }
}
