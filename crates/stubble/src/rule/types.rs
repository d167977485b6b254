//! Wire types for rules and their responses.
//!
//! `RuleDefinition` is the external JSON representation of a rule, used by
//! rule files, the registration endpoint and the captured-request listing.
//! Field names are part of the wire contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Top-level field names accepted by the strict rule schema.
pub const RULE_FIELDS: &[&str] = &[
    "name",
    "description",
    "method",
    "path",
    "pathRegex",
    "params",
    "headers",
    "bodyString",
    "bodyStringRegex",
    "body",
    "response",
];

/// Field names accepted inside `response` by the strict rule schema.
pub const RESPONSE_FIELDS: &[&str] = &["statusCode", "bodyString", "bodyJson", "headers"];

/// A rule as it appears on the wire, before its patterns are compiled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    /// The name of the rule.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// A description, no functional impact.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// HTTP method to match.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    /// Exact path to match, without query string.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Regular expression the path must match.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path_regex: String,
    /// Required query parameters. An empty value list only checks presence.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Vec<String>>,
    /// Required request headers. An empty value list only checks presence.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
    /// Literal request body.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body_string: String,
    /// Regular expression tested against the raw request body.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body_string_regex: String,
    /// JSON body template. Any position may hold the wildcard token.
    #[serde(rename = "body", default, skip_serializing_if = "Option::is_none")]
    pub body_json: Option<Value>,
    /// The response to return.
    #[serde(default)]
    pub response: ResponseTemplate,
}

/// The response emitted when a rule wins.
///
/// Only one of `body_string` and `body_json` is expected to be set; a
/// non-empty `body_string` takes precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTemplate {
    #[serde(
        default = "default_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_json: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
}

impl Default for ResponseTemplate {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            body_string: String::new(),
            body_json: None,
            headers: BTreeMap::new(),
        }
    }
}

impl ResponseTemplate {
    /// Render the body bytes: the literal string if set, else the JSON body.
    pub fn render_body(&self) -> Vec<u8> {
        if !self.body_string.is_empty() {
            return self.body_string.as_bytes().to_vec();
        }
        match &self.body_json {
            Some(Value::Null) | None => Vec::new(),
            Some(json) => serde_json::to_vec(json).unwrap_or_default(),
        }
    }

    /// Whether the rendered body comes from `body_json`.
    pub fn is_json_body(&self) -> bool {
        self.body_string.is_empty() && !matches!(self.body_json, None | Some(Value::Null))
    }
}

pub(crate) fn default_status_code() -> u16 {
    200
}

/// Deserialize statusCode from either a number or a string
pub(crate) fn deserialize_status_code<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .filter(|n| (100..=999).contains(n))
            .ok_or_else(|| D::Error::custom(format!("invalid status code number: {n}"))),
        Value::String(s) => s
            .parse::<u16>()
            .ok()
            .filter(|n| (100..=999).contains(n))
            .ok_or_else(|| D::Error::custom(format!("invalid status code string: {s}"))),
        _ => Err(D::Error::custom("statusCode must be a number or string")),
    }
}

/// Errors raised while turning a definition into a matchable rule.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("error compiling {field}")]
    InvalidPattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },
}
