//! The initialized `Rule` and its construction.

use super::types::{ResponseTemplate, RuleDefinition, RuleError};
use once_cell::sync::Lazy;
use regex::bytes::Regex as BytesRegex;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Name of the rule returned when nothing matches.
pub const NO_MATCH_NAME: &str = "no_match";

/// Body of the rule returned when nothing matches.
pub const NO_MATCH_BODY: &str = "no response for request";

/// Returned when nothing matches. A 5xx is used because a 404 is easily
/// confused with a prepared response.
static NO_MATCH: Lazy<Rule> = Lazy::new(|| Rule {
    definition: RuleDefinition {
        name: NO_MATCH_NAME.to_string(),
        response: ResponseTemplate {
            status_code: 501,
            body_string: NO_MATCH_BODY.to_string(),
            ..Default::default()
        },
        ..Default::default()
    },
    path_regex: None,
    body_string_regex: None,
});

/// A rule with its patterns compiled and its headers canonicalized.
///
/// Criteria are fixed once built; the match path only reads them.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(super) definition: RuleDefinition,
    pub(super) path_regex: Option<Regex>,
    pub(super) body_string_regex: Option<BytesRegex>,
}

impl Rule {
    /// Compile patterns and normalize a definition into a matchable rule.
    ///
    /// Building a rule from the definition of an already built rule yields
    /// the same rule.
    pub fn new(mut definition: RuleDefinition) -> Result<Self, RuleError> {
        let path_regex = compile_if_set(&definition.path_regex, "pathRegex", Regex::new)?;
        let body_string_regex = compile_if_set(
            &definition.body_string_regex,
            "bodyStringRegex",
            BytesRegex::new,
        )?;

        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, values) in std::mem::take(&mut definition.headers) {
            headers
                .entry(canonical_header_name(&name))
                .or_default()
                .extend(values);
        }
        for values in headers.values_mut() {
            values.sort();
        }
        definition.headers = headers;
        for values in definition.params.values_mut() {
            values.sort();
        }
        if matches!(definition.body_json, Some(serde_json::Value::Null)) {
            definition.body_json = None;
        }

        Ok(Self {
            definition,
            path_regex,
            body_string_regex,
        })
    }

    /// The built-in rule selected when no rule scores above zero.
    pub fn no_match() -> &'static Rule {
        &NO_MATCH
    }

    pub fn definition(&self) -> &RuleDefinition {
        &self.definition
    }

    pub fn into_definition(self) -> RuleDefinition {
        self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn response(&self) -> &ResponseTemplate {
        &self.definition.response
    }

    /// Whether both rules declare exactly the same match criteria.
    ///
    /// Name, description and response are not criteria.
    pub fn equal_match(&self, other: &Rule) -> bool {
        let (a, b) = (&self.definition, &other.definition);
        a.method == b.method
            && a.path == b.path
            && a.path_regex == b.path_regex
            && a.params == b.params
            && a.headers == b.headers
            && a.body_string == b.body_string
            && a.body_string_regex == b.body_string_regex
            && a.body_json == b.body_json
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.definition == other.definition
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.definition.serialize(serializer)
    }
}

fn compile_if_set<T>(
    pattern: &str,
    field: &'static str,
    compile: impl FnOnce(&str) -> Result<T, regex::Error>,
) -> Result<Option<T>, RuleError> {
    if pattern.is_empty() {
        return Ok(None);
    }
    compile(pattern)
        .map(Some)
        .map_err(|source| RuleError::InvalidPattern { field, source })
}

/// Canonical MIME header casing: `content-type` becomes `Content-Type`.
///
/// Names containing characters outside the HTTP token set are returned
/// unchanged.
pub fn canonical_header_name(name: &str) -> String {
    let is_token = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c);
    if name.is_empty() || !name.chars().all(is_token) {
        return name.to_string();
    }
    name.split('-')
        .map(|part| {
            part.chars()
                .enumerate()
                .map(|(i, c)| {
                    if i == 0 {
                        c.to_ascii_uppercase()
                    } else {
                        c.to_ascii_lowercase()
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<String>>()
        .join("-")
}
