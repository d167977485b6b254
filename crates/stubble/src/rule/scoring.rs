//! Scoring of a rule against a request.
//!
//! Every criterion a rule declares adds to the score when satisfied. Failing
//! a hard criterion (method, path, path pattern, params, headers) adds
//! [`MISMATCH`], which no combination of positive contributions can offset.
//! Undeclared criteria contribute nothing.

use super::core::Rule;
use super::json_match::score_body_json;
use super::request::MatchRequest;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Contribution of a failed hard criterion.
pub const MISMATCH: i64 = -1000;

impl Rule {
    /// Score this rule against a request. Pure; no I/O.
    pub fn score(&self, request: &MatchRequest) -> i64 {
        self.score_method(request)
            + self.score_path(request)
            + self.score_path_regex(request)
            + score_params(&self.definition.params, request)
            + score_headers(&self.definition.headers, request)
            + self.score_body_string_regex(request)
            + score_body_json(self.definition.body_json.as_ref(), request.body())
    }

    fn score_method(&self, request: &MatchRequest) -> i64 {
        exact(&self.definition.method, request.method())
    }

    fn score_path(&self, request: &MatchRequest) -> i64 {
        exact(&self.definition.path, request.path())
    }

    fn score_path_regex(&self, request: &MatchRequest) -> i64 {
        match &self.path_regex {
            Some(re) if re.is_match(request.path()) => 1,
            Some(_) => MISMATCH,
            None => 0,
        }
    }

    /// A body pattern that does not match contributes 0, never [`MISMATCH`].
    fn score_body_string_regex(&self, request: &MatchRequest) -> i64 {
        match &self.body_string_regex {
            Some(re) if re.is_match(request.body()) => 1,
            _ => 0,
        }
    }
}

fn exact(declared: &str, actual: &str) -> i64 {
    match (declared.is_empty(), declared == actual) {
        (true, _) => 0,
        (false, true) => 1,
        (false, false) => MISMATCH,
    }
}

fn score_params(declared: &BTreeMap<String, Vec<String>>, request: &MatchRequest) -> i64 {
    score_multimap(declared, |name| {
        request
            .query_values(name)
            .map(|values| values.iter().map(String::as_str).collect())
    })
}

fn score_headers(declared: &BTreeMap<String, Vec<String>>, request: &MatchRequest) -> i64 {
    score_multimap(declared, |name| request.header_values(name))
}

/// Shared algorithm for params and headers. Any missing key or missing
/// required value makes the whole sub-score [`MISMATCH`].
fn score_multimap<'r>(
    declared: &BTreeMap<String, Vec<String>>,
    lookup: impl Fn(&str) -> Option<Vec<&'r str>>,
) -> i64 {
    let mut score = 0;
    for (name, want) in declared {
        let Some(got) = lookup(name) else {
            return MISMATCH;
        };
        match score_value_set(want, got) {
            Some(s) => score += s,
            None => return MISMATCH,
        }
    }
    score
}

/// Check that every value in `want` (sorted) occurs in `got`, counting
/// duplicates. Returns one point per matched value, one point for a
/// presence-only check, or `None` when a value is missing.
pub(crate) fn score_value_set(want: &[String], mut got: Vec<&str>) -> Option<i64> {
    if want.is_empty() {
        return Some(1);
    }
    if got.len() < want.len() {
        return None;
    }
    got.sort_unstable();

    let (mut i, mut j, mut score) = (0, 0, 0);
    while i < want.len() && j < got.len() {
        match want[i].as_str().cmp(got[j]) {
            Ordering::Equal => {
                i += 1;
                j += 1;
                score += 1;
            }
            Ordering::Greater => j += 1,
            Ordering::Less => return None,
        }
    }
    if i < want.len() {
        return None;
    }
    Some(score)
}
