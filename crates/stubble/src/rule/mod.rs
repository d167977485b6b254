//! Rules: what a request must look like, and what to answer.
//!
//! This module provides:
//! - `RuleDefinition`: the external JSON representation of a rule
//! - `Rule`: an initialized rule with compiled patterns
//! - `Rule::score`: the specificity score of a rule for a request
//! - `MatchRequest`: the request fields rules are scored against
//!
//! ## Module Structure
//!
//! - `types`: wire types and errors
//! - `core`: rule construction, equality and the no-match rule
//! - `request`: the request view
//! - `scoring`: per-criterion scoring
//! - `json_match`: JSON template comparison with wildcards

mod core;
mod json_match;
mod request;
mod scoring;
mod types;


pub use self::core::{canonical_header_name, Rule, NO_MATCH_BODY, NO_MATCH_NAME};
pub use json_match::{json_equals, matches_template, score_body_json, JSON_WILDCARD};
pub use request::{parse_query, MatchRequest};
pub use scoring::MISMATCH;
pub use types::{ResponseTemplate, RuleDefinition, RuleError, RESPONSE_FIELDS, RULE_FIELDS};
