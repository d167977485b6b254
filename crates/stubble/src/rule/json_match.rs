//! Structural comparison of a JSON body against a JSON template.
//!
//! A template position holding [`JSON_WILDCARD`] matches any value of any
//! type. The token is plain data; it has nothing to do with the regex
//! criteria of a rule.

use serde_json::Value;

/// The template token that matches any JSON value.
pub const JSON_WILDCARD: &str = ".*";

fn is_wildcard(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == JSON_WILDCARD)
}

/// Score the JSON-template criterion: 1 on a match, 0 otherwise.
///
/// A body that is not valid JSON contributes 0; it is never an error.
pub fn score_body_json(template: Option<&Value>, body: &[u8]) -> i64 {
    let Some(template) = template else {
        return 0;
    };
    let Ok(actual) = serde_json::from_slice::<Value>(body) else {
        return 0;
    };
    if json_equals(template, &actual) {
        return 1;
    }
    match (template, &actual) {
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_))
            if matches_template(template, &actual) =>
        {
            1
        }
        _ => 0,
    }
}

/// Recursively compare `actual` against `template`, honoring wildcards.
///
/// Arrays compare position by position and must have equal length. Objects
/// must have the same number of keys and every template key must be present
/// in `actual`, which makes the key sets equal.
pub fn matches_template(template: &Value, actual: &Value) -> bool {
    if is_wildcard(template) {
        return true;
    }
    match (template, actual) {
        (Value::Array(want), Value::Array(got)) => {
            want.len() == got.len()
                && want
                    .iter()
                    .zip(got.iter())
                    .all(|(w, g)| matches_template(w, g))
        }
        (Value::Object(want), Value::Object(got)) => {
            want.len() == got.len()
                && want
                    .iter()
                    .all(|(key, w)| got.get(key).is_some_and(|g| matches_template(w, g)))
        }
        (Value::Array(_), _) | (Value::Object(_), _) => false,
        _ => json_equals(template, actual),
    }
}

/// JSON deep equality where numbers compare by value (`1 == 1.0`).
pub fn json_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x == y
                || match (x.as_f64(), y.as_f64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(x, y)| json_equals(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, x)| y.get(key).is_some_and(|y| json_equals(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_wildcard_absorbs_mismatched_type() {
        let template = json!({"foo": 123, "bar": "bla", "moo": ".*", "vla": [2, 4]});
        let body = br#"{"bar": "bla", "foo": 123, "moo": [1,2,3], "vla": [2,4]}"#;
        assert_eq!(score_body_json(Some(&template), body), 1);
    }

    #[test]
    fn test_exact_equality_scores() {
        let template = json!({"answer": 42});
        assert_eq!(score_body_json(Some(&template), br#"{"answer": 42}"#), 1);
        assert_eq!(score_body_json(Some(&template), br#"{"answer": 42.0}"#), 1);
        assert_eq!(score_body_json(Some(&template), br#"{"answer": 43}"#), 0);
    }

    #[test]
    fn test_scalar_template() {
        let template = json!("hello");
        assert_eq!(score_body_json(Some(&template), br#""hello""#), 1);
        // Only containers go through the wildcard walk.
        let wildcard = json!(JSON_WILDCARD);
        assert_eq!(score_body_json(Some(&wildcard), br#""anything""#), 0);
    }

    #[test]
    fn test_invalid_or_missing_body() {
        let template = json!({"a": 1});
        assert_eq!(score_body_json(Some(&template), b"not json"), 0);
        assert_eq!(score_body_json(Some(&template), b""), 0);
        assert_eq!(score_body_json(None, br#"{"a": 1}"#), 0);
    }

    #[test]
    fn test_array_length_and_order() {
        let template = json!([1, ".*", 3]);
        assert!(matches_template(&template, &json!([1, {"x": true}, 3])));
        assert!(!matches_template(&template, &json!([1, 2])));
        assert!(!matches_template(&template, &json!([3, 2, 1])));
    }

    #[test]
    fn test_object_key_sets_must_agree() {
        let template = json!({"a": ".*", "b": 1});
        assert!(matches_template(&template, &json!({"a": null, "b": 1})));
        // Same key count, but the wildcard key is missing.
        assert!(!matches_template(&template, &json!({"c": 5, "b": 1})));
        // Extra key.
        assert!(!matches_template(&template, &json!({"a": 0, "b": 1, "c": 2})));

        let null_template = json!({"a": null});
        assert!(!matches_template(&null_template, &json!({"b": null})));
    }

    #[test]
    fn test_nested_structures() {
        let template = json!({"user": {"id": ".*", "roles": ["admin", ".*"]}});
        assert!(matches_template(
            &template,
            &json!({"user": {"id": 17, "roles": ["admin", "dev"]}})
        ));
        assert!(!matches_template(
            &template,
            &json!({"user": {"id": 17, "roles": ["dev", "admin"]}})
        ));
        assert!(!matches_template(&template, &json!({"user": []})));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_wildcard_matches_any_value(actual in arb_json()) {
            let template = json!({"fixed": 1, "free": JSON_WILDCARD});
            let body = json!({"fixed": 1, "free": actual});
            prop_assert!(matches_template(&template, &body));

            let template = json!([JSON_WILDCARD, "tail"]);
            let body = json!([body, "tail"]);
            prop_assert!(matches_template(&template, &body));
        }

        #[test]
        fn prop_value_matches_itself(value in arb_json()) {
            prop_assert!(json_equals(&value, &value));
            let bytes = serde_json::to_vec(&value).unwrap();
            prop_assert_eq!(score_body_json(Some(&value), &bytes), 1);
        }
    }
}
