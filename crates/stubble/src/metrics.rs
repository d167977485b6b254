//! Prometheus metrics for stubble.
//!
//! Tracks served stub responses and rule registrations.
use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};
use tracing::warn;

lazy_static! {
    /// Stub requests answered, by outcome
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "stubble_requests_total",
        "Total number of stub requests answered",
        &["method", "outcome"]  // outcome: matched|fallback|error
    )
    .unwrap();

    /// Registration attempts through the admin endpoint
    pub static ref RULE_REGISTRATIONS_TOTAL: CounterVec = register_counter_vec!(
        "stubble_rule_registrations_total",
        "Total number of rule registration attempts",
        &["result"]  // result: created|rejected|error
    )
    .unwrap();
}

/// How a stub request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Matched,
    Fallback,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Matched => "matched",
            Outcome::Fallback => "fallback",
            Outcome::Error => "error",
        }
    }
}

/// Render every registered metric in the Prometheus text format.
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Bounded `method` label: extension methods collapse into `OTHER`.
pub fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "CONNECT" => "CONNECT",
        "OPTIONS" => "OPTIONS",
        "TRACE" => "TRACE",
        "PATCH" => "PATCH",
        _ => "OTHER",
    }
}

/// Helper to record an answered stub request
pub fn record_request(method: &str, outcome: Outcome) {
    REQUESTS_TOTAL
        .with_label_values(&[method_label(method), outcome.as_str()])
        .inc();
}

/// Helper to record a registration attempt
pub fn record_registration(result: &str) {
    RULE_REGISTRATIONS_TOTAL.with_label_values(&[result]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_request() {
        let before = REQUESTS_TOTAL
            .with_label_values(&["PATCH", "fallback"])
            .get();
        record_request("PATCH", Outcome::Fallback);
        let after = REQUESTS_TOTAL
            .with_label_values(&["PATCH", "fallback"])
            .get();
        assert!(after - before >= 1.0);
    }

    #[test]
    fn test_custom_methods_share_one_label() {
        assert_eq!(method_label("GET"), "GET");
        assert_eq!(method_label("PATCH"), "PATCH");
        assert_eq!(method_label("PURGE"), "OTHER");
        assert_eq!(method_label("get"), "OTHER");

        let before = REQUESTS_TOTAL
            .with_label_values(&["OTHER", "matched"])
            .get();
        record_request("X-RANDOM-1", Outcome::Matched);
        record_request("X-RANDOM-2", Outcome::Matched);
        let after = REQUESTS_TOTAL
            .with_label_values(&["OTHER", "matched"])
            .get();
        assert!(after - before >= 2.0);
        assert!(!collect_metrics().contains("X-RANDOM-1"));
    }

    #[test]
    fn test_collect_metrics_text_format() {
        record_registration("created");
        let text = collect_metrics();
        assert!(text.contains("stubble_rule_registrations_total"));
        assert!(text.contains("result=\"created\""));
    }
}
