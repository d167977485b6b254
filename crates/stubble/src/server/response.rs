//! Response building helpers.

use crate::rule::ResponseTemplate;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

/// Build a response with an optional content type.
pub fn build_response(
    status: StatusCode,
    content_type: Option<&'static str>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

/// Pretty-printed JSON body.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    build_response(status, Some("application/json"), json)
}

/// Admin error in the `{"errors": [{"code", "message"}]}` shape.
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &json!({"errors": [{"code": status.as_str(), "message": message}]}),
    )
}

/// Plain-text 500 for failures on the stub path.
pub fn internal_error(message: impl std::fmt::Display) -> Response<Full<Bytes>> {
    build_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        None,
        format!("error: {message}"),
    )
}

/// Render the response of a winning rule.
///
/// Every header value is appended. Header names or values that HTTP cannot
/// carry are skipped.
pub fn stub_response(template: &ResponseTemplate) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(template.status_code).unwrap_or_else(|_| {
        warn!("Invalid status code {}, using 500", template.status_code);
        StatusCode::INTERNAL_SERVER_ERROR
    });
    let mut response = build_response(status, None, template.render_body());

    let headers = response.headers_mut();
    for (name, values) in &template.headers {
        let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
            warn!("Skipping invalid response header name: {}", name);
            continue;
        };
        for value in values {
            match HeaderValue::from_str(value) {
                Ok(v) => {
                    headers.append(header_name.clone(), v);
                }
                Err(_) => warn!("Skipping invalid value for response header {}", name),
            }
        }
    }
    if template.is_json_body() && !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::collections::BTreeMap;

    async fn body_bytes(resp: Response<Full<Bytes>>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_error_response_format() {
        let resp = error_response(StatusCode::BAD_REQUEST, "Test error");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.headers().get("Content-Type").unwrap(),
            "application/json"
        );
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(
            body,
            json!({"errors": [{"code": "400", "message": "Test error"}]})
        );
    }

    #[tokio::test]
    async fn test_internal_error_body() {
        let resp = internal_error("storage unavailable: down");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_bytes(resp).await,
            Bytes::from("error: storage unavailable: down")
        );
    }

    #[tokio::test]
    async fn test_stub_response_string_body() {
        let template = ResponseTemplate {
            status_code: 418,
            body_string: "short and stout".to_string(),
            headers: BTreeMap::from([(
                "X-Tea".to_string(),
                vec!["earl grey".to_string(), "green".to_string()],
            )]),
            ..Default::default()
        };
        let resp = stub_response(&template);
        assert_eq!(resp.status().as_u16(), 418);
        let values: Vec<_> = resp.headers().get_all("x-tea").iter().collect();
        assert_eq!(values, vec!["earl grey", "green"]);
        assert!(resp.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(body_bytes(resp).await, Bytes::from("short and stout"));
    }

    #[tokio::test]
    async fn test_stub_response_json_body() {
        let template = ResponseTemplate {
            body_json: Some(json!({"foo": "bar"})),
            ..Default::default()
        };
        let resp = stub_response(&template);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(body, json!({"foo": "bar"}));
    }

    #[test]
    fn test_stub_response_keeps_rule_content_type() {
        let template = ResponseTemplate {
            body_json: Some(json!([1, 2])),
            headers: BTreeMap::from([(
                "Content-Type".to_string(),
                vec!["application/vnd.api+json".to_string()],
            )]),
            ..Default::default()
        };
        let resp = stub_response(&template);
        let values: Vec<_> = resp.headers().get_all(CONTENT_TYPE).iter().collect();
        assert_eq!(values, vec!["application/vnd.api+json"]);
    }

    #[tokio::test]
    async fn test_stub_response_empty_body() {
        let resp = stub_response(&ResponseTemplate {
            status_code: 204,
            ..Default::default()
        });
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(body_bytes(resp).await.is_empty());
    }

    #[test]
    fn test_stub_response_skips_invalid_headers() {
        let template = ResponseTemplate {
            headers: BTreeMap::from([
                ("Bad Name".to_string(), vec!["x".to_string()]),
                ("X-Ok".to_string(), vec!["line\nbreak".to_string(), "fine".to_string()]),
            ]),
            ..Default::default()
        };
        let resp = stub_response(&template);
        assert!(resp.headers().get("bad name").is_none());
        let values: Vec<_> = resp.headers().get_all("x-ok").iter().collect();
        assert_eq!(values, vec!["fine"]);
    }
}
