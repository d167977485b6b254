//! Per-request dispatch: admin routes or a stub response.

use super::admin::{route_admin, ADMIN_PREFIX};
use super::response::{internal_error, stub_response};
use super::AppState;
use crate::capture::CapturedRequest;
use crate::metrics::{record_request, Outcome};
use crate::rule::{MatchRequest, Rule};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::{Request, Response};
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{error, info};

/// Answer one request.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Display,
{
    if let Some(rest) = req.uri().path().strip_prefix(ADMIN_PREFIX) {
        let rest = rest.to_string();
        return Ok(route_admin(req, &rest, &state).await);
    }
    Ok(handle_stub(req, &state).await)
}

async fn handle_stub<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Display,
{
    let (parts, body) = req.into_parts();
    let method = parts.method.as_str().to_string();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!("error reading request body: {}", e);
            record_request(&method, Outcome::Error);
            return internal_error(e);
        }
    };

    let request = MatchRequest::from_parts(&parts, body);
    state
        .request_log
        .push(CapturedRequest::from_request(&request));

    let rule = match state.selector.select_response(&request).await {
        Ok(rule) => rule,
        Err(e) => {
            error!("error fetching response: {}", e);
            record_request(&method, Outcome::Error);
            return internal_error(e);
        }
    };

    let outcome = if &rule == Rule::no_match() {
        Outcome::Fallback
    } else {
        Outcome::Matched
    };
    record_request(&method, outcome);

    let response = stub_response(rule.response());
    let body_len = response.body().size_hint().exact().unwrap_or(0);
    info!(
        method = %parts.method,
        uri = %parts.uri,
        body = %String::from_utf8_lossy(request.body()),
        "({}|{}|{})",
        response.status().as_u16(),
        rule.name(),
        body_len
    );
    response
}
