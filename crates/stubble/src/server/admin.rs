//! Routes reserved under the `/stubble/` prefix.

use super::response::{build_response, error_response, json_response};
use super::AppState;
use crate::capture::CapturedRequest;
use crate::metrics::{collect_metrics, record_registration};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Path prefix reserved for the admin surface.
pub const ADMIN_PREFIX: &str = "/stubble/";

/// Parsed admin route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRoute {
    /// GET /stubble/requests
    Requests,
    /// POST /stubble/responses
    Responses,
    /// GET /stubble/health
    Health,
    /// GET /stubble/metrics
    Metrics,
}

impl AdminRoute {
    /// Parse a route from the method and the path after the prefix
    pub fn parse(method: &Method, rest: &str) -> Option<Self> {
        match (method, rest) {
            (&Method::GET, "requests") => Some(AdminRoute::Requests),
            (&Method::POST, "responses") => Some(AdminRoute::Responses),
            (&Method::GET, "health") => Some(AdminRoute::Health),
            (&Method::GET, "metrics") => Some(AdminRoute::Metrics),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestsResponse {
    requests: Vec<CapturedRequest>,
}

/// Handle a request whose path starts with the admin prefix.
pub async fn route_admin<B>(
    req: Request<B>,
    rest: &str,
    state: &AppState,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Display,
{
    let method = req.method().clone();
    debug!("Admin route: {} {}{}", method, ADMIN_PREFIX, rest);

    let response = match AdminRoute::parse(&method, rest) {
        Some(AdminRoute::Requests) => json_response(
            StatusCode::OK,
            &RequestsResponse {
                requests: state.request_log.snapshot(),
            },
        ),
        Some(AdminRoute::Responses) => handle_register(req, state).await,
        Some(AdminRoute::Health) => {
            json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
        }
        Some(AdminRoute::Metrics) => build_response(
            StatusCode::OK,
            Some("text/plain; version=0.0.4"),
            collect_metrics(),
        ),
        None => error_response(StatusCode::NOT_FOUND, "Not Found"),
    };
    info!(
        "(stubble) {} {}{} {}",
        method,
        ADMIN_PREFIX,
        rest,
        response.status().as_u16()
    );
    response
}

async fn handle_register<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Display,
{
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            record_registration("rejected");
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read request body: {e}"),
            );
        }
    };

    match state.selector.register_rule(&body).await {
        Ok(_) => {
            record_registration("created");
            build_response(StatusCode::CREATED, None, Bytes::new())
        }
        Err(e) => {
            let (status, result) = if e.is_client_error() {
                (StatusCode::BAD_REQUEST, "rejected")
            } else {
                (StatusCode::INTERNAL_SERVER_ERROR, "error")
            };
            let message = format!("{:#}", anyhow::Error::from(e));
            warn!("Rule registration {}: {}", result, message);
            record_registration(result);
            error_response(status, &message)
        }
    }
}
