//! HTTP transport for stubble.
//!
//! This module provides:
//! - `StubServer`: the accept loop serving each connection over HTTP/1.1
//! - `handle_request`: the per-request entry point
//! - The admin surface under `/stubble/`
//!
//! ## Module Structure
//!
//! - `listener`: bind, accept and graceful stop
//! - `handler`: admin-or-stub dispatch and the stub path
//! - `admin`: reserved routes
//! - `response`: response building helpers

mod admin;
mod handler;
mod listener;
mod response;

pub use admin::{AdminRoute, ADMIN_PREFIX};
pub use handler::handle_request;
pub use listener::StubServer;
pub use response::stub_response;

use crate::capture::RequestLog;
use crate::selector::Selector;

/// State shared by every connection.
pub struct AppState {
    pub selector: Selector,
    pub request_log: RequestLog,
}

impl AppState {
    pub fn new(selector: Selector, request_log: RequestLog) -> Self {
        Self {
            selector,
            request_log,
        }
    }
}
