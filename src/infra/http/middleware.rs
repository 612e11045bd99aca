use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Method, Request, StatusCode, Uri, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Tag the request with a fresh id and echo it back to the client.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// How a finished response is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Served,
    /// Page normalisation and post-write redirects.
    Redirected,
    /// Malformed or unknown ids and unmatched routes.
    NotFound,
    Rejected,
    Failed,
}

impl Outcome {
    fn classify(status: StatusCode) -> Self {
        if status == StatusCode::NOT_FOUND {
            Outcome::NotFound
        } else if status.is_server_error() {
            Outcome::Failed
        } else if status.is_client_error() {
            Outcome::Rejected
        } else if status.is_redirection() {
            Outcome::Redirected
        } else {
            Outcome::Served
        }
    }
}

struct RequestLine {
    method: Method,
    uri: Uri,
    request_id: String,
    started: Instant,
}

/// The single place request outcomes are logged. Only failures carry the
/// error chain.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let line = RequestLine {
        method: request.method().clone(),
        uri: request.uri().clone(),
        request_id: request
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.request_id.clone())
            .unwrap_or_default(),
        started: Instant::now(),
    };

    let mut response = next.run(request).await;
    let status = response.status();
    let report = response.extensions_mut().remove::<ErrorReport>();

    match Outcome::classify(status) {
        Outcome::Served => {}
        Outcome::Redirected => debug!(
            target = "bulletin::http::response",
            status = status.as_u16(),
            path = %line.uri.path(),
            location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .unwrap_or(""),
            request_id = %line.request_id,
            "redirected",
        ),
        Outcome::NotFound => debug!(
            target = "bulletin::http::response",
            method = %line.method,
            path = %line.uri.path(),
            request_id = %line.request_id,
            "not found",
        ),
        Outcome::Rejected => {
            let (source, detail) = summarize(report.as_ref());
            warn!(
                target = "bulletin::http::response",
                status = status.as_u16(),
                method = %line.method,
                path = %line.uri.path(),
                source = source,
                detail = %detail,
                request_id = %line.request_id,
                "request rejected",
            );
        }
        Outcome::Failed => {
            let (source, detail) = summarize(report.as_ref());
            let chain = report.map(|report| report.messages).unwrap_or_default();
            error!(
                target = "bulletin::http::response",
                status = status.as_u16(),
                method = %line.method,
                path = %line.uri.path(),
                query = line.uri.query().unwrap_or(""),
                elapsed_ms = line.started.elapsed().as_millis() as u64,
                source = source,
                detail = %detail,
                chain = ?chain,
                request_id = %line.request_id,
                "request failed",
            );
        }
    }

    response
}

fn summarize(report: Option<&ErrorReport>) -> (&'static str, String) {
    match report {
        Some(report) => (
            report.source,
            report
                .messages
                .first()
                .cloned()
                .unwrap_or_else(|| "no diagnostic available".to_string()),
        ),
        None => ("unknown", "no diagnostic available".to_string()),
    }
}
