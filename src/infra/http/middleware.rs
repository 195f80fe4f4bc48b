use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tower_http::request_id::RequestId;
use tracing::{Instrument, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    fn from_request(request: &Request<Body>) -> Self {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .and_then(|id| id.header_value().to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self { request_id }
    }
}

/// Expose the request id to handlers and run the rest of the stack inside a
/// `request` span carrying it.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::from_request(&request);
    let span = info_span!(
        "request",
        request_id = %ctx.request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    request.extensions_mut().insert(ctx);

    next.run(request).instrument(span).await
}

/// Log every 4xx/5xx together with the [`ErrorReport`] the handler attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let elapsed_ms = start.elapsed().as_millis() as u64;
    let (source, chain) = response
        .extensions_mut()
        .remove::<ErrorReport>()
        .map(|report| (report.source, report.messages))
        .unwrap_or(("unknown", Vec::new()));
    let detail = chain.first().map(String::as_str).unwrap_or("no diagnostic available");

    if status.is_server_error() {
        error!(
            target = "recipebox::http::response",
            status = status.as_u16(),
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            elapsed_ms,
            source,
            detail,
            chain = ?chain,
            "request failed",
        );
    } else {
        warn!(
            target = "recipebox::http::response",
            status = status.as_u16(),
            request_id = %request_id,
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            source,
            detail,
            "client request error",
        );
    }

    response
}
