use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::WebState;

const ALLOWED_METHODS: &str = "GET,POST,OPTIONS";
const ALLOWED_HEADERS: &str = "content-type";

/// Resolve the `access-control-allow-origin` value for this request, if any.
fn allowed_origin(configured: &str, headers: &HeaderMap) -> Option<HeaderValue> {
    let configured = configured.trim();
    if configured == "*" {
        return Some(HeaderValue::from_static("*"));
    }
    let origin = headers.get(header::ORIGIN)?.to_str().ok()?;
    configured
        .split(',')
        .map(str::trim)
        .any(|allowed| !allowed.is_empty() && allowed == origin)
        .then(|| HeaderValue::from_str(origin).ok())
        .flatten()
}

pub(crate) async fn cors_middleware(
    State(state): State<WebState>,
    req: Request,
    next: Next,
) -> Response {
    let origin = allowed_origin(&state.config.cors_origin, req.headers());

    let mut resp = if *req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    if let Some(value) = origin {
        let headers = resp.headers_mut();
        if value != "*" {
            headers.insert(header::VARY, HeaderValue::from_static("origin"));
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
    }
    resp
}

pub(crate) async fn trace_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();
    let resp = next.run(req).await;
    info!(
        %method,
        path = %path,
        status = resp.status().as_u16(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "request"
    );
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_origin(origin: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_str(origin).unwrap());
        headers
    }

    #[test]
    fn wildcard_allows_any_origin() {
        let value = allowed_origin("*", &HeaderMap::new()).unwrap();
        assert_eq!(value, "*");
    }

    #[test]
    fn listed_origin_is_echoed() {
        let headers = headers_with_origin("http://localhost:5173");
        let value = allowed_origin("http://example.com, http://localhost:5173", &headers).unwrap();
        assert_eq!(value, "http://localhost:5173");
    }

    #[test]
    fn unlisted_origin_gets_no_header() {
        let headers = headers_with_origin("http://evil.test");
        assert!(allowed_origin("http://example.com", &headers).is_none());
        assert!(allowed_origin("http://example.com", &HeaderMap::new()).is_none());
    }
}
