//! Middleware for modifying requests and responses.

use crate::infra::error::{ApiError, InternalError};
use axum::{
    body::{Body, HttpBody},
    middleware::Next,
    response::IntoResponse,
};
use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderMap, Request, Response};
use http_body_util::BodyExt;
use tower_http::trace::MakeSpan;

static X_REQUEST_ID: &str = "x-request-id";

#[derive(Clone)]
pub(crate) struct MakeRequestIdSpan;

impl<B> MakeSpan<B> for MakeRequestIdSpan {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|id| id.to_str().ok())
            .unwrap_or("unknown");
        tracing::info_span!(
            "request",
            request_id = request_id,
            method = %request.method(),
            uri = %request.uri(),
            version = ?request.version(),
        )
    }
}

/// The maximum size of a body to log.
const MAX_BODY_SIZE: u64 = 8192;

/// Whether a body is small and textual enough to be worth logging.
/// Image uploads and multipart bodies pass through untouched.
fn is_loggable(headers: &HeaderMap, size: Option<u64>) -> bool {
    let textual = headers
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map_or(false, |ct| {
            ct.starts_with("application/json") || ct.starts_with("text/")
        });
    textual && size.map_or(false, |n| n <= MAX_BODY_SIZE)
}

/// Logs small request and response bodies at trace level.
pub(crate) async fn log_request_response(
    req: Request<Body>,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, body) = req.into_parts();
    let body = if is_loggable(&parts.headers, body.size_hint().upper()) {
        Body::from(buffer_and_print("Request", body).await?)
    } else {
        body
    };
    let req = Request::from_parts(parts, body);

    let res = next.run(req).await;

    let (parts, body) = res.into_parts();
    let body = if is_loggable(&parts.headers, body.size_hint().upper()) {
        Body::from(buffer_and_print("Response", body).await?)
    } else {
        body
    };
    Ok(Response::from_parts(parts, body))
}

/// Read the entire body stream and store it in memory.
async fn buffer_and_print(direction: &str, body: Body) -> Result<Bytes, ApiError> {
    let body = body
        .collect()
        .await
        .map_err(|e| InternalError::Other(format!("failed to read {direction} body: {e}")))?
        .to_bytes();

    if let Ok(body) = std::str::from_utf8(&body) {
        tracing::trace!("{} body = {:?}", direction, body);
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn small_json_is_logged() {
        assert!(is_loggable(&headers("application/json"), Some(100)));
    }

    #[test]
    fn uploads_are_not_logged() {
        assert!(!is_loggable(
            &headers("multipart/form-data; boundary=x"),
            Some(100)
        ));
        assert!(!is_loggable(&headers("image/jpeg"), Some(100)));
    }

    #[test]
    fn large_or_unsized_bodies_are_not_logged() {
        assert!(!is_loggable(&headers("application/json"), Some(MAX_BODY_SIZE + 1)));
        assert!(!is_loggable(&headers("application/json"), None));
        assert!(!is_loggable(&HeaderMap::new(), Some(10)));
    }
}
