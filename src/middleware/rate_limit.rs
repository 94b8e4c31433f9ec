//! Pieces of the per-IP `/api` rate limiter that live outside `main`.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use axum::body::Body;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use tower_governor::GovernorError;

use crate::error::ErrorResponse;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

fn json_response(status: StatusCode, code: &str, message: String) -> http::Response<Body> {
    let body = ErrorResponse {
        error: message,
        code: code.to_string(),
    };
    let body = serde_json::to_string(&body).unwrap_or_default();

    let mut resp = http::Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    resp
}

fn append_headers(resp: &mut http::Response<Body>, headers: Option<HeaderMap>) {
    if let Some(hmap) = headers {
        for (name, value) in hmap.iter() {
            resp.headers_mut().append(name.clone(), value.clone());
        }
    }
}

/// Error handler for the governor layer. Uses the same `{error, code}` body as `AppError`.
pub fn rate_limit_response(error: GovernorError) -> http::Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            let mut resp = json_response(
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Rate limit exceeded".to_string(),
            );
            append_headers(&mut resp, headers);
            // wait_time is in seconds
            resp.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(wait_time));
            resp
        }
        GovernorError::UnableToExtractKey => json_response(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST",
            "Unable to determine client IP for rate limiting".to_string(),
        ),
        GovernorError::Other { code, msg, headers } => {
            let status =
                StatusCode::from_u16(code.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let mut resp = json_response(
                status,
                "RATE_LIMIT_ERROR",
                msg.unwrap_or_else(|| "Rate limiting error".to_string()),
            );
            append_headers(&mut resp, headers);
            resp
        }
    }
}

/// Periodically prune limiter state on a std thread. `sweep` prunes and
/// returns the remaining number of tracked keys.
///
/// The thread polls `shutdown` once a second so it exits promptly.
pub fn spawn_cleanup<F>(name: &'static str, shutdown: Arc<AtomicBool>, mut sweep: F) -> JoinHandle<()>
where
    F: FnMut() -> usize + Send + 'static,
{
    std::thread::spawn(move || {
        let tick = Duration::from_secs(1);
        loop {
            for _ in 0..CLEANUP_INTERVAL.as_secs() {
                if shutdown.load(Ordering::SeqCst) {
                    tracing::info!("{} rate limiter cleanup thread exiting", name);
                    return;
                }
                std::thread::sleep(tick);
            }
            let remaining = sweep();
            tracing::debug!("{} rate limiter size: {}", name, remaining);
        }
    })
}
