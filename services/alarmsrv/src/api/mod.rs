//! HTTP controller layer
//!
//! Reads are cache-or-fetch; writes validate, build a preview, enqueue the
//! command, proactively invalidate and answer 202 with the preview tagged
//! `provisional`. Validation failures are the only write errors callers
//! see synchronously.

pub mod alarm_types;
pub mod alarms;
pub mod auth;
pub mod models;
pub mod routes;

pub use routes::router;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::AppState;

/// Serve a JSON payload string as a response
fn json_body(payload: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], payload).into_response()
}

/// Cache-or-fetch for read endpoints. A cache outage degrades to a plain
/// store read (fail-open); a failed put is logged and ignored.
async fn remember<F, Fut>(
    state: &AppState,
    key: &str,
    build: F,
) -> Result<Response, crate::error::ApiError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<String, crate::error::ApiError>>,
{
    match state.cache.get(key).await {
        Ok(Some(cached)) => return Ok(json_body(cached)),
        Ok(None) => {}
        Err(e) => warn!("Cache read failed for {}, falling back to store: {}", key, e),
    }

    let payload = build().await?;

    if let Err(e) = state
        .cache
        .put(key, &payload, state.config.cache.ttl_secs)
        .await
    {
        warn!("Cache write failed for {}: {}", key, e);
    }

    Ok(json_body(payload))
}
