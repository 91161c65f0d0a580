//! Response Cache Middleware
//!
//! Caches successful `GET` responses of the user and file resources
//! and drops a resource's cached responses after any successful write to it.
//! Cache failures are logged and never fail the request.

use std::sync::Arc;

use axum::{
    body::{self, Body},
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::infrastructure::cache::{keys, CachedResponse, ResponseStore};
use crate::startup::AppState;

const X_CACHE: &str = "x-cache";

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let mut response = (status, self.body).into_response();
        if let Some(value) = self
            .content_type
            .and_then(|ct| HeaderValue::from_str(&ct).ok())
        {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        response
    }
}

/// Resource a path belongs to, if its responses are cacheable.
fn resource_namespace(path: &str) -> Option<&'static str> {
    let rest = path.strip_prefix("/api/")?;
    let resource = rest.split('/').next()?;
    match resource {
        "users" => Some("users"),
        "files" => Some("files"),
        _ => None,
    }
}

/// Resource whose cached reads a non-GET request to `path` makes stale.
/// Searches are POSTs that change nothing.
fn written_namespace(path: &str) -> Option<&'static str> {
    if path.trim_end_matches('/').ends_with("/search") {
        return None;
    }
    match path {
        "/api/auth/register" => Some("users"),
        _ => resource_namespace(path),
    }
}

/// `GET /api/files/{id}` counts views, so serving it from cache would skip the count.
fn is_cacheable_read(namespace: &str, path: &str) -> bool {
    if namespace != "files" {
        return true;
    }
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();
    segments.len() <= 3
}

fn with_cache_status(mut response: Response, status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static(status));
    response
}

pub async fn response_cache(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let cache = match &state.cache {
        Some(cache) if state.settings.cache.enabled => cache.clone(),
        _ => return next.run(request).await,
    };

    let path = request.uri().path().to_string();

    if request.method() != Method::GET {
        let response = next.run(request).await;
        if let Some(namespace) = written_namespace(&path) {
            if response.status().is_success() {
                invalidate(&cache, namespace).await;
            }
        }
        return response;
    }

    let Some(namespace) = resource_namespace(&path) else {
        return next.run(request).await;
    };

    if !is_cacheable_read(namespace, &path) {
        // A counted view changes the cached listings
        let response = next.run(request).await;
        if response.status().is_success() {
            invalidate(&cache, namespace).await;
        }
        return response;
    }

    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or(path);
    let key = keys::response(namespace, &path_and_query);

    match cache.lookup(&key).await {
        Ok(Some(hit)) => return with_cache_status(hit.into_response(), "HIT"),
        Ok(None) => {}
        Err(e) => warn!(key = %key, error = %e, "Response cache read failed"),
    }

    let response = next.run(request).await;
    if !response.status().is_success() {
        return with_cache_status(response, "MISS");
    }

    let (parts, body) = response.into_parts();
    let bytes = match body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Failed to buffer response for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Ok(text) = std::str::from_utf8(&bytes) {
        let entry = CachedResponse {
            status: parts.status.as_u16(),
            content_type: parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from),
            body: text.to_string(),
        };
        let ttl = state.settings.cache.ttl_seconds;
        if let Err(e) = cache.save(namespace, &key, &entry, ttl).await {
            warn!(key = %key, error = %e, "Response cache write failed");
        }
    }

    with_cache_status(Response::from_parts(parts, Body::from(bytes)), "MISS")
}

async fn invalidate(cache: &Arc<dyn ResponseStore>, namespace: &str) {
    if let Err(e) = cache.invalidate(namespace).await {
        warn!(namespace, error = %e, "Response cache invalidation failed");
    }
}
