//! Rate Limiting Middleware
//!
//! In-process fixed-window rate limiting keyed by client address. Counters
//! live in a `DashMap` and are not shared between instances.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;

use crate::config::RateLimitSettings;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Counters are pruned once the map grows past this many clients.
const PRUNE_THRESHOLD: usize = 10_000;

/// Rate limit status for one request.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum requests allowed in the current window
    pub limit: u32,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Unix timestamp when the window resets
    pub reset_at: i64,
    /// Seconds until the window resets
    pub retry_after: u64,
}

#[derive(Debug, Clone, Copy)]
struct WindowCount {
    window: i64,
    count: u32,
}

/// Fixed-window counter per client identifier.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window_seconds: i64,
    counters: DashMap<String, WindowCount>,
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            limit: settings.requests_per_window,
            window_seconds: settings.window_seconds.max(1) as i64,
            counters: DashMap::new(),
        }
    }

    /// Count a request. `Err` carries the status when the limit is exceeded.
    pub fn check(&self, identifier: &str) -> Result<RateLimitInfo, RateLimitInfo> {
        self.check_at(identifier, Utc::now().timestamp())
    }

    fn check_at(&self, identifier: &str, now: i64) -> Result<RateLimitInfo, RateLimitInfo> {
        let window = now.div_euclid(self.window_seconds);
        let reset_at = (window + 1) * self.window_seconds;

        if self.counters.len() > PRUNE_THRESHOLD {
            self.counters.retain(|_, c| c.window == window);
        }

        let count = {
            let mut entry = self
                .counters
                .entry(identifier.to_string())
                .or_insert(WindowCount { window, count: 0 });
            if entry.window != window {
                *entry = WindowCount { window, count: 0 };
            }
            entry.count = entry.count.saturating_add(1);
            entry.count
        };

        let info = RateLimitInfo {
            limit: self.limit,
            remaining: self.limit.saturating_sub(count),
            reset_at,
            retry_after: (reset_at - now).max(0) as u64,
        };

        if count > self.limit {
            Err(info)
        } else {
            Ok(info)
        }
    }
}

/// Identify the client by the first `X-Forwarded-For` address, falling back
/// to the peer address.
fn extract_identifier(request: &Request, client_ip: Option<IpAddr>) -> String {
    // Note: This header can be spoofed if not behind a trusted proxy
    if let Some(forwarded_for) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first_ip) = forwarded_for.split(',').next() {
            let ip = first_ip.trim();
            if ip.parse::<IpAddr>().is_ok() {
                return format!("ip:{}", ip);
            }
        }
    }

    match client_ip {
        Some(ip) => format!("ip:{}", ip),
        None => {
            tracing::warn!("Could not determine client identifier for rate limiting");
            "ip:unknown".to_string()
        }
    }
}

/// Rate limiting middleware for API routes.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    // Absent when the router is served without connect info (tests).
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    let identifier = extract_identifier(&request, client_ip);

    match state.rate_limiter.check(&identifier) {
        Ok(info) => {
            let mut response = next.run(request).await;
            add_rate_limit_headers(response.headers_mut(), &info);
            response
        }
        Err(info) => {
            tracing::warn!(identifier = %identifier, "Rate limit exceeded");
            let mut response = AppError::RateLimited.into_response();
            add_rate_limit_headers(response.headers_mut(), &info);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, header::HeaderValue::from(info.retry_after));
            response
        }
    }
}

fn add_rate_limit_headers(headers: &mut header::HeaderMap, info: &RateLimitInfo) {
    headers.insert("X-RateLimit-Limit", header::HeaderValue::from(info.limit));
    headers.insert(
        "X-RateLimit-Remaining",
        header::HeaderValue::from(info.remaining),
    );
    headers.insert("X-RateLimit-Reset", header::HeaderValue::from(info.reset_at));
}
