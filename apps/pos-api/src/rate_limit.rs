//! Per-IP fixed-window rate limiting for `/api` routes.
//!
//! ```text
//! request ──► client IP (X-Forwarded-For first entry, else peer addr)
//!                │
//!                ▼
//!        DashMap<ip, {count, window_start}>
//!                │
//!       window expired? ──yes──► count = 0, window_start = now
//!                │
//!        count += 1; count > limit? ──yes──► 429 envelope
//!                │no
//!                ▼
//!             handler
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Entries idle this long are dropped by [`RateLimiter::cleanup`].
pub const STALE_AFTER: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    windows: Arc<DashMap<String, Window>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        RateLimiter {
            windows: Arc::new(DashMap::new()),
            max_requests,
            window,
        }
    }

    /// `max_requests` per minute.
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited.
    pub fn check(&self, ip: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.windows.entry(ip.to_owned()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        entry.count = entry.count.saturating_add(1);
        entry.count <= self.max_requests
    }

    /// Remove windows older than [`STALE_AFTER`].
    pub fn cleanup(&self) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, window| now.duration_since(window.started) < STALE_AFTER);
        debug!(removed = before - self.windows.len(), "Rate limiter cleanup");
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// Extract client IP: X-Forwarded-For header first (reverse proxy), then peer address.
fn client_ip(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_owned();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Middleware applied to the `/api` router.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ip = client_ip(&request);

    if !state.rate_limiter.check(&ip) {
        warn!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }

    next.run(request).await
}

// =============================================================================
// Unit Tests
// =============================================================================
