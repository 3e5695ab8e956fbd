//! # Per-Client Rate Limiting
//!
//! Fixed-window request counter keyed by client. One limiter instance guards
//! each route group (upload, load) so the two budgets are independent.
//! In-memory only; counters reset on restart.
//!
//! ## Client Key
//!
//! The key is the peer IP from `ConnectInfo<SocketAddr>`. `X-Forwarded-For`
//! is client-controlled and is only honored when the limiter is told to trust
//! it, which is correct only behind a proxy that overwrites the header.
//!
//! ## Eviction
//!
//! At most once per window, buckets whose window has expired are dropped, so
//! memory is bounded by the number of clients seen within one window.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;

use crate::error::{ErrorBody, ErrorDetail};

/// Rate limiter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
struct BucketState {
    count: u64,
    window_start: Instant,
}

#[derive(Debug)]
struct Buckets {
    entries: HashMap<String, BucketState>,
    last_sweep: Instant,
}

/// Shared rate limiter state. Cloning shares the counters.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    trust_forwarded_for: bool,
    buckets: Arc<Mutex<Buckets>>,
}

impl RateLimiter {
    /// Create a new rate limiter keyed by peer address.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            trust_forwarded_for: false,
            buckets: Arc::new(Mutex::new(Buckets {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    /// Key clients by the first `X-Forwarded-For` hop when present.
    pub fn trusting_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Record a request from `key`; `false` when the key is over budget.
    pub fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_secs);

        if now.duration_since(buckets.last_sweep) >= window {
            buckets
                .entries
                .retain(|_, b| now.duration_since(b.window_start) < window);
            buckets.last_sweep = now;
        }

        let bucket = buckets.entries.entry(key.to_string()).or_insert(BucketState {
            count: 0,
            window_start: now,
        });

        if now.duration_since(bucket.window_start) >= window {
            bucket.count = 0;
            bucket.window_start = now;
        }

        if bucket.count >= self.config.max_requests {
            false
        } else {
            bucket.count += 1;
            true
        }
    }

    /// Number of clients currently holding a bucket.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().entries.len()
    }

    /// Peer IP, the first forwarded hop when trusted, or `"anonymous"`.
    fn client_key(&self, request: &Request) -> String {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(hop) = forwarded {
                return hop.to_string();
            }
        }
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

/// Middleware that rejects over-budget clients with 429.
///
/// Attach with `axum::middleware::from_fn_with_state(limiter, rate_limit_middleware)`.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let key = limiter.client_key(&request);
    if !limiter.check(&key) {
        tracing::warn!(client = %key, path = %request.uri().path(), "rate limit exceeded");
        let body = ErrorBody {
            error: ErrorDetail {
                code: "RATE_LIMITED".to_string(),
                message: "rate limit exceeded".to_string(),
                status_code: StatusCode::TOO_MANY_REQUESTS.as_u16(),
            },
        };
        return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    }

    next.run(request).await
}
