//! Rate limiting middleware.
//!
//! In-memory fixed-window limiting per client IP, applied to the public auth
//! endpoints to slow down credential guessing.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Configuration for rate limiting.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
    /// Burst allowance (extra requests above limit before hard reject).
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window: Duration::from_secs(60),
            burst: 5,
        }
    }
}

/// Rate limiter state tracking requests per IP.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Arc<Mutex<HashMap<IpAddr, RateLimitEntry>>>,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

#[derive(Debug, PartialEq, Eq)]
enum RateLimitResult {
    Allowed { remaining: u32 },
    BurstUsed { remaining: u32 },
    Exceeded { retry_after: Duration },
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check if request should be allowed.
    fn check(&self, ip: IpAddr) -> RateLimitResult {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> RateLimitResult {
        let mut state = self.state.lock();

        let entry = state.entry(ip).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start) >= self.config.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count = entry.count.saturating_add(1);

        let limit = self.config.max_requests.saturating_add(self.config.burst);
        let remaining = limit.saturating_sub(entry.count);

        if entry.count > limit {
            let elapsed = now.duration_since(entry.window_start);
            RateLimitResult::Exceeded {
                retry_after: self.config.window.saturating_sub(elapsed),
            }
        } else if entry.count > self.config.max_requests {
            RateLimitResult::BurstUsed { remaining }
        } else {
            RateLimitResult::Allowed { remaining }
        }
    }

    /// Drop entries idle for two windows; run from a background task.
    pub fn cleanup(&self) {
        let mut state = self.state.lock();
        let now = Instant::now();
        let window = self.config.window;

        state.retain(|_, entry| {
            now.duration_since(entry.window_start) < window.saturating_mul(2)
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.state.lock().len()
    }
}

/// Rate limiting middleware function.
///
/// Without connection info (e.g. in-process tests) every request shares one bucket.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limiter.check(ip) {
        RateLimitResult::Allowed { .. } | RateLimitResult::BurstUsed { .. } => {
            next.run(request).await
        }
        RateLimitResult::Exceeded { retry_after } => {
            // Round up so clients never retry inside the window.
            let retry_secs = retry_after
                .as_secs()
                .saturating_add(u64::from(retry_after.subsec_nanos() > 0));
            warn!(
                ip = %ip,
                path = %request.uri().path(),
                retry_after_secs = retry_secs,
                "Rate limit exceeded"
            );

            let body = serde_json::json!({
                "message": "Too many requests. Please slow down.",
            });

            (
                StatusCode::TOO_MANY_REQUESTS,
                [(RETRY_AFTER, retry_secs.to_string())],
                Json(body),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, middleware, routing::post, Router};
    use tower::ServiceExt;

    fn localhost() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    #[test]
    fn test_rate_limit_allows_under_limit() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 10,
            window: Duration::from_secs(60),
            burst: 5,
        });

        for _ in 0..10 {
            assert!(matches!(
                limiter.check(localhost()),
                RateLimitResult::Allowed { .. }
            ));
        }
    }

    #[test]
    fn test_rate_limit_allows_burst() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 5,
            window: Duration::from_secs(60),
            burst: 3,
        });

        for _ in 0..5 {
            assert!(matches!(
                limiter.check(localhost()),
                RateLimitResult::Allowed { .. }
            ));
        }
        for _ in 0..3 {
            assert!(matches!(
                limiter.check(localhost()),
                RateLimitResult::BurstUsed { .. }
            ));
        }
        assert!(matches!(
            limiter.check(localhost()),
            RateLimitResult::Exceeded { .. }
        ));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_secs(10),
            burst: 0,
        });
        let start = Instant::now();

        assert_eq!(
            limiter.check_at(localhost(), start),
            RateLimitResult::Allowed { remaining: 0 }
        );
        assert!(matches!(
            limiter.check_at(localhost(), start + Duration::from_secs(1)),
            RateLimitResult::Exceeded { .. }
        ));
        assert_eq!(
            limiter.check_at(localhost(), start + Duration::from_secs(11)),
            RateLimitResult::Allowed { remaining: 0 }
        );
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_secs(60),
            burst: 0,
        });

        assert!(matches!(
            limiter.check(localhost()),
            RateLimitResult::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check("10.0.0.2".parse().unwrap()),
            RateLimitResult::Allowed { .. }
        ));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_cleanup_keeps_recent_entries() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        limiter.check(localhost());
        limiter.cleanup();
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_extreme_limits_do_not_overflow() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: u32::MAX,
            window: Duration::from_secs(60),
            burst: u32::MAX,
        });
        assert_eq!(
            limiter.check(localhost()),
            RateLimitResult::Allowed {
                remaining: u32::MAX - 1
            }
        );

        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: Duration::MAX,
            burst: 0,
        });
        let start = Instant::now();
        limiter.check_at(localhost(), start);
        assert_eq!(
            limiter.check_at(localhost(), start + Duration::from_secs(5)),
            RateLimitResult::Exceeded {
                retry_after: Duration::MAX - Duration::from_secs(5)
            }
        );
        limiter.cleanup();
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[tokio::test]
    async fn test_middleware_returns_429_with_retry_after() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_secs(60),
            burst: 0,
        });
        let app = Router::new()
            .route("/login", post(|| async { "ok" }))
            .route_layer(middleware::from_fn_with_state(
                limiter,
                rate_limit_middleware,
            ));

        let request = || {
            HttpRequest::builder()
                .method("POST")
                .uri("/login")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(RETRY_AFTER));
    }
}
