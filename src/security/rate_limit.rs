//! Per-client token-bucket rate limiting for the chat relay.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::http::response::ApiError;
use crate::observability::metrics;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared limiter state: one bucket per client IP.
pub struct RateLimiterState {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    rps: f64,
    burst: f64,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            rps: config.requests_per_second,
            burst: f64::from(config.burst_size),
        }
    }

    /// Take one token for `client`. False means the request must be refused.
    pub fn check(&self, client: IpAddr) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let bucket = buckets
            .entry(client)
            .or_insert_with(|| TokenBucket::new(self.burst, now));
        bucket.try_acquire(self.burst, self.rps, now)
    }

    /// Drop buckets untouched for `idle`; a full bucket carries no state.
    pub fn prune(&self, idle: Duration) {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        buckets.retain(|_, b| b.last_update.elapsed() < idle);
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().expect("rate limiter mutex poisoned").len()
    }
}

/// Middleware for per-IP rate limiting.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = addr.ip();
    if state.check(client) {
        next.run(request).await
    } else {
        let route = if request.uri().path().ends_with("/registration") {
            "registration"
        } else {
            "chat"
        };
        tracing::warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");
        metrics::record_rate_limited(route);
        ApiError::TooManyRequests(
            "Too many requests. Please wait a few seconds before trying again.".to_string(),
        )
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rps: f64, burst: u32) -> RateLimiterState {
        RateLimiterState::new(&RateLimitConfig {
            enabled: true,
            requests_per_second: rps,
            burst_size: burst,
        })
    }

    #[test]
    fn burst_then_refuse_then_refill() {
        let state = limiter(2.0, 3);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let start = Instant::now();

        assert!(state.check_at(ip, start));
        assert!(state.check_at(ip, start));
        assert!(state.check_at(ip, start));
        assert!(!state.check_at(ip, start));

        // Two tokens per second: half a second buys one more request.
        assert!(state.check_at(ip, start + Duration::from_millis(500)));
        assert!(!state.check_at(ip, start + Duration::from_millis(500)));
    }

    #[test]
    fn clients_are_independent() {
        let state = limiter(1.0, 1);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        let now = Instant::now();

        assert!(state.check_at(a, now));
        assert!(!state.check_at(a, now));
        assert!(state.check_at(b, now));
        assert_eq!(state.tracked_clients(), 2);
    }

    #[test]
    fn prune_forgets_idle_clients() {
        let state = limiter(1.0, 1);
        state.check("10.0.0.1".parse().unwrap());
        std::thread::sleep(Duration::from_millis(20));
        state.prune(Duration::from_millis(5));
        assert_eq!(state.tracked_clients(), 0);
    }
}
