//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use bibstore_common::{config::RateLimitConfig, errors::AppError};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Limiter plus the configured rate, reported back in errors
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<GlobalRateLimiter>,
    requests_per_second: u32,
}

/// Build the limiter; `None` when disabled or configured with a zero rate
pub fn create_rate_limiter(config: &RateLimitConfig) -> Option<RateLimit> {
    if !config.enabled {
        return None;
    }
    let per_second = NonZeroU32::new(config.requests_per_second)?;
    let burst = NonZeroU32::new(config.burst).unwrap_or(per_second);
    let quota = Quota::per_second(per_second).allow_burst(burst);

    Some(RateLimit {
        limiter: Arc::new(RateLimiter::direct(quota)),
        requests_per_second: config.requests_per_second,
    })
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limit): State<RateLimit>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match limit.limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!("Rate limit exceeded");
            Err(AppError::RateLimited {
                limit: limit.requests_per_second,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(requests_per_second: u32, burst: u32, enabled: bool) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second,
            burst,
            enabled,
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limit = create_rate_limiter(&config(100, 200, true)).unwrap();
        assert!(limit.limiter.check().is_ok());
    }

    #[test]
    fn test_disabled_or_zero_rate_has_no_limiter() {
        assert!(create_rate_limiter(&config(100, 200, false)).is_none());
        assert!(create_rate_limiter(&config(0, 200, true)).is_none());
    }

    #[test]
    fn test_burst_is_enforced() {
        let limit = create_rate_limiter(&config(1, 2, true)).unwrap();
        assert!(limit.limiter.check().is_ok());
        assert!(limit.limiter.check().is_ok());
        assert!(limit.limiter.check().is_err());
    }
}
