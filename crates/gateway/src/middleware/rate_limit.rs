//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use cinelog_common::{
    config::RateLimitConfig,
    errors::{AppError, Result},
    metrics,
};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Limiter plus the quota it enforces, for error bodies
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<GlobalRateLimiter>,
    per_second: u32,
}

/// Create a new rate limiter from configuration
pub fn create_rate_limiter(config: &RateLimitConfig) -> Result<RateLimitState> {
    let per_second = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
        AppError::Configuration {
            message: "rate_limit.requests_per_second must be greater than zero".to_string(),
        }
    })?;
    let burst = NonZeroU32::new(config.burst).unwrap_or(per_second);

    let quota = Quota::per_second(per_second).allow_burst(burst);

    Ok(RateLimitState {
        limiter: Arc::new(RateLimiter::direct(quota)),
        per_second: per_second.get(),
    })
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> std::result::Result<Response, AppError> {
    match state.limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            metrics::record_rate_limited();
            Err(AppError::RateLimited {
                limit: state.per_second,
            })
        }
    }
}
