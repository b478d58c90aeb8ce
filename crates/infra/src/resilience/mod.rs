//! Pacing and bounded retry for outbound destination calls.

mod rate_limiter;
mod retry;

pub use rate_limiter::RateLimiter;
pub use retry::{retry_transient, RetryPolicy};
