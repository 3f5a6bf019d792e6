// SPDX-License-Identifier: Apache-2.0

//! Per-connector rate limiting.

pub mod limiter;
pub mod token_bucket;

pub use limiter::RateLimiter;
pub use token_bucket::TokenBucket;
