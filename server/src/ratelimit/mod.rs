//! Rate limiting module for throttling action dispatch.
//!
//! One limiter instance is shared by every request. The gateway only needs
//! the [`RateLimit`] seam; [`TokenBucket`] is the default discipline.

pub mod config;
pub mod limiter;

pub use config::*;
pub use limiter::*;
