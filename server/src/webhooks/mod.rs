//! Outbound Event Push
//!
//! HTTP POST delivery of backend events to a collector with HMAC signing,
//! bounded retries and quick-operation feedback.

pub mod delivery;
pub mod signing;
pub mod types;

pub use delivery::EventPusher;
pub use types::*;
