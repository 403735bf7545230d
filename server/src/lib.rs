//! Bot Gateway Server
//!
//! HTTP API gateway in front of a bot session: resolves typed action
//! parameters, dispatches them to the backend, and pushes backend events
//! to an external collector.

pub mod api;
pub mod backend;
pub mod config;
pub mod ratelimit;
pub mod server;
pub mod webhooks;
