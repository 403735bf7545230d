//! Backend Collaborator Interface
//!
//! The gateway never implements bot behavior itself. Session state, protocol
//! encoding and business rules live behind [`Backend`]; the gateway only
//! turns HTTP requests into [`Action`]s and pushes backend events outward.

mod detached;
mod types;

pub use detached::Detached;
pub use types::*;

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

/// An opaque backend-produced event (incoming message, notice, request, ...).
pub type Event = Value;

/// Receiver of backend events.
///
/// The backend awaits the returned future before continuing, so a listener
/// that performs network delivery throttles event emission.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: Event) -> BoxFuture<'_, ()>;
}

/// A stateful bot session as seen by the gateway.
pub trait Backend: Send + Sync + 'static {
    /// Account identifier of the logged-in session (sent as `X-Self-ID`).
    fn self_id(&self) -> i64;

    /// Run exactly one backend operation.
    fn execute(&self, action: Action) -> BoxFuture<'_, ActionResponse>;

    /// Apply a quick operation returned by an event collector.
    ///
    /// `context` is the original event, `operation` the collector's reply.
    fn handle_quick_operation(
        &self,
        context: Value,
        operation: Value,
    ) -> BoxFuture<'_, ActionResponse> {
        self.execute(Action::HandleQuickOperation { context, operation })
    }

    /// Register a listener for every event this backend raises.
    fn on_event(&self, listener: Arc<dyn EventListener>);
}
