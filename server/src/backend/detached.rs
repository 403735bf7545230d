//! Backend used when no bot session is attached to the gateway.

use std::sync::{Arc, RwLock};

use futures::future::{self, BoxFuture};
use serde_json::json;
use tracing::debug;

use super::{Action, ActionResponse, Backend, EventListener, RETCODE_OFFLINE};

/// A backend without a session.
///
/// Reports itself offline and fails every operation that would need a live
/// account. It never raises events: registered listeners are only counted,
/// so a pusher attached to it stays idle.
#[derive(Default)]
pub struct Detached {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl Detached {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered event listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }
}

impl Backend for Detached {
    fn self_id(&self) -> i64 {
        0
    }

    fn execute(&self, action: Action) -> BoxFuture<'_, ActionResponse> {
        let response = match action {
            Action::GetStatus => ActionResponse::ok(json!({
                "app_initialized": true,
                "app_enabled": true,
                "app_good": true,
                "online": false,
                "good": false,
            })),
            Action::GetVersionInfo => ActionResponse::ok(json!({
                "app_name": "botgate",
                "app_version": env!("CARGO_PKG_VERSION"),
                "protocol_version": "v11",
                "runtime_os": std::env::consts::OS,
            })),
            Action::CanSendImage | Action::CanSendRecord => {
                ActionResponse::ok(json!({ "yes": false }))
            }
            other => {
                debug!(action = ?other, "No session attached, failing action");
                ActionResponse::failed(RETCODE_OFFLINE).with_msg("no bot session attached")
            }
        };
        Box::pin(future::ready(response))
    }

    fn on_event(&self, listener: Arc<dyn EventListener>) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(listener);
        }
    }
}
