//! Event Push Delivery
//!
//! Posts every backend event to the configured collector with signing,
//! per-attempt timeouts and exponential backoff, then feeds any JSON reply
//! back into the backend as a quick operation.
//!
//! Delivery is awaited by the backend's event emission: a slow collector
//! slows down event production. After the last attempt fails the event is
//! logged and dropped.

use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use reqwest::header::{CONTENT_TYPE, USER_AGENT as USER_AGENT_HEADER};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::signing;
use super::types::{DeliveryOutcome, DeliveryState, PushError, PushTarget, RetryPolicy, USER_AGENT};
use crate::backend::{Backend, Event, EventListener};

/// Outbound connector owning one push target.
pub struct EventPusher {
    client: reqwest::Client,
    target: PushTarget,
    policy: RetryPolicy,
    backend: Weak<dyn Backend>,
}

impl EventPusher {
    /// Create a pusher for `target` that reports back to `backend`.
    pub fn new(backend: &Arc<dyn Backend>, target: PushTarget) -> Self {
        Self {
            client: reqwest::Client::new(),
            target,
            policy: RetryPolicy::default(),
            backend: Arc::downgrade(backend),
        }
    }

    /// Override the retry schedule.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create a pusher and subscribe it to every event `backend` raises.
    pub fn attach(backend: &Arc<dyn Backend>, target: PushTarget) -> Arc<Self> {
        Self::subscribe(backend, Self::new(backend, target))
    }

    /// Subscribe an already configured pusher to `backend`.
    pub fn subscribe(backend: &Arc<dyn Backend>, pusher: Self) -> Arc<Self> {
        let pusher = Arc::new(pusher);
        backend.on_event(pusher.clone());
        info!(
            url = %pusher.target.url,
            signed = pusher.target.secret.is_some(),
            timeout_secs = pusher.target.timeout.as_secs(),
            "HTTP POST reporter started"
        );
        pusher
    }

    /// Push one event, retrying until delivered or attempts run out.
    pub async fn push(&self, event: &Event) -> DeliveryOutcome {
        transition(DeliveryState::Pending);

        // Signed bytes are exactly the bytes sent.
        let body = match serde_json::to_vec(event) {
            Ok(body) => body,
            Err(e) => {
                transition(DeliveryState::Exhausted { attempts: 0 });
                return DeliveryOutcome::Exhausted {
                    attempts: 0,
                    last_error: e.into(),
                };
            }
        };
        let signature = self
            .target
            .secret
            .as_deref()
            .map(|secret| signing::signature_header(secret, &body));
        let self_id = self.backend.upgrade().map_or(0, |backend| backend.self_id());

        let mut attempt = 0;
        loop {
            attempt += 1;
            transition(DeliveryState::Sending { attempt });

            match self.send_once(&body, self_id, signature.as_deref()).await {
                Ok(feedback) => {
                    transition(DeliveryState::Delivered { attempts: attempt });
                    return DeliveryOutcome::Delivered {
                        attempts: attempt,
                        feedback,
                    };
                }
                Err(e) if attempt < self.policy.max_attempts => {
                    let wait = self.policy.delay_after(attempt);
                    debug!(attempt, error = %e, "Push attempt failed");
                    transition(DeliveryState::Retrying { attempt, wait });
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    transition(DeliveryState::Exhausted { attempts: attempt });
                    return DeliveryOutcome::Exhausted {
                        attempts: attempt,
                        last_error: e,
                    };
                }
            }
        }
    }

    /// Push one event and act on the result.
    ///
    /// A JSON reply is handed to the backend as a quick operation with the
    /// event as its context. Exhausted deliveries are logged and dropped.
    pub async fn deliver(&self, event: Event) -> DeliveryOutcome {
        let outcome = self.push(&event).await;
        match &outcome {
            DeliveryOutcome::Delivered {
                feedback: Some(operation),
                ..
            } => {
                if let Some(backend) = self.backend.upgrade() {
                    let result = backend
                        .handle_quick_operation(event, operation.clone())
                        .await;
                    debug!(retcode = result.retcode, "Quick operation applied");
                } else {
                    debug!("Backend gone, ignoring quick operation");
                }
            }
            DeliveryOutcome::Delivered { feedback: None, .. } => {}
            DeliveryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                warn!(
                    url = %self.target.url,
                    attempts,
                    error = %last_error,
                    event = %event,
                    "Failed to push event, dropping"
                );
            }
        }
        outcome
    }

    /// One HTTP attempt. A 2xx answer is success; a valid JSON body is
    /// returned as feedback.
    async fn send_once(
        &self,
        body: &[u8],
        self_id: i64,
        signature: Option<&str>,
    ) -> Result<Option<Value>, PushError> {
        let mut request = self
            .client
            .post(&self.target.url)
            .timeout(self.target.timeout)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT_HEADER, USER_AGENT)
            .header("X-Self-ID", self_id.to_string())
            .body(body.to_vec());
        if let Some(signature) = signature {
            request = request.header("X-Signature", signature);
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PushError::Status(status));
        }

        let reply = response.bytes().await.map_err(classify)?;
        Ok(serde_json::from_slice(&reply).ok())
    }
}

impl EventListener for EventPusher {
    fn on_event(&self, event: Event) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.deliver(event).await;
        })
    }
}

fn transition(state: DeliveryState) {
    debug!(state = ?state, terminal = state.is_terminal(), "Push state");
}

fn classify(error: reqwest::Error) -> PushError {
    if error.is_timeout() {
        PushError::Timeout
    } else {
        PushError::Transport(error)
    }
}
