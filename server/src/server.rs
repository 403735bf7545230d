//! HTTP Server Lifecycle
//!
//! [`HttpServer`] is the owned handle for the one running listener. It is
//! created by [`HttpServer::start`] and consumed by [`HttpServer::stop`].

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tracing::{error, info, warn};

/// Deadline for in-flight requests once shutdown has been requested.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause before exiting on a bind failure so the log line gets out.
const BIND_FAILURE_PAUSE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] io::Error),
}

/// A running HTTP listener.
pub struct HttpServer {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<(), ServerError>>,
}

impl HttpServer {
    /// Bind `addr` and start serving `router` in the background.
    pub async fn start(addr: &str, router: Router) -> Result<Self, ServerError> {
        let bind_error = |source| ServerError::Bind {
            addr: addr.to_owned(),
            source,
        };
        let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                // A dropped sender also counts as a shutdown request.
                let _ = signal.await;
            })
            .await?;
            Ok::<(), ServerError>(())
        });

        info!(address = %local_addr, "HTTP server listening");
        Ok(Self {
            local_addr,
            shutdown,
            task,
        })
    }

    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Request graceful shutdown and wait up to [`SHUTDOWN_TIMEOUT`] for
    /// in-flight requests to finish.
    pub async fn stop(self) {
        self.stop_within(SHUTDOWN_TIMEOUT).await;
    }

    /// [`Self::stop`] with an explicit deadline. The serve task is aborted
    /// once `deadline` passes.
    pub async fn stop_within(self, deadline: Duration) {
        let Self {
            local_addr,
            shutdown,
            mut task,
        } = self;

        info!(address = %local_addr, "Stopping HTTP server");
        let _ = shutdown.send(());

        match tokio::time::timeout(deadline, &mut task).await {
            Ok(Ok(Ok(()))) => info!("HTTP server stopped"),
            Ok(Ok(Err(e))) => error!(error = %e, "HTTP server exited with error"),
            Ok(Err(e)) => error!(error = %e, "HTTP server task failed"),
            Err(_) => {
                warn!(
                    timeout_secs = deadline.as_secs(),
                    "HTTP server did not shut down in time, aborting"
                );
                task.abort();
            }
        }
    }
}

/// Log a fatal start failure, pause briefly, and exit the process.
///
/// Never returns; the `Infallible` output lets callers diverge with an
/// empty `match`.
pub async fn exit_on_bind_failure(err: &ServerError) -> Infallible {
    report_bind_failure(err).await;
    std::process::exit(1)
}

async fn report_bind_failure(err: &ServerError) {
    error!(error = %err, "HTTP server failed to start");
    error!("Check whether the port is already in use by another program");
    tokio::time::sleep(BIND_FAILURE_PAUSE).await;
}
