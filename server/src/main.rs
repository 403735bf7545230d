//! Botgate Server - Main Entry Point
//!
//! Serves the action API for a bot session and pushes its events to the
//! configured collector.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use botgate_server::{
    api,
    backend::{Backend, Detached},
    config,
    ratelimit::{RateLimit, RateLimitConfig, TokenBucket},
    server::{self, HttpServer},
    webhooks::{EventPusher, PushTarget},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "botgate_server=info,tower_http=info".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        auth = config.has_auth(),
        "Starting Botgate Server"
    );

    let backend: Arc<dyn Backend> = Arc::new(Detached::new());

    // Outbound event pusher (optional)
    let _pusher = config.post_url.as_ref().map(|url| {
        let target = PushTarget::new(url.clone(), config.post_secret.clone(), config.post_timeout);
        EventPusher::attach(&backend, target)
    });
    if config.has_push_target() {
        info!("No bot session attached, the event pusher stays idle");
    } else {
        info!("Event push disabled by configuration");
    }

    // Rate limiter (optional)
    let rl_config = RateLimitConfig::from_env();
    let rate_limiter = if rl_config.enabled {
        info!(
            frequency = rl_config.frequency,
            bucket = rl_config.bucket,
            "Rate limiter initialized"
        );
        Some(Arc::new(TokenBucket::new(&rl_config)) as Arc<dyn RateLimit>)
    } else {
        info!("Rate limiting disabled by configuration");
        None
    };

    let bind_address = config.bind_address.clone();
    let state = api::AppState::new(backend, config, rate_limiter);
    let app = api::create_router(state);

    let server = match HttpServer::start(&bind_address, app).await {
        Ok(server) => server,
        Err(e) => match server::exit_on_bind_failure(&e).await {},
    };

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, cleaning up...");
    server.stop().await;

    info!("Server shutdown complete");

    Ok(())
}
