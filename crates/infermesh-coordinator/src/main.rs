//! Infermesh coordinator - control plane for distributed LLM inference.
//!
//! This is the main entry point. It builds the clock, id generator,
//! registry, scheduler, and signing authority in one construction root,
//! spawns the registry cleanup loop, and serves two listeners: the
//! control-plane API and the REST-compatible client API.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use infermesh_auth::TokenSigner;
use infermesh_core::{Clock, IdGenerator, SystemClock, UuidGenerator};
use infermesh_coordinator::{client_router, control_router, CoordinatorConfig, CoordinatorState};
use infermesh_registry::InMemoryRegistry;
use infermesh_scheduler::McdaScheduler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,infermesh=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting infermesh coordinator");

    let config = CoordinatorConfig::from_env();
    tracing::info!(
        coordinator_port = config.coordinator_port,
        http_port = config.http_port,
        heartbeat_timeout = ?config.heartbeat_timeout,
        token_ttl = ?config.token_ttl,
        cleanup_interval = ?config.cleanup_interval,
        "Configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdGenerator> = Arc::new(UuidGenerator);

    let registry = Arc::new(InMemoryRegistry::new(
        config.registry_config(),
        Arc::clone(&clock),
    ));

    let scheduler = Arc::new(McdaScheduler::with_weights(
        Arc::clone(&registry),
        config.weights,
    ));
    tracing::info!("Using MCDA scheduler for memory-aware agent selection");

    // Key-generation failure is fatal; there is no coordinator without a
    // signing authority.
    let signer = Arc::new(TokenSigner::new(
        config.token_config(),
        Arc::clone(&clock),
        Arc::clone(&ids),
    )?);
    tracing::info!(key_id = %signer.key_id(), "Signing authority initialized");

    tokio::spawn(Arc::clone(&registry).run_cleanup_loop());

    let state = CoordinatorState::new(
        Arc::clone(&registry),
        scheduler,
        signer,
        ids,
        clock,
        config.clone(),
    );

    let control = control_router(state.clone());
    let client = client_router(state);

    let control_listener =
        tokio::net::TcpListener::bind(("0.0.0.0", config.coordinator_port)).await?;
    let client_listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port)).await?;

    tracing::info!(
        addr = %control_listener.local_addr()?,
        "Control-plane API listening"
    );
    tracing::info!(
        addr = %client_listener.local_addr()?,
        "Client REST API listening"
    );

    // In-flight requests are bounded by the per-request timeout layer, so
    // the graceful drain cannot exceed it by much.
    let control_server =
        axum::serve(control_listener, control).with_graceful_shutdown(shutdown_signal());
    let client_server =
        axum::serve(client_listener, client).with_graceful_shutdown(shutdown_signal());

    tokio::try_join!(
        async { control_server.await },
        async { client_server.await },
    )?;

    tracing::info!("Coordinator shut down");
    Ok(())
}

/// Resolve when the process receives ctrl-c / SIGINT.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    } else {
        tracing::info!("Shutdown signal received, draining in-flight requests");
    }
}
