// Main entry point - Dependency injection and session lifecycle
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;

use crate::application::push_channel::PushChannelManager;
use crate::application::sync_controller::SyncController;
use crate::infrastructure::config::load_fleet_config;
use crate::infrastructure::http_repository::HttpFleetRepository;
use crate::infrastructure::websocket_channel::WebSocketConnector;
use crate::presentation::app_state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_fleet_config()?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(HttpFleetRepository::new(
        &config.api.base_url,
        config.api.request_timeout(),
    )?);

    // Create the controller (application layer) and start the session
    let controller = SyncController::new(repository, config.session.notification_ttl());
    tokio::spawn({
        let controller = controller.clone();
        let tick = config.session.tick();
        async move {
            controller.start(tick).await;
        }
    });

    // Push channel feeds the controller
    let connector = Arc::new(WebSocketConnector::new(
        config.push.url.clone(),
        config.push.handshake_timeout(),
    ));
    let mut push_channel = PushChannelManager::new(
        connector,
        config.push.greeting.clone(),
        config.push.reconnect_policy(),
    );
    let forwarder = push_channel
        .start()
        .map(|events| tokio::spawn(controller.clone().forward_push_events(events)));

    // Build router (presentation layer)
    let router = presentation::router(Arc::new(AppState {
        controller: controller.clone(),
    }));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        api = %config.api.base_url,
        push = %config.push.url,
        "Starting fleet-sync"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await?;

    // Teardown: close the channel, then stop the session
    push_channel.stop().await;
    if let Some(forwarder) = forwarder {
        forwarder.await?;
    }
    controller.stop().await;

    Ok(())
}
