use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use request_number::{
    AppState, NumberProvider, ProviderConfig, ServerConfig, TwilioClient, build_app,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_number=info,server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Read configuration from environment
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    let provider_config = ProviderConfig::from_env().context("Invalid Twilio configuration")?;

    tracing::info!("Initializing Twilio client...");
    let client = TwilioClient::new(provider_config).context("Failed to initialize Twilio client")?;
    if !client.is_configured() {
        tracing::warn!(
            "TWILIO_ACCOUNT_SID/TWILIO_AUTH_TOKEN not set; number requests will fail until configured"
        );
    }

    let mut state = AppState::new(Arc::new(client));
    match config.api_key {
        Some(key) => state = state.with_api_key(key),
        None => tracing::warn!("REQUEST_NUMBER_API_KEY not set; /request_number is open to any caller"),
    }

    // Build Axum app with routes
    let app = build_app(state);

    // Bind server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}
