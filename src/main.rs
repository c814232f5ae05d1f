use pairpad::{config::Config, create_app, AppState};
use std::panic;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration
    let config_result = Config::load();

    // Initialize tracing
    let fallback_level = config_result
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Debug for our app, configured level for everything else
            format!("pairpad=debug,tower_http=debug,axum::rejection=trace,{}", fallback_level).into()
        }))
        .init();

    info!("Starting server...");

    let config = config_result.unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    if config.is_development() && config.cors_origins.is_none() {
        warn!("No CORS origins configured - accepting requests from any origin");
    }

    let address = config.server_address();
    let idle_timeout = config.session_idle_timeout();
    let app = create_app(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);
    info!("Empty sessions are reclaimed after {:?}", idle_timeout);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}
