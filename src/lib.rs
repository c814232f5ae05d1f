pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod session;
pub mod websocket;

use std::sync::Arc;

use axum::{http::{HeaderValue, Method}, routing::get, Router};
use tower_http::{cors::{AllowOrigin, CorsLayer}, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use docs::ApiDoc;
use routes::create_api_routes;
use websocket::{websocket_handler, SyncGateway};

/// Shared state handed to every request and connection
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<SyncGateway>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let gateway = SyncGateway::new(config.default_code.clone(), config.session_idle_timeout());
        Self {
            gateway: Arc::new(gateway),
            config: Arc::new(config),
        }
    }
}

/// Build the full application router
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Mount API routes
        .nest("/api", create_api_routes(state.clone()))
        // Realtime sync endpoint
        .route("/ws", get(websocket_handler).with_state(state))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let Some(origins) = config.cors_origin_list() else {
        return CorsLayer::permissive();
    };
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
}
