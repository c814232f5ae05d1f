use crate::{handlers::{create_session, diagnostics, get_session, health_check, ready_check}, AppState};
use axum::{routing::{get, post}, Router};

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/diagnostics", get(diagnostics))
        .route("/sessions", post(create_session))
        .route("/sessions/:session_id", get(get_session))
        .with_state(state)
}
