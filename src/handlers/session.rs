use axum::{extract::{Path, State}, http::StatusCode, Json};
use tracing::{error, info};

use crate::models::{CreateSessionResponse, ErrorResponse, SessionResponse};
use crate::session::SessionError;
use crate::AppState;

/// Create a new session
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), (StatusCode, Json<ErrorResponse>)> {
    let session = state.gateway.open_session().await.map_err(|e| {
        // Ids are fresh UUIDs, so a collision here is a bug rather than a client error
        error!("Failed to create session: {}", e);
        ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session")
    })?;

    info!("Session {} created via API", session.id);
    let url = state.config.session_url(&session.id);
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
            url,
        }),
    ))
}

/// Fetch the current state of a session
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<(StatusCode, Json<SessionResponse>), (StatusCode, Json<ErrorResponse>)> {
    match state.gateway.registry().get(&session_id).await {
        Ok(session) => Ok((
            StatusCode::OK,
            Json(SessionResponse {
                session_id: session.id,
                code: session.buffer,
                user_count: session.participant_count,
            }),
        )),
        Err(e @ SessionError::NotFound(_)) => Err(ErrorResponse::reply(StatusCode::NOT_FOUND, e.to_string())),
        Err(e) => {
            error!("Failed to load session '{}': {}", session_id, e);
            Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
