use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for creating a session
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub url: String,
}

/// Current state of a session
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub code: String,
    pub user_count: usize,
}
