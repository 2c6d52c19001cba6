use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::session::{Session, SessionStatus};

#[derive(Deserialize)]
pub struct ConnectRequest {
    pub token: String,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<SessionStatus> {
    Json(state.session_status().await)
}

pub async fn connect(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConnectRequest>,
) -> Result<Json<SessionStatus>> {
    if request.token.trim().is_empty() {
        return Err(AppError::Validation("Please enter a token".to_string()));
    }

    let session = Session::connect(request.token.trim(), state.config.github.api_url.as_deref()).await?;
    state.connect(session).await;

    Ok(Json(state.session_status().await))
}

pub async fn disconnect(State(state): State<Arc<AppState>>) -> StatusCode {
    state.disconnect().await;
    StatusCode::NO_CONTENT
}
