use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::audit::AuditEntry;
use crate::error::Result;
use crate::preferences::{
    CommandUpdate, NewWorkflowCommand, UserPreferences, WorkflowCommand, WorkflowConfig,
    PREFERENCES_KEY, WORKFLOW_CONFIG_KEY,
};
use crate::server::AppState;

#[derive(Deserialize)]
pub struct AuditQuery {
    pub q: Option<String>,
}

pub async fn audit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Json<Vec<AuditEntry>> {
    Json(state.audit.search(query.q.as_deref()).await)
}

pub async fn preferences(State(state): State<Arc<AppState>>) -> Result<Json<UserPreferences>> {
    Ok(Json(state.preferences.user_preferences().await?))
}

pub async fn save_preferences(
    State(state): State<Arc<AppState>>,
    Json(preferences): Json<UserPreferences>,
) -> Result<Json<UserPreferences>> {
    state.preferences.set(PREFERENCES_KEY, &preferences).await?;
    tracing::info!(auto_triage = preferences.auto_triage, "Preferences updated");
    Ok(Json(preferences))
}

pub async fn workflows(State(state): State<Arc<AppState>>) -> Result<Json<WorkflowConfig>> {
    Ok(Json(state.preferences.workflow_config().await?))
}

pub async fn save_workflows(
    State(state): State<Arc<AppState>>,
    Json(config): Json<WorkflowConfig>,
) -> Result<Json<WorkflowConfig>> {
    state.preferences.set(WORKFLOW_CONFIG_KEY, &config).await?;
    Ok(Json(config))
}

pub async fn add_command(
    State(state): State<Arc<AppState>>,
    Json(command): Json<NewWorkflowCommand>,
) -> Result<(StatusCode, Json<WorkflowCommand>)> {
    let added = state
        .preferences
        .update_workflow_config(|config| config.add_command(command).cloned())
        .await?;
    Ok((StatusCode::CREATED, Json(added)))
}

pub async fn update_command(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<CommandUpdate>,
) -> Result<Json<WorkflowCommand>> {
    let updated = state
        .preferences
        .update_workflow_config(|config| config.update_command(&id, update).cloned())
        .await?;
    Ok(Json(updated))
}

pub async fn remove_command(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state
        .preferences
        .update_workflow_config(|config| config.remove_command(&id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::create_router;
    use crate::server::tests::{body_json, empty_request, json_request, test_state};
    use crate::testing::FakeAssistant;
    use tempfile::TempDir;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_preferences_round_trip_through_api() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, None, Arc::new(FakeAssistant::default())).await;
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/preferences"))
            .await
            .unwrap();
        let defaults = body_json(response).await;
        assert_eq!(defaults["merge_strategy"], "squash");
        assert_eq!(defaults["notifications"]["approvals"], true);

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/preferences",
                serde_json::json!({ "auto_triage": false, "merge_strategy": "rebase" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(empty_request("GET", "/preferences"))
            .await
            .unwrap();
        let saved = body_json(response).await;
        assert_eq!(saved["auto_triage"], false);
        assert_eq!(saved["min_approvals"], 2);
    }

    #[tokio::test]
    async fn test_add_command_validation() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, None, Arc::new(FakeAssistant::default())).await;
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/preferences/workflows/commands",
                serde_json::json!({ "name": "Lint" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/preferences/workflows/commands",
                serde_json::json!({ "name": "Lint", "command": "/lint" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["enabled"], true);

        let response = app
            .oneshot(empty_request("DELETE", "/preferences/workflows/commands/42"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
