use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::activity;
use crate::deployments;
use crate::error::{AppError, Result};
use crate::platform::types::{Activity, CreateDeployment, Deployment, Repository, WorkflowDispatch};
use crate::server::AppState;

use super::repo_ref;

pub async fn list_repositories(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Repository>>> {
    let session = state.session().await?;
    Ok(Json(session.platform().list_user_repos().await?))
}

pub async fn get_repository(
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<Repository>> {
    let session = state.session().await?;
    let repository = session
        .platform()
        .get_repository(&repo_ref(owner, repo))
        .await?;
    Ok(Json(repository))
}

pub async fn activity(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Activity>>> {
    let session = state.session().await?;
    let feed = activity::recent_activity(session.platform().as_ref(), &state.config.activity).await?;
    Ok(Json(feed))
}

pub async fn list_deployments(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Deployment>>> {
    let session = state.session().await?;
    let all = deployments::list_all(session.platform().as_ref(), &state.config.deployments).await?;
    Ok(Json(all))
}

pub async fn create_deployment(
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
    Json(request): Json<CreateDeployment>,
) -> Result<(StatusCode, Json<Deployment>)> {
    if request.git_ref.trim().is_empty() || request.environment.trim().is_empty() {
        return Err(AppError::Validation(
            "A ref and an environment are required".to_string(),
        ));
    }

    let session = state.session().await?;
    let deployment = deployments::create(
        session.platform().as_ref(),
        &state.audit,
        session.login(),
        &repo_ref(owner, repo),
        &request,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(deployment)))
}

#[derive(Deserialize)]
pub struct DispatchRequest {
    #[serde(default = "default_ref")]
    pub git_ref: String,
    #[serde(default)]
    pub inputs: serde_json::Map<String, serde_json::Value>,
}

fn default_ref() -> String {
    "main".to_string()
}

pub async fn dispatch_workflow(
    State(state): State<Arc<AppState>>,
    Path((owner, repo, workflow)): Path<(String, String, String)>,
    Json(request): Json<DispatchRequest>,
) -> Result<StatusCode> {
    let session = state.session().await?;
    let dispatch = WorkflowDispatch {
        workflow_id: workflow,
        git_ref: request.git_ref,
        inputs: request.inputs,
    };

    deployments::dispatch_workflow(
        session.platform().as_ref(),
        &state.audit,
        session.login(),
        &repo_ref(owner, repo),
        &dispatch,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    if request.question.trim().is_empty() {
        return Err(AppError::Validation("Please ask a question".to_string()));
    }

    let session = state.session().await?;
    let repository = session
        .platform()
        .get_repository(&repo_ref(owner, repo))
        .await?;
    let answer = state.assistant.chat(&repository, request.question.trim()).await;

    Ok(Json(ChatResponse { answer }))
}
