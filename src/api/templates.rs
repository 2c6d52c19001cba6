use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::agent::template::TypeSuggestion;
use crate::batch::{spawn_supervised, BatchState};
use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::templates::{export, RowUpdate, TemplateItem, TemplateSnapshot};

pub async fn board(State(state): State<Arc<AppState>>) -> Json<TemplateSnapshot> {
    Json(state.templates.read().await.snapshot())
}

pub async fn reset(State(state): State<Arc<AppState>>) -> Result<StatusCode> {
    state.templates.write().await.reset()?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ParseRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct ParseResponse {
    pub count: usize,
}

/// Replace the rows with quick-entry text, one issue per line.
pub async fn parse(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ParseRequest>,
) -> Result<Json<ParseResponse>> {
    let count = state.templates.write().await.load_quick_input(&request.text)?;
    Ok(Json(ParseResponse { count }))
}

#[derive(Serialize)]
pub struct RowCreated {
    pub id: u64,
}

pub async fn add_row(State(state): State<Arc<AppState>>) -> Result<(StatusCode, Json<RowCreated>)> {
    let id = state.templates.write().await.add_row()?;
    Ok((StatusCode::CREATED, Json(RowCreated { id })))
}

pub async fn update_row(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(update): Json<RowUpdate>,
) -> Result<Json<TemplateItem>> {
    let mut board = state.templates.write().await;
    let item = board.update_row(id, update)?;
    Ok(Json(item.clone()))
}

pub async fn remove_row(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    state.templates.write().await.remove_row(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct RepoRequest {
    pub repo: Option<String>,
}

pub async fn set_repo(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RepoRequest>,
) -> Result<StatusCode> {
    let repo = request.repo.filter(|r| !r.trim().is_empty());
    state.templates.write().await.set_repo(repo)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start generating every row. Progress is polled through `GET /templates`.
pub async fn generate(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<BatchState>)> {
    let (run, batch) = {
        let mut board = state.templates.write().await;
        let run = board.begin_run()?;
        (run, board.state())
    };

    let board = Arc::clone(&state.templates);
    spawn_supervised(
        "templates",
        run.execute(Arc::clone(&board), Arc::clone(&state.assistant)),
        async move { board.write().await.recover() },
    );

    Ok((StatusCode::ACCEPTED, Json(batch)))
}

/// Every generated template as one Markdown document.
pub async fn export(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let board = state.templates.read().await;
    if board.completed_templates().next().is_none() {
        return Err(AppError::Validation(
            "No generated templates to export".to_string(),
        ));
    }

    let markdown = export::markdown_export(board.completed_templates());
    Ok(([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], markdown))
}

pub async fn clipboard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse> {
    let board = state.templates.read().await;
    let text = export::clipboard_text(board.template(id)?);
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

#[derive(Deserialize)]
pub struct UrlQuery {
    pub repo: Option<String>,
}

#[derive(Serialize)]
pub struct UrlResponse {
    pub url: String,
}

/// Prefilled "new issue" link; `repo` overrides the board's repository.
pub async fn new_issue_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<UrlResponse>> {
    let board = state.templates.read().await;
    let repo = query
        .repo
        .as_deref()
        .or(board.repo())
        .ok_or_else(|| AppError::Validation("Please select a repository".to_string()))?;

    let url = export::new_issue_url(repo, board.template(id)?)?;
    Ok(Json(UrlResponse { url }))
}

#[derive(Deserialize)]
pub struct SuggestRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

pub async fn suggest_type(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SuggestRequest>,
) -> Result<Json<TypeSuggestion>> {
    if request.title.trim().is_empty() && request.body.trim().is_empty() {
        return Err(AppError::Validation(
            "Provide a title or description".to_string(),
        ));
    }

    let suggestion = state
        .assistant
        .suggest_issue_type(&request.title, &request.body)
        .await;
    Ok(Json(suggestion))
}
