use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::agent::triage::TriageAnalysis;
use crate::batch::{spawn_supervised, BatchState};
use crate::error::Result;
use crate::server::AppState;
use crate::triage::{self, ApplyOutcome, TriageSnapshot};

pub async fn board(State(state): State<Arc<AppState>>) -> Json<TriageSnapshot> {
    Json(state.triage.read().await.snapshot())
}

/// Reload open issues from the operator's repositories.
pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<TriageSnapshot>> {
    let session = state.session().await?;
    let inputs = triage::fetch_open_issues(session.platform().as_ref(), &state.config.triage).await?;

    let mut board = state.triage.write().await;
    let count = board.replace_issues(inputs)?;
    tracing::info!(count, "Loaded issues for triage");

    Ok(Json(board.snapshot()))
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<TriageAnalysis>> {
    let analysis = triage::analyze_one(&state.triage, state.assistant.as_ref(), id).await?;
    Ok(Json(analysis))
}

#[derive(Serialize)]
pub struct ApplyResponse {
    pub outcome: ApplyOutcome,
}

pub async fn apply(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<ApplyResponse>> {
    let session = state.session().await?;
    let outcome = triage::apply_one(
        &state.triage,
        session.platform().as_ref(),
        &state.audit,
        session.login(),
        id,
    )
    .await?;

    Ok(Json(ApplyResponse { outcome }))
}

#[derive(Serialize)]
pub struct SelectionResponse {
    pub selected: bool,
}

pub async fn toggle_selection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<SelectionResponse>> {
    let selected = state.triage.write().await.toggle_selection(id)?;
    Ok(Json(SelectionResponse { selected }))
}

#[derive(Serialize)]
pub struct SelectAllResponse {
    pub selected: usize,
}

pub async fn select_untriaged(State(state): State<Arc<AppState>>) -> Json<SelectAllResponse> {
    let selected = state.triage.write().await.select_all_untriaged();
    Json(SelectAllResponse { selected })
}

/// Start analyzing every selected issue. Progress is polled through `GET /triage`.
pub async fn bulk_analyze(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<BatchState>)> {
    let (run, batch) = {
        let mut board = state.triage.write().await;
        let run = board.begin_bulk_analyze()?;
        (run, board.state())
    };

    let board = Arc::clone(&state.triage);
    spawn_supervised(
        "triage",
        run.execute(Arc::clone(&board), Arc::clone(&state.assistant)),
        async move { board.write().await.recover() },
    );

    Ok((StatusCode::ACCEPTED, Json(batch)))
}

/// Start applying every selected, analyzed issue.
pub async fn bulk_apply(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<BatchState>)> {
    let session = state.session().await?;
    let (run, batch) = {
        let mut board = state.triage.write().await;
        let run = board.begin_bulk_apply()?;
        (run, board.state())
    };

    let board = Arc::clone(&state.triage);
    spawn_supervised(
        "triage",
        run.execute(
            Arc::clone(&board),
            session.platform(),
            Arc::clone(&state.audit),
            session.login().to_string(),
        ),
        async move { board.write().await.recover() },
    );

    Ok((StatusCode::ACCEPTED, Json(batch)))
}
