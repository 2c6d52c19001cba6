use std::sync::Arc;

use axum::routing::{get, patch, post, put};
use axum::Router;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::agent::claude::ClaudeClient;
use crate::agent::{Assistant, ClaudeAssistant};
use crate::api;
use crate::audit::AuditLog;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::preferences::PreferenceStore;
use crate::session::{Session, SessionStatus};
use crate::templates::TemplateBoard;
use crate::triage::TriageBoard;

pub struct AppState {
    pub config: AppConfig,
    pub assistant: Arc<dyn Assistant>,
    pub triage: Arc<RwLock<TriageBoard>>,
    pub templates: Arc<RwLock<TemplateBoard>>,
    pub audit: Arc<AuditLog>,
    pub preferences: PreferenceStore,
    session: RwLock<Option<Session>>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let assistant = Arc::new(ClaudeAssistant::new(ClaudeClient::new(&config.claude)));
        let preferences = PreferenceStore::open(&config.preferences.path).await?;
        let state = Self::with_parts(config, assistant, preferences);

        if let Some(token) = state.config.github.token.as_deref() {
            match Session::connect(token, state.config.github.api_url.as_deref()).await {
                Ok(session) => state.connect(session).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Configured GitHub token rejected, starting disconnected")
                }
            }
        }

        Ok(state)
    }

    pub fn with_parts(
        config: AppConfig,
        assistant: Arc<dyn Assistant>,
        preferences: PreferenceStore,
    ) -> Self {
        Self {
            config,
            assistant,
            triage: Arc::new(RwLock::new(TriageBoard::default())),
            templates: Arc::new(RwLock::new(TemplateBoard::default())),
            audit: Arc::new(AuditLog::default()),
            preferences,
            session: RwLock::new(None),
        }
    }

    /// The current session, or `NotConnected`.
    pub async fn session(&self) -> Result<Session> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(AppError::NotConnected)
    }

    pub async fn session_status(&self) -> SessionStatus {
        Session::status(self.session.read().await.as_ref())
    }

    pub async fn connect(&self, session: Session) {
        *self.session.write().await = Some(session);
    }

    pub async fn disconnect(&self) {
        if let Some(session) = self.session.write().await.take() {
            tracing::info!(login = %session.login(), "Disconnected from GitHub");
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/session",
            get(api::session::status)
                .post(api::session::connect)
                .delete(api::session::disconnect),
        )
        .route("/repos", get(api::dashboard::list_repositories))
        .route("/repos/:owner/:repo", get(api::dashboard::get_repository))
        .route("/repos/:owner/:repo/chat", post(api::dashboard::chat))
        .route(
            "/repos/:owner/:repo/deployments",
            post(api::dashboard::create_deployment),
        )
        .route(
            "/repos/:owner/:repo/workflows/:workflow/dispatches",
            post(api::dashboard::dispatch_workflow),
        )
        .route("/activity", get(api::dashboard::activity))
        .route("/deployments", get(api::dashboard::list_deployments))
        .route("/triage", get(api::triage::board))
        .route("/triage/refresh", post(api::triage::refresh))
        .route("/triage/select-untriaged", post(api::triage::select_untriaged))
        .route("/triage/bulk/analyze", post(api::triage::bulk_analyze))
        .route("/triage/bulk/apply", post(api::triage::bulk_apply))
        .route("/triage/:id/analyze", post(api::triage::analyze))
        .route("/triage/:id/apply", post(api::triage::apply))
        .route("/triage/:id/select", post(api::triage::toggle_selection))
        .route(
            "/templates",
            get(api::templates::board).delete(api::templates::reset),
        )
        .route("/templates/parse", post(api::templates::parse))
        .route("/templates/rows", post(api::templates::add_row))
        .route(
            "/templates/rows/:id",
            patch(api::templates::update_row).delete(api::templates::remove_row),
        )
        .route("/templates/repo", put(api::templates::set_repo))
        .route("/templates/generate", post(api::templates::generate))
        .route("/templates/export", get(api::templates::export))
        .route("/templates/suggest-type", post(api::templates::suggest_type))
        .route(
            "/templates/:id/new-issue-url",
            get(api::templates::new_issue_url),
        )
        .route("/templates/:id/clipboard", get(api::templates::clipboard))
        .route("/audit", get(api::settings::audit))
        .route(
            "/preferences",
            get(api::settings::preferences).put(api::settings::save_preferences),
        )
        .route(
            "/preferences/workflows",
            get(api::settings::workflows).put(api::settings::save_workflows),
        )
        .route(
            "/preferences/workflows/commands",
            post(api::settings::add_command),
        )
        .route(
            "/preferences/workflows/commands/:id",
            patch(api::settings::update_command).delete(api::settings::remove_command),
        )
        .route(
            "/webhooks/github",
            post(crate::webhook::handler::handle_webhook),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}
