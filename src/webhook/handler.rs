use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::agent::triage::TriageAnalysis;
use crate::batch::BatchInput;
use crate::platform::types::RepoRef;
use crate::server::AppState;
use crate::session::Session;
use crate::triage::{apply_analysis, TriageInput};
use crate::webhook::events::{IssuesEvent, WebhookEvent};
use crate::webhook::signature::verify_delivery;

pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok());

    if let Err(e) = verify_delivery(state.config.webhook_secret(), &body, signature) {
        tracing::warn!(error = %e, "Webhook signature verification failed");
        return StatusCode::UNAUTHORIZED;
    }

    let event_type = match headers.get("x-github-event").and_then(|v| v.to_str().ok()) {
        Some(et) => et.to_string(),
        None => {
            tracing::warn!("Missing X-GitHub-Event header");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event = match WebhookEvent::parse(&event_type, &body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, event_type = %event_type, "Failed to parse webhook event");
            return StatusCode::BAD_REQUEST;
        }
    };

    tracing::info!(event_type = %event_type, "Received webhook event");

    match event {
        WebhookEvent::Issues(issues_event) => handle_issues_event(&state, issues_event).await,
        WebhookEvent::Ping => {
            tracing::info!("Received ping event");
            StatusCode::OK
        }
        WebhookEvent::Unsupported(event_type) => {
            tracing::debug!(event_type = %event_type, "Ignoring unsupported event");
            StatusCode::OK
        }
    }
}

/// Newly opened issues are analyzed and labeled in the background when
/// auto-triage is enabled and a session is connected.
async fn handle_issues_event(state: &Arc<AppState>, event: IssuesEvent) -> StatusCode {
    if event.action != "opened" || event.issue.is_pull_request() {
        return StatusCode::OK;
    }

    let preferences = match state.preferences.user_preferences().await {
        Ok(preferences) => preferences,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read preferences");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };
    if !preferences.auto_triage {
        tracing::debug!(repo = %event.repository.full_name, "Auto-triage disabled, ignoring issue");
        return StatusCode::OK;
    }

    let session = match state.session().await {
        Ok(session) => session,
        Err(_) => {
            tracing::warn!(
                repo = %event.repository.full_name,
                issue = event.issue.number,
                "Not connected to GitHub, skipping auto-triage"
            );
            return StatusCode::OK;
        }
    };

    let repo: RepoRef = match event.repository.full_name.parse() {
        Ok(repo) => repo,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid repository in issues event");
            return StatusCode::BAD_REQUEST;
        }
    };

    let input = TriageInput {
        repo,
        issue: event.issue.into_open_issue(),
    };

    if !state.triage.write().await.reserve_auto_triage(input.issue.id) {
        tracing::info!(
            repo = %input.repo,
            issue = input.issue.number,
            "Issue already triaged, ignoring redelivery"
        );
        return StatusCode::OK;
    }

    tracing::info!(
        repo = %input.repo,
        issue = input.issue.number,
        "Issue opened, starting auto-triage"
    );

    let state = Arc::clone(state);
    tokio::spawn(async move {
        auto_triage(&state, &session, input).await;
    });

    StatusCode::ACCEPTED
}

/// Runs with the issue reserved on the triage board; the reservation is
/// either turned into an applied entry or released.
async fn auto_triage(state: &AppState, session: &Session, input: TriageInput) {
    let id = input.issue.id;
    match analyze_and_apply(state, session, &input).await {
        Some(analysis) => state.triage.write().await.record_applied(id, analysis),
        None => state.triage.write().await.release_auto_triage(id),
    }
}

async fn analyze_and_apply(
    state: &AppState,
    session: &Session,
    input: &TriageInput,
) -> Option<TriageAnalysis> {
    if input.is_blank() {
        tracing::info!(issue = input.issue.number, "Empty issue, skipping auto-triage");
        return None;
    }

    let repo_name = input.repo.full_name();
    let analysis = match state.assistant.analyze_issue(&input.context(&repo_name)).await {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::warn!(repo = %repo_name, issue = input.issue.number, error = %e, "Auto-triage analysis failed");
            return None;
        }
    };

    apply_analysis(
        session.platform().as_ref(),
        &state.audit,
        session.login(),
        &input.repo,
        input.issue.number,
        &analysis,
    )
    .await
    .ok()?;

    Some(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{PreferenceStore, UserPreferences, PREFERENCES_KEY};
    use crate::server::create_router;
    use crate::server::tests::test_config;
    use crate::testing::{FakeAssistant, FakePlatform};
    use crate::webhook::events::tests::opened_payload;
    use crate::webhook::signature::sign;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const SECRET: &str = "hook-secret";

    async fn signed_state(dir: &TempDir, platform: Arc<FakePlatform>) -> Arc<AppState> {
        let mut config = test_config(dir);
        config.github.webhook_secret = Some(SECRET.to_string());
        let preferences = PreferenceStore::open(&config.preferences.path)
            .await
            .unwrap();
        let state = AppState::with_parts(config, Arc::new(FakeAssistant::default()), preferences);
        state
            .connect(Session::with_platform(platform).await.unwrap())
            .await;
        Arc::new(state)
    }

    fn delivery(event: &str, body: &str, signature: Option<String>) -> Request<Body> {
        let mut request = Request::post("/webhooks/github").header("x-github-event", event);
        if let Some(signature) = signature {
            request = request.header("x-hub-signature-256", signature);
        }
        request.body(Body::from(body.to_string())).unwrap()
    }

    async fn wait_for_comment(platform: &FakePlatform) -> bool {
        for _ in 0..100 {
            if platform.comment_count() > 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_signed_ping() {
        let dir = TempDir::new().unwrap();
        let state = signed_state(&dir, Arc::new(FakePlatform::default())).await;

        let body = r#"{"zen":"Keep it logically awesome."}"#;
        let response = create_router(state)
            .oneshot(delivery("ping", body, Some(sign(SECRET, body.as_bytes()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_or_missing_signature_is_rejected() {
        let dir = TempDir::new().unwrap();
        let state = signed_state(&dir, Arc::new(FakePlatform::default())).await;
        let app = create_router(state);

        let body = "{}";
        let response = app
            .clone()
            .oneshot(delivery("ping", body, Some(sign("wrong", body.as_bytes()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(delivery("ping", body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_opened_issue_is_auto_triaged() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(FakePlatform::default());
        let state = signed_state(&dir, platform.clone()).await;

        let body = opened_payload(false).to_string();
        let response = create_router(state.clone())
            .oneshot(delivery("issues", &body, Some(sign(SECRET, body.as_bytes()))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(wait_for_comment(&platform).await);
        let comments = platform.comments.lock().unwrap().clone();
        assert_eq!(comments[0].0, "octo/api");
        assert_eq!(comments[0].1, 42);

        wait_until_applied(&state, 9001).await;
    }

    async fn wait_until_applied(state: &AppState, id: u64) {
        for _ in 0..100 {
            if state.triage.read().await.is_applied(id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("issue was not recorded as applied");
    }

    #[tokio::test]
    async fn test_redelivered_issue_is_commented_once() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(FakePlatform::default());
        let state = signed_state(&dir, platform.clone()).await;
        let app = create_router(state.clone());
        let body = opened_payload(false).to_string();

        let first = app
            .clone()
            .oneshot(delivery("issues", &body, Some(sign(SECRET, body.as_bytes()))))
            .await
            .unwrap();
        let second = app
            .clone()
            .oneshot(delivery("issues", &body, Some(sign(SECRET, body.as_bytes()))))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);
        assert_eq!(second.status(), StatusCode::OK);

        wait_until_applied(&state, 9001).await;
        let later = app
            .oneshot(delivery("issues", &body, Some(sign(SECRET, body.as_bytes()))))
            .await
            .unwrap();
        assert_eq!(later.status(), StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(platform.comment_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_auto_triage_can_be_redelivered() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(FakePlatform::default());
        platform.set_fail_comments(true);
        let state = signed_state(&dir, platform.clone()).await;
        let app = create_router(state.clone());
        let body = opened_payload(false).to_string();

        let response = app
            .clone()
            .oneshot(delivery("issues", &body, Some(sign(SECRET, body.as_bytes()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let mut released = false;
        for _ in 0..100 {
            let mut board = state.triage.write().await;
            if board.reserve_auto_triage(9001) {
                board.release_auto_triage(9001);
                released = true;
                break;
            }
            drop(board);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(released);

        platform.set_fail_comments(false);
        let response = app
            .oneshot(delivery("issues", &body, Some(sign(SECRET, body.as_bytes()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        wait_until_applied(&state, 9001).await;
        assert_eq!(platform.comment_count(), 1);
    }

    #[tokio::test]
    async fn test_auto_triage_respects_preference_and_pull_requests() {
        let dir = TempDir::new().unwrap();
        let platform = Arc::new(FakePlatform::default());
        let state = signed_state(&dir, platform.clone()).await;
        let app = create_router(state.clone());

        let body = opened_payload(true).to_string();
        let response = app
            .clone()
            .oneshot(delivery("issues", &body, Some(sign(SECRET, body.as_bytes()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let disabled = UserPreferences {
            auto_triage: false,
            ..Default::default()
        };
        state
            .preferences
            .set(PREFERENCES_KEY, &disabled)
            .await
            .unwrap();

        let body = opened_payload(false).to_string();
        let response = app
            .oneshot(delivery("issues", &body, Some(sign(SECRET, body.as_bytes()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(platform.comment_count(), 0);
    }
}
