use std::sync::Arc;

use tokio::signal;

use crate::batch::BatchState;
use crate::server::AppState;

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

/// Perform graceful shutdown: report interrupted runs and flush preferences.
///
/// Batch runs are not resumable; items still processing are lost with the
/// process.
pub async fn graceful_shutdown(state: &Arc<AppState>) {
    tracing::info!("Starting graceful shutdown...");

    let runs = [
        ("triage", state.triage.read().await.state()),
        ("templates", state.templates.read().await.state()),
    ];
    for (work_list, run) in runs {
        if let BatchState::Running {
            completed, total, ..
        } = run
        {
            tracing::warn!(work_list, completed, total, "Batch run interrupted by shutdown");
        }
    }

    if let Err(e) = state.preferences.flush().await {
        tracing::warn!(error = %e, "Failed to flush preferences during shutdown");
    }

    tracing::info!("Graceful shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::tests::test_state;
    use crate::testing::FakeAssistant;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_shutdown_flushes_preferences() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, None, Arc::new(FakeAssistant::default())).await;
        assert!(!dir.path().join("prefs.json").exists());

        graceful_shutdown(&state).await;

        assert!(dir.path().join("prefs.json").exists());
    }
}
