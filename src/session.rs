//! The authenticated GitHub connection.

use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::platform::github::GitHubPlatform;
use crate::platform::Platform;

/// One connected GitHub account. Created on connect, dropped on disconnect;
/// every GitHub-facing operation is handed a session explicitly.
#[derive(Clone)]
pub struct Session {
    platform: Arc<dyn Platform>,
    login: String,
}

impl Session {
    /// Authenticate with a personal access token and resolve the account login.
    pub async fn connect(token: &str, api_url: Option<&str>) -> Result<Self> {
        let platform = GitHubPlatform::new(token, api_url)?;
        Self::with_platform(Arc::new(platform)).await
    }

    pub async fn with_platform(platform: Arc<dyn Platform>) -> Result<Self> {
        let login = platform.current_user().await?;
        tracing::info!(login = %login, "Connected to GitHub");
        Ok(Self { platform, login })
    }

    pub fn platform(&self) -> Arc<dyn Platform> {
        Arc::clone(&self.platform)
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn status(session: Option<&Session>) -> SessionStatus {
        SessionStatus {
            connected: session.is_some(),
            login: session.map(|s| s.login.clone()),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("login", &self.login).finish()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionStatus {
    pub connected: bool,
    pub login: Option<String>,
}
