use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    pub claude: ClaudeConfig,
    #[serde(default)]
    pub triage: TriageConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub deployments: DeploymentsConfig,
    #[serde(default)]
    pub preferences: PreferencesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// GitHub connection settings.
///
/// `token` is optional: without it the service starts disconnected and a
/// session is opened later through `POST /session`.
#[derive(Deserialize, Clone, Default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    /// Base URL for GitHub Enterprise installations.
    pub api_url: Option<String>,
    pub webhook_secret: Option<String>,
}

// Manual Debug impl to avoid leaking the token and webhook secret
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("api_url", &self.api_url)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Deserialize, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_claude_url")]
    pub api_url: String,
}

// Manual Debug impl to avoid leaking the API key
impl std::fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Fan-in bounds for loading issues to triage.
#[derive(Debug, Deserialize, Clone)]
pub struct TriageConfig {
    #[serde(default = "default_triage_repositories")]
    pub max_repositories: usize,
    #[serde(default = "default_issues_per_page")]
    pub issues_per_page: u8,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            max_repositories: default_triage_repositories(),
            issues_per_page: default_issues_per_page(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActivityConfig {
    #[serde(default = "default_activity_repositories")]
    pub max_repositories: usize,
    /// Items kept from each source (issues, pulls, workflow runs) per repository.
    #[serde(default = "default_per_source")]
    pub per_source: usize,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            max_repositories: default_activity_repositories(),
            per_source: default_per_source(),
            max_items: default_max_items(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeploymentsConfig {
    #[serde(default = "default_deployment_repositories")]
    pub max_repositories: usize,
    #[serde(default = "default_deployments_per_page")]
    pub per_page: u8,
}

impl Default for DeploymentsConfig {
    fn default() -> Self {
        Self {
            max_repositories: default_deployment_repositories(),
            per_page: default_deployments_per_page(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PreferencesConfig {
    #[serde(default = "default_preferences_path")]
    pub path: PathBuf,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            path: default_preferences_path(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_claude_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_triage_repositories() -> usize {
    5
}

fn default_issues_per_page() -> u8 {
    50
}

fn default_activity_repositories() -> usize {
    5
}

fn default_per_source() -> usize {
    5
}

fn default_max_items() -> usize {
    50
}

fn default_deployment_repositories() -> usize {
    10
}

fn default_deployments_per_page() -> u8 {
    30
}

fn default_preferences_path() -> PathBuf {
    PathBuf::from("steward-preferences.json")
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("steward").required(false));
        }

        // Environment variable overrides with STEWARD_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("STEWARD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        self.github.webhook_secret.as_deref()
    }
}
