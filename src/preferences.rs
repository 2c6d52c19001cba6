//! Operator preferences, persisted as a JSON key-value file.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::{AppError, Result};

pub const PREFERENCES_KEY: &str = "preferences";
pub const WORKFLOW_CONFIG_KEY: &str = "workflow-config";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    Merge,
    #[default]
    Squash,
    Rebase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Notifications {
    pub deployments: bool,
    pub failures: bool,
    pub approvals: bool,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            deployments: true,
            failures: true,
            approvals: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Analyze and apply newly opened issues from the webhook.
    pub auto_triage: bool,
    pub require_templates: bool,
    pub auto_rollback: bool,
    pub auto_merge: bool,
    pub merge_strategy: MergeStrategy,
    pub min_approvals: u32,
    pub prod_approvals: u32,
    pub notifications: Notifications,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            auto_triage: true,
            require_templates: true,
            auto_rollback: true,
            auto_merge: true,
            merge_strategy: MergeStrategy::Squash,
            min_approvals: 2,
            prod_approvals: 2,
            notifications: Notifications::default(),
        }
    }
}

/// A chat-ops command offered on pull requests and issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCommand {
    pub id: String,
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewWorkflowCommand {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandUpdate {
    pub enabled: Option<bool>,
    pub requires_approval: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub commands: Vec<WorkflowCommand>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        let command = |id: &str, name: &str, command: &str, description: &str, approval| {
            WorkflowCommand {
                id: id.to_string(),
                name: name.to_string(),
                command: command.to_string(),
                description: description.to_string(),
                requires_approval: approval,
                enabled: true,
            }
        };

        Self {
            commands: vec![
                command("1", "Rebuild CI", "/rebuild", "Trigger a rebuild of the CI pipeline", false),
                command("2", "Deploy Staging", "/deploy staging", "Deploy to the staging environment", false),
                command("3", "Deploy Production", "/deploy production", "Deploy to the production environment", true),
                command("4", "Rollback", "/rollback", "Rollback to the previous deployment", true),
                command("5", "Run Tests", "/test", "Run the full test suite", false),
            ],
        }
    }
}

impl WorkflowConfig {
    pub fn add_command(&mut self, new: NewWorkflowCommand) -> Result<&WorkflowCommand> {
        if new.name.trim().is_empty() || new.command.trim().is_empty() {
            return Err(AppError::Validation(
                "Please fill in command name and command".to_string(),
            ));
        }

        let id = self
            .commands
            .iter()
            .filter_map(|c| c.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        self.commands.push(WorkflowCommand {
            id: id.to_string(),
            name: new.name.trim().to_string(),
            command: new.command.trim().to_string(),
            description: new.description,
            requires_approval: new.requires_approval,
            enabled: new.enabled,
        });
        Ok(&self.commands[self.commands.len() - 1])
    }

    pub fn remove_command(&mut self, id: &str) -> Result<()> {
        let before = self.commands.len();
        self.commands.retain(|c| c.id != id);
        if self.commands.len() == before {
            return Err(AppError::NotFound(format!("workflow command {id}")));
        }
        Ok(())
    }

    pub fn update_command(&mut self, id: &str, update: CommandUpdate) -> Result<&WorkflowCommand> {
        let command = self
            .commands
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(format!("workflow command {id}")))?;

        if let Some(enabled) = update.enabled {
            command.enabled = enabled;
        }
        if let Some(requires_approval) = update.requires_approval {
            command.requires_approval = requires_approval;
        }
        Ok(command)
    }
}

/// File-backed JSON object of preference values.
///
/// Every `set` rewrites the whole file; missing keys read as defaults.
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl PreferenceStore {
    /// Open the store, starting empty when the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let values = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(AppError::Preferences(format!(
                        "{} does not contain a JSON object",
                        path.display()
                    )))
                }
                Err(e) => {
                    return Err(AppError::Preferences(format!(
                        "Failed to parse {}: {e}",
                        path.display()
                    )))
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(path = %path.display(), keys = values.len(), "Preference store opened");

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub async fn get<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.values.read().await.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| AppError::Preferences(format!("Invalid value for '{key}': {e}"))),
            None => Ok(T::default()),
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value);
        self.persist(&values).await?;

        tracing::debug!(key, "Preference saved");
        Ok(())
    }

    pub async fn user_preferences(&self) -> Result<UserPreferences> {
        self.get(PREFERENCES_KEY).await
    }

    pub async fn workflow_config(&self) -> Result<WorkflowConfig> {
        self.get(WORKFLOW_CONFIG_KEY).await
    }

    /// Read-modify-write of the workflow configuration.
    pub async fn update_workflow_config<F, T>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut WorkflowConfig) -> Result<T>,
    {
        let mut values = self.values.write().await;
        let mut config: WorkflowConfig = match values.get(WORKFLOW_CONFIG_KEY) {
            Some(value) => serde_json::from_value(value.clone())?,
            None => WorkflowConfig::default(),
        };

        let output = change(&mut config)?;
        values.insert(WORKFLOW_CONFIG_KEY.to_string(), serde_json::to_value(&config)?);
        self.persist(&values).await?;
        Ok(output)
    }

    /// Write the current values to disk.
    pub async fn flush(&self) -> Result<()> {
        let values = self.values.read().await;
        self.persist(&values).await
    }

    async fn persist(&self, values: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
