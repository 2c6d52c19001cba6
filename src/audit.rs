//! In-memory record of every action that changed something on GitHub.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    TriageApplied,
    LabelsAdded,
    CommentCreated,
    DeploymentCreated,
    WorkflowDispatched,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::TriageApplied => "triage_applied",
            AuditAction::LabelsAdded => "labels_added",
            AuditAction::CommentCreated => "comment_created",
            AuditAction::DeploymentCreated => "deployment_created",
            AuditAction::WorkflowDispatched => "workflow_dispatched",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditResult {
    Success,
    Failed,
}

/// An action about to be recorded.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub actor: String,
    pub repo: String,
    pub target: String,
    pub details: String,
}

impl AuditEvent {
    pub fn new(
        action: AuditAction,
        actor: impl Into<String>,
        repo: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            action,
            actor: actor.into(),
            repo: repo.into(),
            target: target.into(),
            details: String::new(),
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub actor: String,
    pub repo: String,
    pub target: String,
    pub details: String,
    pub result: AuditResult,
}

impl AuditEntry {
    fn matches(&self, needle: &str) -> bool {
        [
            self.action.as_str(),
            &self.actor,
            &self.repo,
            &self.target,
            &self.details,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Append-only; entries are never edited or removed.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl AuditLog {
    pub async fn record(&self, event: AuditEvent, result: AuditResult) {
        let mut entries = self.entries.write().await;
        let entry = AuditEntry {
            id: entries.len() as u64 + 1,
            timestamp: Utc::now(),
            action: event.action,
            actor: event.actor,
            repo: event.repo,
            target: event.target,
            details: event.details,
            result,
        };

        tracing::debug!(
            action = %entry.action,
            repo = %entry.repo,
            target = %entry.target,
            result = ?entry.result,
            "Audit entry recorded"
        );
        entries.push(entry);
    }

    /// Entries newest first, optionally filtered by a case-insensitive query.
    pub async fn search(&self, query: Option<&str>) -> Vec<AuditEntry> {
        let needle = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        self.entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|entry| needle.as_deref().map_or(true, |n| entry.matches(n)))
            .cloned()
            .collect()
    }
}
