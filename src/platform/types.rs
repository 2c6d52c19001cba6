use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// An `owner/name` repository reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = AppError;

    fn from_str(full_name: &str) -> Result<Self, Self::Err> {
        match full_name.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(AppError::Validation(format!(
                "Invalid repository name: {full_name}"
            ))),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepoHealth {
    #[default]
    Healthy,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub open_issues: u64,
    pub open_prs: u64,
    pub last_activity: DateTime<Utc>,
    pub status: RepoHealth,
    pub active_deployments: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub color: String,
}

/// An open issue fetched for triage. Pull requests are never represented here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenIssue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub labels: Vec<Label>,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Triage,
    Deploy,
    Workflow,
    Comment,
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Pending,
    Failed,
    Info,
}

/// One entry of the cross-repository activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub kind: ActivityKind,
    pub repo: String,
    pub title: String,
    pub description: String,
    pub status: ActivityStatus,
    pub timestamp: DateTime<Utc>,
    pub user: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Deploying,
    Success,
    Failed,
    PendingApproval,
}

impl DeploymentStatus {
    /// Map the state of the latest GitHub deployment status.
    pub fn from_github_state(state: Option<&str>) -> Self {
        match state {
            Some("success") => DeploymentStatus::Success,
            Some("pending") | Some("in_progress") | Some("queued") => DeploymentStatus::Deploying,
            Some("failure") | Some("error") => DeploymentStatus::Failed,
            _ => DeploymentStatus::PendingApproval,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(
            self,
            DeploymentStatus::Deploying | DeploymentStatus::PendingApproval
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: u64,
    pub repo: String,
    pub environment: String,
    pub status: DeploymentStatus,
    pub git_ref: String,
    pub triggered_by: String,
    pub timestamp: DateTime<Utc>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeployment {
    pub git_ref: String,
    pub environment: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDispatch {
    pub workflow_id: String,
    #[serde(default = "default_dispatch_ref")]
    pub git_ref: String,
    #[serde(default)]
    pub inputs: serde_json::Map<String, serde_json::Value>,
}

fn default_dispatch_ref() -> String {
    "main".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_ref_parses_owner_and_name() {
        let repo: RepoRef = "octo/widgets".parse().unwrap();
        assert_eq!(repo.owner, "octo");
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.to_string(), "octo/widgets");
    }

    #[test]
    fn test_repo_ref_rejects_malformed_names() {
        assert!("widgets".parse::<RepoRef>().is_err());
        assert!("/widgets".parse::<RepoRef>().is_err());
        assert!("octo/".parse::<RepoRef>().is_err());
        assert!("octo/widgets/extra".parse::<RepoRef>().is_err());
    }

    #[test]
    fn test_deployment_status_mapping() {
        assert_eq!(
            DeploymentStatus::from_github_state(Some("in_progress")),
            DeploymentStatus::Deploying
        );
        assert_eq!(
            DeploymentStatus::from_github_state(Some("failure")),
            DeploymentStatus::Failed
        );
        assert_eq!(
            DeploymentStatus::from_github_state(None),
            DeploymentStatus::PendingApproval
        );
        assert!(DeploymentStatus::PendingApproval.is_active());
        assert!(!DeploymentStatus::Success.is_active());
    }
}
