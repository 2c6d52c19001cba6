//! Raw GitHub REST payloads and their mapping onto platform types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::platform::types::{
    Activity, ActivityKind, ActivityStatus, Deployment, DeploymentStatus, Label, OpenIssue,
    RepoHealth, RepoRef, Repository,
};

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryPayload {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub open_issues_count: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Labels come back either as objects or, on some endpoints, bare strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LabelPayload {
    Named { name: String, color: Option<String> },
    Bare(String),
}

#[derive(Debug, Deserialize)]
pub struct IssuePayload {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub user: Option<UserPayload>,
    #[serde(default)]
    pub labels: Vec<LabelPayload>,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pull_request: Option<serde_json::Value>, // Present if issue is a PR
}

#[derive(Debug, Deserialize)]
pub struct PullPayload {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub user: Option<UserPayload>,
    pub html_url: String,
    pub updated_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct WorkflowRunsPayload {
    pub workflow_runs: Vec<WorkflowRunPayload>,
}

#[derive(Debug, Deserialize)]
pub struct WorkflowRunPayload {
    pub id: u64,
    pub name: Option<String>,
    pub event: String,
    pub head_branch: Option<String>,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub actor: Option<UserPayload>,
    pub html_url: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct DeploymentPayload {
    pub id: u64,
    pub environment: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub creator: Option<UserPayload>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct DeploymentStatusPayload {
    pub state: String,
    pub target_url: Option<String>,
}

pub fn map_repository(repo: RepositoryPayload, open_prs: u64) -> Repository {
    Repository {
        id: repo.id,
        name: repo.name,
        full_name: repo.full_name,
        open_issues: repo.open_issues_count,
        open_prs,
        last_activity: repo.updated_at.unwrap_or_else(Utc::now),
        status: RepoHealth::Healthy,
        active_deployments: 0,
    }
}

fn map_label(label: LabelPayload) -> Label {
    match label {
        LabelPayload::Named { name, color } => Label {
            name,
            color: color.unwrap_or_else(|| "000000".to_string()),
        },
        LabelPayload::Bare(name) => Label {
            name,
            color: "000000".to_string(),
        },
    }
}

fn login(user: Option<UserPayload>) -> Option<String> {
    user.map(|u| u.login)
}

/// Keep only real issues and map them for triage.
pub fn map_open_issues(issues: Vec<IssuePayload>) -> Vec<OpenIssue> {
    issues
        .into_iter()
        .filter(|issue| issue.pull_request.is_none())
        .map(|issue| OpenIssue {
            id: issue.id,
            number: issue.number,
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            author: login(issue.user).unwrap_or_else(|| "unknown".to_string()),
            labels: issue.labels.into_iter().map(map_label).collect(),
            html_url: issue.html_url,
            created_at: issue.created_at,
        })
        .collect()
}

pub fn map_issue_activity(repo: &RepoRef, issues: Vec<IssuePayload>) -> Vec<Activity> {
    issues
        .into_iter()
        .filter(|issue| issue.pull_request.is_none())
        .map(|issue| Activity {
            id: issue.id.to_string(),
            kind: ActivityKind::Triage,
            repo: repo.full_name(),
            title: issue.title,
            description: format!("Issue #{}: {}", issue.number, issue.state),
            status: if issue.state == "open" {
                ActivityStatus::Pending
            } else {
                ActivityStatus::Success
            },
            timestamp: issue.updated_at,
            user: login(issue.user),
            url: Some(issue.html_url),
        })
        .collect()
}

pub fn map_pull_activity(repo: &RepoRef, pulls: Vec<PullPayload>) -> Vec<Activity> {
    pulls
        .into_iter()
        .map(|pr| {
            let status = if pr.merged_at.is_some() {
                ActivityStatus::Success
            } else if pr.state == "open" {
                ActivityStatus::Pending
            } else {
                ActivityStatus::Info
            };

            Activity {
                id: pr.id.to_string(),
                kind: ActivityKind::Merge,
                repo: repo.full_name(),
                title: pr.title,
                description: format!("PR #{}: {}", pr.number, pr.state),
                status,
                timestamp: pr.updated_at,
                user: login(pr.user),
                url: Some(pr.html_url),
            }
        })
        .collect()
}

pub fn map_workflow_activity(repo: &RepoRef, runs: WorkflowRunsPayload) -> Vec<Activity> {
    runs.workflow_runs
        .into_iter()
        .map(|run| {
            let status = match (run.status.as_deref(), run.conclusion.as_deref()) {
                (Some("completed"), Some("success")) => ActivityStatus::Success,
                (Some("completed"), _) => ActivityStatus::Failed,
                _ => ActivityStatus::Pending,
            };

            Activity {
                id: run.id.to_string(),
                kind: ActivityKind::Workflow,
                repo: repo.full_name(),
                title: run.name.unwrap_or_else(|| "Workflow Run".to_string()),
                description: format!(
                    "{} on {}",
                    run.event,
                    run.head_branch.as_deref().unwrap_or("unknown")
                ),
                status,
                timestamp: run.updated_at,
                user: login(run.actor),
                url: Some(run.html_url),
            }
        })
        .collect()
}

/// `latest` is the newest status entry, if the statuses could be fetched.
pub fn map_deployment(
    repo: &RepoRef,
    deployment: DeploymentPayload,
    latest: Option<DeploymentStatusPayload>,
) -> Deployment {
    let status = DeploymentStatus::from_github_state(latest.as_ref().map(|s| s.state.as_str()));

    Deployment {
        id: deployment.id,
        repo: repo.full_name(),
        environment: deployment.environment,
        status,
        git_ref: deployment.ref_name,
        triggered_by: login(deployment.creator).unwrap_or_else(|| "system".to_string()),
        timestamp: deployment.created_at,
        url: latest.and_then(|s| s.target_url),
    }
}
