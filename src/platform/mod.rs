pub mod github;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::*;

/// The slice of the GitHub REST API the dashboard consumes.
///
/// Implementations are bound to one authenticated account; see
/// [`crate::session::Session`].
#[async_trait]
pub trait Platform: Send + Sync {
    /// Login of the authenticated account.
    async fn current_user(&self) -> Result<String>;

    /// List repositories of the authenticated account, most recently updated first.
    async fn list_user_repos(&self) -> Result<Vec<Repository>>;

    /// Fetch a repository with its open pull request count.
    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository>;

    /// List open issues (newest first), excluding pull requests.
    async fn list_open_issues(&self, repo: &RepoRef, per_page: u8) -> Result<Vec<OpenIssue>>;

    /// Recently updated issues as activity entries.
    async fn list_issue_activity(&self, repo: &RepoRef, per_page: u8) -> Result<Vec<Activity>>;

    /// Recently updated pull requests as activity entries.
    async fn list_pull_activity(&self, repo: &RepoRef, per_page: u8) -> Result<Vec<Activity>>;

    /// Recent workflow runs as activity entries.
    async fn list_workflow_activity(&self, repo: &RepoRef, per_page: u8)
        -> Result<Vec<Activity>>;

    /// List deployments, each with the state of its latest status.
    async fn list_deployments(&self, repo: &RepoRef, per_page: u8) -> Result<Vec<Deployment>>;

    async fn create_deployment(
        &self,
        repo: &RepoRef,
        deployment: &CreateDeployment,
    ) -> Result<Deployment>;

    /// Add labels to an issue.
    async fn add_labels(&self, repo: &RepoRef, issue_number: u64, labels: &[String])
        -> Result<()>;

    /// Post a comment on an issue.
    async fn post_comment(&self, repo: &RepoRef, issue_number: u64, body: &str) -> Result<()>;

    /// Trigger a `workflow_dispatch` event.
    async fn dispatch_workflow(&self, repo: &RepoRef, dispatch: &WorkflowDispatch) -> Result<()>;
}
