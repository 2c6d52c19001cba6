//! In-memory fakes for the GitHub and model collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::agent::template::{IssueTemplate, IssueType, TemplateRequest, TypeSuggestion};
use crate::agent::triage::{IssueContext, Priority, TriageAnalysis};
use crate::agent::Assistant;
use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::Platform;

pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn repository(id: u64, full_name: &str, updated_minutes: i64) -> Repository {
    Repository {
        id,
        name: full_name.split('/').nth(1).unwrap_or(full_name).to_string(),
        full_name: full_name.to_string(),
        open_issues: 3,
        open_prs: 1,
        last_activity: at(updated_minutes),
        status: RepoHealth::Healthy,
        active_deployments: 0,
    }
}

pub fn issue(id: u64, number: u64, title: &str, body: &str, created_minutes: i64) -> OpenIssue {
    OpenIssue {
        id,
        number,
        title: title.to_string(),
        body: body.to_string(),
        author: "reporter".to_string(),
        labels: Vec::new(),
        html_url: format!("https://github.com/octo/widgets/issues/{number}"),
        created_at: at(created_minutes),
    }
}

pub fn activity(id: &str, repo: &str, minutes: i64) -> Activity {
    Activity {
        id: id.to_string(),
        kind: ActivityKind::Comment,
        repo: repo.to_string(),
        title: format!("Activity {id}"),
        description: String::new(),
        status: ActivityStatus::Info,
        timestamp: at(minutes),
        user: Some("octocat".to_string()),
        url: None,
    }
}

pub fn deployment(id: u64, repo: &str, status: DeploymentStatus, minutes: i64) -> Deployment {
    Deployment {
        id,
        repo: repo.to_string(),
        environment: "staging".to_string(),
        status,
        git_ref: "main".to_string(),
        triggered_by: "octocat".to_string(),
        timestamp: at(minutes),
        url: None,
    }
}

#[derive(Default)]
pub struct FakePlatform {
    repos: Vec<Repository>,
    issues: HashMap<String, Vec<OpenIssue>>,
    activity: HashMap<String, Vec<Activity>>,
    deployments: HashMap<String, Vec<Deployment>>,
    failing_repos: HashSet<String>,
    fail_labels: AtomicBool,
    fail_comments: AtomicBool,
    next_deployment: AtomicU64,
    pub labels: Mutex<Vec<(String, u64, Vec<String>)>>,
    pub comments: Mutex<Vec<(String, u64, String)>>,
    pub dispatches: Mutex<Vec<(String, String)>>,
    pub issue_requests: Mutex<Vec<String>>,
}

impl FakePlatform {
    pub fn with_repo(mut self, repo: Repository) -> Self {
        self.repos.push(repo);
        self
    }

    pub fn with_issue(mut self, repo: &str, issue: OpenIssue) -> Self {
        self.issues.entry(repo.to_string()).or_default().push(issue);
        self
    }

    pub fn with_activity(mut self, repo: &str, entry: Activity) -> Self {
        self.activity.entry(repo.to_string()).or_default().push(entry);
        self
    }

    pub fn with_deployment(mut self, repo: &str, entry: Deployment) -> Self {
        self.deployments
            .entry(repo.to_string())
            .or_default()
            .push(entry);
        self
    }

    pub fn failing_repo(mut self, repo: &str) -> Self {
        self.failing_repos.insert(repo.to_string());
        self
    }

    pub fn set_fail_labels(&self, fail: bool) {
        self.fail_labels.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_comments(&self, fail: bool) {
        self.fail_comments.store(fail, Ordering::SeqCst);
    }

    pub fn comment_count(&self) -> usize {
        self.comments.lock().unwrap().len()
    }

    fn check_repo(&self, repo: &RepoRef) -> Result<()> {
        if self.failing_repos.contains(&repo.full_name()) {
            return Err(AppError::GitHubApi(format!("{repo} unavailable")));
        }
        Ok(())
    }

    fn entries<T: Clone>(map: &HashMap<String, Vec<T>>, repo: &RepoRef, limit: u8) -> Vec<T> {
        map.get(&repo.full_name())
            .map(|v| v.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn current_user(&self) -> Result<String> {
        Ok("octocat".to_string())
    }

    async fn list_user_repos(&self) -> Result<Vec<Repository>> {
        Ok(self.repos.clone())
    }

    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository> {
        self.check_repo(repo)?;
        self.repos
            .iter()
            .find(|r| r.full_name == repo.full_name())
            .cloned()
            .ok_or_else(|| AppError::NotFound(repo.full_name()))
    }

    async fn list_open_issues(&self, repo: &RepoRef, per_page: u8) -> Result<Vec<OpenIssue>> {
        self.issue_requests.lock().unwrap().push(repo.full_name());
        self.check_repo(repo)?;
        Ok(Self::entries(&self.issues, repo, per_page))
    }

    async fn list_issue_activity(&self, repo: &RepoRef, per_page: u8) -> Result<Vec<Activity>> {
        self.check_repo(repo)?;
        Ok(Self::entries(&self.activity, repo, per_page))
    }

    async fn list_pull_activity(&self, repo: &RepoRef, _per_page: u8) -> Result<Vec<Activity>> {
        self.check_repo(repo)?;
        Ok(Vec::new())
    }

    async fn list_workflow_activity(
        &self,
        repo: &RepoRef,
        _per_page: u8,
    ) -> Result<Vec<Activity>> {
        self.check_repo(repo)?;
        Ok(Vec::new())
    }

    async fn list_deployments(&self, repo: &RepoRef, per_page: u8) -> Result<Vec<Deployment>> {
        self.check_repo(repo)?;
        Ok(Self::entries(&self.deployments, repo, per_page))
    }

    async fn create_deployment(
        &self,
        repo: &RepoRef,
        request: &CreateDeployment,
    ) -> Result<Deployment> {
        self.check_repo(repo)?;
        let id = self.next_deployment.fetch_add(1, Ordering::SeqCst) + 100;
        Ok(Deployment {
            id,
            repo: repo.full_name(),
            environment: request.environment.clone(),
            status: DeploymentStatus::PendingApproval,
            git_ref: request.git_ref.clone(),
            triggered_by: "octocat".to_string(),
            timestamp: at(0),
            url: None,
        })
    }

    async fn add_labels(&self, repo: &RepoRef, issue_number: u64, labels: &[String]) -> Result<()> {
        if self.fail_labels.load(Ordering::SeqCst) {
            return Err(AppError::GitHubApi("labels rejected".to_string()));
        }
        self.labels
            .lock()
            .unwrap()
            .push((repo.full_name(), issue_number, labels.to_vec()));
        Ok(())
    }

    async fn post_comment(&self, repo: &RepoRef, issue_number: u64, body: &str) -> Result<()> {
        if self.fail_comments.load(Ordering::SeqCst) {
            return Err(AppError::GitHubApi("comment rejected".to_string()));
        }
        self.comments
            .lock()
            .unwrap()
            .push((repo.full_name(), issue_number, body.to_string()));
        Ok(())
    }

    async fn dispatch_workflow(&self, repo: &RepoRef, dispatch: &WorkflowDispatch) -> Result<()> {
        self.check_repo(repo)?;
        self.dispatches
            .lock()
            .unwrap()
            .push((repo.full_name(), dispatch.workflow_id.clone()));
        Ok(())
    }
}

/// Fails any call whose title or description equals `fail_on`.
#[derive(Default)]
pub struct FakeAssistant {
    fail_on: Option<String>,
    generated: Mutex<Vec<String>>,
    analyzed: Mutex<Vec<String>>,
}

impl FakeAssistant {
    pub fn failing_on(input: &str) -> Self {
        Self {
            fail_on: Some(input.to_string()),
            ..Default::default()
        }
    }

    pub fn generated(&self) -> Vec<String> {
        self.generated.lock().unwrap().clone()
    }

    pub fn analyzed(&self) -> Vec<String> {
        self.analyzed.lock().unwrap().clone()
    }

    fn check(&self, input: &str) -> Result<()> {
        if self.fail_on.as_deref() == Some(input) {
            return Err(AppError::ClaudeApi("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Assistant for FakeAssistant {
    async fn analyze_issue(&self, issue: &IssueContext<'_>) -> Result<TriageAnalysis> {
        self.analyzed.lock().unwrap().push(issue.title.to_string());
        self.check(issue.title)?;
        Ok(TriageAnalysis {
            suggested_labels: vec!["bug".to_string(), "needs-triage".to_string()],
            priority: Priority::High,
            category: "bug".to_string(),
            comment: format!("Thanks for reporting \"{}\"", issue.title),
            reasoning: "Looks like a defect".to_string(),
        })
    }

    async fn generate_template(&self, request: &TemplateRequest<'_>) -> Result<IssueTemplate> {
        self.generated
            .lock()
            .unwrap()
            .push(request.description.to_string());
        self.check(request.description)?;
        Ok(IssueTemplate {
            title: request.description.to_string(),
            body: request.issue_type.skeleton().to_string(),
            labels: vec![request.issue_type.as_str().to_string()],
            assignees: Vec::new(),
            reasoning: "Fake template".to_string(),
        })
    }

    async fn suggest_issue_type(&self, title: &str, _partial_body: &str) -> TypeSuggestion {
        if self.check(title).is_err() {
            return TypeSuggestion::failed();
        }
        TypeSuggestion {
            suggested_type: IssueType::Feature,
            confidence: 80,
            reasoning: "Asks for new behavior".to_string(),
        }
    }

    async fn chat(&self, repository: &Repository, question: &str) -> String {
        format!(
            "{} has {} open issues ({question})",
            repository.full_name, repository.open_issues
        )
    }
}
