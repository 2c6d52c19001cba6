use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Serialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::Platform;

use super::mapper::{self, *};

/// GitHub REST client bound to one personal access token.
pub struct GitHubPlatform {
    client: Octocrab,
}

/// Query parameters shared by the list endpoints.
#[derive(Debug, Serialize, Default)]
struct ListQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    direction: Option<&'a str>,
    per_page: u8,
}

impl GitHubPlatform {
    pub fn new(token: &str, api_url: Option<&str>) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(AppError::Validation(
                "A GitHub personal access token is required".to_string(),
            ));
        }

        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(url) = api_url {
            builder = builder
                .base_uri(url)
                .map_err(|e| AppError::Config(format!("Invalid GitHub API URL {url}: {e}")))?;
        }

        let client = builder
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build octocrab client: {e}")))?;

        Ok(Self { client })
    }

    fn recent(per_page: u8) -> ListQuery<'static> {
        ListQuery {
            state: Some("all"),
            sort: Some("updated"),
            direction: Some("desc"),
            per_page,
        }
    }
}

#[async_trait]
impl Platform for GitHubPlatform {
    async fn current_user(&self) -> Result<String> {
        let user: UserPayload = self
            .client
            .get("/user", None::<&()>)
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to fetch authenticated user: {e}")))?;

        Ok(user.login)
    }

    async fn list_user_repos(&self) -> Result<Vec<Repository>> {
        let query = ListQuery {
            sort: Some("updated"),
            per_page: 100,
            ..Default::default()
        };

        let repos: Vec<RepositoryPayload> = self.client.get("/user/repos", Some(&query)).await?;

        Ok(repos
            .into_iter()
            .map(|repo| mapper::map_repository(repo, 0))
            .collect())
    }

    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository> {
        let RepoRef { owner, name } = repo;

        let payload: RepositoryPayload = self
            .client
            .get(format!("/repos/{owner}/{name}"), None::<&()>)
            .await?;

        let query = ListQuery {
            state: Some("open"),
            per_page: 100,
            ..Default::default()
        };
        let pulls: Vec<serde_json::Value> = self
            .client
            .get(format!("/repos/{owner}/{name}/pulls"), Some(&query))
            .await?;

        Ok(mapper::map_repository(payload, pulls.len() as u64))
    }

    async fn list_open_issues(&self, repo: &RepoRef, per_page: u8) -> Result<Vec<OpenIssue>> {
        let RepoRef { owner, name } = repo;
        let query = ListQuery {
            state: Some("open"),
            sort: Some("created"),
            direction: Some("desc"),
            per_page,
        };

        let issues: Vec<IssuePayload> = self
            .client
            .get(format!("/repos/{owner}/{name}/issues"), Some(&query))
            .await?;

        Ok(mapper::map_open_issues(issues))
    }

    async fn list_issue_activity(&self, repo: &RepoRef, per_page: u8) -> Result<Vec<Activity>> {
        let RepoRef { owner, name } = repo;
        let issues: Vec<IssuePayload> = self
            .client
            .get(
                format!("/repos/{owner}/{name}/issues"),
                Some(&Self::recent(per_page)),
            )
            .await?;

        Ok(mapper::map_issue_activity(repo, issues))
    }

    async fn list_pull_activity(&self, repo: &RepoRef, per_page: u8) -> Result<Vec<Activity>> {
        let RepoRef { owner, name } = repo;
        let pulls: Vec<PullPayload> = self
            .client
            .get(
                format!("/repos/{owner}/{name}/pulls"),
                Some(&Self::recent(per_page)),
            )
            .await?;

        Ok(mapper::map_pull_activity(repo, pulls))
    }

    async fn list_workflow_activity(
        &self,
        repo: &RepoRef,
        per_page: u8,
    ) -> Result<Vec<Activity>> {
        let RepoRef { owner, name } = repo;
        let query = ListQuery {
            per_page,
            ..Default::default()
        };

        let runs: WorkflowRunsPayload = self
            .client
            .get(format!("/repos/{owner}/{name}/actions/runs"), Some(&query))
            .await?;

        Ok(mapper::map_workflow_activity(repo, runs))
    }

    async fn list_deployments(&self, repo: &RepoRef, per_page: u8) -> Result<Vec<Deployment>> {
        let RepoRef { owner, name } = repo;
        let query = ListQuery {
            per_page,
            ..Default::default()
        };

        let deployments: Vec<DeploymentPayload> = self
            .client
            .get(format!("/repos/{owner}/{name}/deployments"), Some(&query))
            .await?;

        let mut result = Vec::with_capacity(deployments.len());
        for deployment in deployments {
            let statuses_url = format!(
                "/repos/{owner}/{name}/deployments/{}/statuses",
                deployment.id
            );
            let latest = match self
                .client
                .get::<Vec<DeploymentStatusPayload>, _, _>(
                    &statuses_url,
                    Some(&ListQuery {
                        per_page: 1,
                        ..Default::default()
                    }),
                )
                .await
            {
                Ok(statuses) => statuses.into_iter().next(),
                Err(e) => {
                    tracing::debug!(
                        repo = %repo,
                        deployment = deployment.id,
                        error = %e,
                        "Failed to fetch deployment statuses"
                    );
                    None
                }
            };

            result.push(mapper::map_deployment(repo, deployment, latest));
        }

        Ok(result)
    }

    async fn create_deployment(
        &self,
        repo: &RepoRef,
        deployment: &CreateDeployment,
    ) -> Result<Deployment> {
        let RepoRef { owner, name } = repo;
        let body = json!({
            "ref": deployment.git_ref,
            "environment": deployment.environment,
            "description": deployment.description,
            "auto_merge": false,
        });

        let created: DeploymentPayload = self
            .client
            .post(format!("/repos/{owner}/{name}/deployments"), Some(&body))
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to create deployment: {e}")))?;

        Ok(mapper::map_deployment(repo, created, None))
    }

    async fn add_labels(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        labels: &[String],
    ) -> Result<()> {
        self.client
            .issues(&repo.owner, &repo.name)
            .add_labels(issue_number, labels)
            .await?;

        Ok(())
    }

    async fn post_comment(&self, repo: &RepoRef, issue_number: u64, body: &str) -> Result<()> {
        self.client
            .issues(&repo.owner, &repo.name)
            .create_comment(issue_number, body)
            .await?;

        Ok(())
    }

    async fn dispatch_workflow(&self, repo: &RepoRef, dispatch: &WorkflowDispatch) -> Result<()> {
        self.client
            .actions()
            .create_workflow_dispatch(
                &repo.owner,
                &repo.name,
                &dispatch.workflow_id,
                &dispatch.git_ref,
            )
            .inputs(serde_json::Value::Object(dispatch.inputs.clone()))
            .send()
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to dispatch workflow: {e}")))?;

        Ok(())
    }
}
