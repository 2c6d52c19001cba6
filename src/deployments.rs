//! Deployments and workflow dispatch across repositories.

use crate::audit::{AuditAction, AuditEvent, AuditLog, AuditResult};
use crate::config::DeploymentsConfig;
use crate::error::Result;
use crate::platform::types::{CreateDeployment, Deployment, RepoRef, WorkflowDispatch};
use crate::platform::Platform;

/// Deployments of the operator's repositories, newest first. Repositories
/// whose deployments cannot be listed contribute nothing.
pub async fn list_all(platform: &dyn Platform, config: &DeploymentsConfig) -> Result<Vec<Deployment>> {
    let repositories = platform.list_user_repos().await?;

    let mut deployments = Vec::new();
    for repository in repositories.iter().take(config.max_repositories) {
        let Ok(repo) = repository.full_name.parse::<RepoRef>() else {
            continue;
        };
        match platform.list_deployments(&repo, config.per_page).await {
            Ok(found) => deployments.extend(found),
            Err(e) => tracing::warn!(repo = %repo, error = %e, "Failed to list deployments"),
        }
    }

    deployments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(deployments)
}

pub async fn create(
    platform: &dyn Platform,
    audit: &AuditLog,
    actor: &str,
    repo: &RepoRef,
    request: &CreateDeployment,
) -> Result<Deployment> {
    let result = platform.create_deployment(repo, request).await;

    let event = AuditEvent::new(
        AuditAction::DeploymentCreated,
        actor,
        repo.full_name(),
        request.environment.as_str(),
    )
    .details(format!("ref {}", request.git_ref));

    match &result {
        Ok(deployment) => {
            tracing::info!(repo = %repo, id = deployment.id, environment = %deployment.environment, "Deployment created");
            audit.record(event, AuditResult::Success).await;
        }
        Err(e) => {
            tracing::warn!(repo = %repo, error = %e, "Deployment failed");
            audit.record(event, AuditResult::Failed).await;
        }
    }

    result
}

pub async fn dispatch_workflow(
    platform: &dyn Platform,
    audit: &AuditLog,
    actor: &str,
    repo: &RepoRef,
    dispatch: &WorkflowDispatch,
) -> Result<()> {
    let result = platform.dispatch_workflow(repo, dispatch).await;

    let event = AuditEvent::new(
        AuditAction::WorkflowDispatched,
        actor,
        repo.full_name(),
        dispatch.workflow_id.as_str(),
    )
    .details(format!("ref {}", dispatch.git_ref));
    let outcome = if result.is_ok() {
        tracing::info!(repo = %repo, workflow = %dispatch.workflow_id, "Workflow dispatched");
        AuditResult::Success
    } else {
        AuditResult::Failed
    };
    audit.record(event, outcome).await;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::types::DeploymentStatus;
    use crate::testing::{deployment, repository, FakePlatform};

    #[tokio::test]
    async fn test_list_all_merges_and_sorts() {
        let platform = FakePlatform::default()
            .with_repo(repository(1, "octo/api", 0))
            .with_repo(repository(2, "octo/down", 0))
            .with_repo(repository(3, "octo/web", 0))
            .with_deployment("octo/api", deployment(1, "octo/api", DeploymentStatus::Success, 5))
            .with_deployment("octo/web", deployment(2, "octo/web", DeploymentStatus::Deploying, 9))
            .failing_repo("octo/down");

        let all = list_all(&platform, &DeploymentsConfig::default()).await.unwrap();

        let ids: Vec<u64> = all.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_create_and_dispatch_are_audited() {
        let platform = FakePlatform::default().failing_repo("octo/down");
        let audit = AuditLog::default();
        let request = CreateDeployment {
            git_ref: "v1.2.0".to_string(),
            environment: "production".to_string(),
            description: None,
        };

        let created = create(&platform, &audit, "octocat", &RepoRef::new("octo", "api"), &request)
            .await
            .unwrap();
        assert_eq!(created.environment, "production");

        let dispatch = WorkflowDispatch {
            workflow_id: "ci.yml".to_string(),
            git_ref: "main".to_string(),
            inputs: Default::default(),
        };
        assert!(
            dispatch_workflow(&platform, &audit, "octocat", &RepoRef::new("octo", "down"), &dispatch)
                .await
                .is_err()
        );

        let entries = audit.search(None).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::WorkflowDispatched);
        assert_eq!(entries[0].result, AuditResult::Failed);
        assert_eq!(entries[1].result, AuditResult::Success);
        assert_eq!(audit.search(Some("v1.2.0")).await.len(), 1);
    }
}
