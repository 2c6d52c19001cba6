//! Cross-repository activity feed and repository overview.

use crate::config::ActivityConfig;
use crate::error::Result;
use crate::platform::types::{Activity, RepoRef};
use crate::platform::Platform;

/// Recent issues, pull requests and workflow runs of the operator's most
/// recently updated repositories, newest first.
///
/// A repository whose sources cannot be fetched is logged and skipped.
pub async fn recent_activity(
    platform: &dyn Platform,
    config: &ActivityConfig,
) -> Result<Vec<Activity>> {
    let repositories = platform.list_user_repos().await?;
    let per_page = u8::try_from(config.per_source).unwrap_or(u8::MAX);

    let mut activities = Vec::new();
    for repository in repositories.iter().take(config.max_repositories) {
        let repo: RepoRef = match repository.full_name.parse() {
            Ok(repo) => repo,
            Err(e) => {
                tracing::warn!(repo = %repository.full_name, error = %e, "Skipping repository");
                continue;
            }
        };

        let (issues, pulls, runs) = tokio::join!(
            platform.list_issue_activity(&repo, per_page),
            platform.list_pull_activity(&repo, per_page),
            platform.list_workflow_activity(&repo, per_page),
        );

        match (issues, pulls, runs) {
            (Ok(issues), Ok(pulls), Ok(runs)) => {
                for source in [issues, pulls, runs] {
                    activities.extend(source.into_iter().take(config.per_source));
                }
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                tracing::warn!(repo = %repo, error = %e, "Failed to fetch activity");
            }
        }
    }

    activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    activities.truncate(config.max_items);
    Ok(activities)
}
