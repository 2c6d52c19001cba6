use serde::Serialize;
use tokio::sync::RwLock;

use crate::agent::triage::TriageAnalysis;
use crate::audit::{AuditAction, AuditEvent, AuditLog, AuditResult};
use crate::error::Result;
use crate::platform::types::RepoRef;
use crate::platform::Platform;

use super::TriageBoard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied,
    AlreadyApplied,
}

/// Push an analysis to an issue: labels first, then the reply comment.
///
/// Every step is audited. A failure stops the sequence and is returned.
pub async fn apply_analysis(
    platform: &dyn Platform,
    audit: &AuditLog,
    actor: &str,
    repo: &RepoRef,
    issue_number: u64,
    analysis: &TriageAnalysis,
) -> Result<()> {
    let repo_name = repo.full_name();
    let target = format!("#{issue_number}");
    let event = |action| AuditEvent::new(action, actor, repo_name.as_str(), target.as_str());

    let result = async {
        let labels = platform
            .add_labels(repo, issue_number, &analysis.suggested_labels)
            .await;
        audit
            .record(
                event(AuditAction::LabelsAdded).details(analysis.suggested_labels.join(", ")),
                outcome(&labels),
            )
            .await;
        labels?;

        let comment = platform
            .post_comment(repo, issue_number, &analysis.comment)
            .await;
        audit
            .record(event(AuditAction::CommentCreated), outcome(&comment))
            .await;
        comment
    }
    .await;

    if let Err(e) = &result {
        tracing::warn!(repo = %repo, issue = issue_number, error = %e, "Failed to apply triage");
    } else {
        tracing::info!(repo = %repo, issue = issue_number, "Triage applied");
    }

    audit
        .record(
            event(AuditAction::TriageApplied).details(format!(
                "priority {:?}, category {}",
                analysis.priority, analysis.category
            )),
            outcome(&result),
        )
        .await;

    result
}

fn outcome<T>(result: &Result<T>) -> AuditResult {
    if result.is_ok() {
        AuditResult::Success
    } else {
        AuditResult::Failed
    }
}

/// Apply the stored analysis of one issue.
///
/// An issue already applied in this session is left alone so it never gets a
/// second comment. A failed push leaves it eligible for retry.
pub async fn apply_one(
    board: &RwLock<TriageBoard>,
    platform: &dyn Platform,
    audit: &AuditLog,
    actor: &str,
    id: u64,
) -> Result<ApplyOutcome> {
    let (guard, input, analysis) = {
        let locked = board.read().await;
        let item = locked.get(id)?;
        if locked.is_applied(id) {
            return Ok(ApplyOutcome::AlreadyApplied);
        }
        let analysis = locked.analysis(id)?.clone();
        let guard = locked.claim()?;
        (guard, item.input().clone(), analysis)
    };

    apply_analysis(
        platform,
        audit,
        actor,
        &input.repo,
        input.issue.number,
        &analysis,
    )
    .await?;

    board.write().await.mark_applied(id);
    drop(guard);

    Ok(ApplyOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::testing::FakePlatform;
    use crate::triage::tests::{analysis, input};

    async fn analyzed_board() -> RwLock<TriageBoard> {
        let mut board = TriageBoard::default();
        board
            .replace_issues(vec![input(1, "Crash", ""), input(2, "Slow", "")])
            .unwrap();
        board.get_mut(1).unwrap().complete(analysis());
        RwLock::new(board)
    }

    #[tokio::test]
    async fn test_apply_twice_posts_one_comment() {
        let board = analyzed_board().await;
        let platform = FakePlatform::default();
        let audit = AuditLog::default();

        let first = apply_one(&board, &platform, &audit, "octocat", 1).await.unwrap();
        let second = apply_one(&board, &platform, &audit, "octocat", 1).await.unwrap();

        assert_eq!(first, ApplyOutcome::Applied);
        assert_eq!(second, ApplyOutcome::AlreadyApplied);
        assert_eq!(platform.comment_count(), 1);
        assert_eq!(
            *platform.labels.lock().unwrap(),
            vec![("octo/widgets".to_string(), 1, vec!["bug".to_string()])]
        );
        assert!(board.read().await.is_applied(1));
    }

    #[tokio::test]
    async fn test_failed_comment_leaves_issue_retryable() {
        let board = analyzed_board().await;
        let platform = FakePlatform::default();
        let audit = AuditLog::default();

        platform.set_fail_comments(true);
        let err = apply_one(&board, &platform, &audit, "octocat", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GitHubApi(_)));
        assert!(!board.read().await.is_applied(1));

        platform.set_fail_comments(false);
        let outcome = apply_one(&board, &platform, &audit, "octocat", 1).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied);
        assert_eq!(platform.comment_count(), 1);

        let failed = audit.search(Some("comment_created")).await;
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[1].result, AuditResult::Failed);
    }

    #[tokio::test]
    async fn test_failed_labels_skip_comment() {
        let board = analyzed_board().await;
        let platform = FakePlatform::default();
        platform.set_fail_labels(true);

        assert!(apply_one(&board, &platform, &AuditLog::default(), "octocat", 1)
            .await
            .is_err());
        assert_eq!(platform.comment_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_requires_analysis() {
        let board = analyzed_board().await;
        let platform = FakePlatform::default();

        let err = apply_one(&board, &platform, &AuditLog::default(), "octocat", 2)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = apply_one(&board, &platform, &AuditLog::default(), "octocat", 99)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
