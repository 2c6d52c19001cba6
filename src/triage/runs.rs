use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::agent::triage::TriageAnalysis;
use crate::agent::Assistant;
use crate::audit::AuditLog;
use crate::batch::{
    run_batch, BatchInput, BatchObserver, BatchState, ItemStatus, RunGuard, Tally, WorkItem,
    NO_DESCRIPTION,
};
use crate::error::{AppError, Result};
use crate::platform::types::RepoRef;
use crate::platform::Platform;

use super::apply::apply_analysis;
use super::{TriageBoard, TriageInput, TriageItem, WORK_LIST};

const ANALYSIS_FAILED: &str = "Analysis failed";
const APPLY_FAILED: &str = "Apply failed";

async fn analyze(assistant: &dyn Assistant, input: &TriageInput) -> Result<TriageAnalysis> {
    let repo_name = input.repo.full_name();
    assistant.analyze_issue(&input.context(&repo_name)).await
}

/// Analyze a single issue and store the result on the board.
pub async fn analyze_one(
    board: &RwLock<TriageBoard>,
    assistant: &dyn Assistant,
    id: u64,
) -> Result<TriageAnalysis> {
    let (guard, input) = {
        let mut locked = board.write().await;
        let guard = locked.claim()?;
        let item = locked.get_mut(id)?;
        if item.input().is_blank() {
            item.fail(NO_DESCRIPTION);
            return Err(AppError::Validation(NO_DESCRIPTION.to_string()));
        }
        item.start();
        (guard, item.input().clone())
    };

    let result = analyze(assistant, &input).await;

    let mut locked = board.write().await;
    let item = locked.get_mut(id)?;
    let result = match result {
        Ok(analysis) => {
            item.complete(analysis.clone());
            Ok(analysis)
        }
        Err(e) => {
            tracing::warn!(issue = id, error = %e, "Issue analysis failed");
            item.fail(ANALYSIS_FAILED);
            Err(e)
        }
    };
    drop(guard);

    result
}

impl TriageBoard {
    /// Claim the work list for analyzing every selected issue.
    pub fn begin_bulk_analyze(&mut self) -> Result<AnalyzeRun> {
        let ids: Vec<u64> = self
            .items
            .iter()
            .map(WorkItem::id)
            .filter(|id| self.is_selected(*id))
            .collect();
        if ids.is_empty() {
            return Err(AppError::Validation("No issues selected".to_string()));
        }

        let guard = self.claim()?;
        let mut items = Vec::with_capacity(ids.len());
        for item in self.items.iter_mut().filter(|i| ids.contains(&i.id())) {
            item.reset();
            items.push(item.clone());
        }
        self.state = BatchState::running(0, items.len());

        Ok(AnalyzeRun { guard, items })
    }

    /// Claim the work list for applying every selected, analyzed and not yet
    /// applied issue.
    pub fn begin_bulk_apply(&mut self) -> Result<ApplyRun> {
        let items: Vec<ApplyItem> = self
            .items
            .iter()
            .filter(|item| self.is_selected(item.id()) && !self.is_applied(item.id()))
            .filter_map(|item| {
                item.result().map(|analysis| {
                    WorkItem::new(
                        item.id(),
                        ApplyInput {
                            repo: item.input().repo.clone(),
                            issue_number: item.input().issue.number,
                            analysis: analysis.clone(),
                        },
                    )
                })
            })
            .collect();
        if items.is_empty() {
            return Err(AppError::Validation(
                "No analyzed issues selected".to_string(),
            ));
        }

        let guard = self.claim()?;
        self.state = BatchState::running(0, items.len());

        Ok(ApplyRun { guard, items })
    }
}

/// A claimed bulk analysis. Dropping it releases the work list.
#[derive(Debug)]
pub struct AnalyzeRun {
    guard: RunGuard,
    items: Vec<TriageItem>,
}

impl AnalyzeRun {
    pub async fn execute(
        self,
        board: Arc<RwLock<TriageBoard>>,
        assistant: Arc<dyn Assistant>,
    ) -> Tally {
        let AnalyzeRun { guard, mut items } = self;
        let mut observer = AnalyzeObserver { board };

        let tally = run_batch(
            WORK_LIST,
            &mut items,
            ANALYSIS_FAILED,
            |input: TriageInput| {
                let assistant = Arc::clone(&assistant);
                async move { analyze(assistant.as_ref(), &input).await }
            },
            &mut observer,
        )
        .await;

        drop(guard);
        tally
    }
}

struct AnalyzeObserver {
    board: Arc<RwLock<TriageBoard>>,
}

#[async_trait]
impl BatchObserver<TriageInput, TriageAnalysis> for AnalyzeObserver {
    async fn item_changed(&mut self, _index: usize, item: &TriageItem) {
        if let Ok(slot) = self.board.write().await.get_mut(item.id()) {
            *slot = item.clone();
        }
    }

    async fn state_changed(&mut self, state: &BatchState) {
        self.board.write().await.state = *state;
    }
}

/// What bulk apply pushes for one issue.
#[derive(Debug, Clone)]
pub struct ApplyInput {
    pub repo: RepoRef,
    pub issue_number: u64,
    pub analysis: TriageAnalysis,
}

impl BatchInput for ApplyInput {
    fn is_blank(&self) -> bool {
        false
    }
}

type ApplyItem = WorkItem<ApplyInput, ()>;

/// A claimed bulk apply. Dropping it releases the work list.
#[derive(Debug)]
pub struct ApplyRun {
    guard: RunGuard,
    items: Vec<ApplyItem>,
}

impl ApplyRun {
    /// Push each analysis in order; the selection is cleared afterwards.
    pub async fn execute(
        self,
        board: Arc<RwLock<TriageBoard>>,
        platform: Arc<dyn Platform>,
        audit: Arc<AuditLog>,
        actor: String,
    ) -> Tally {
        let ApplyRun { guard, mut items } = self;
        let mut observer = ApplyObserver {
            board: Arc::clone(&board),
        };

        let tally = run_batch(
            WORK_LIST,
            &mut items,
            APPLY_FAILED,
            |input: ApplyInput| {
                let platform = Arc::clone(&platform);
                let audit = Arc::clone(&audit);
                let actor = actor.clone();
                async move {
                    apply_analysis(
                        platform.as_ref(),
                        &audit,
                        &actor,
                        &input.repo,
                        input.issue_number,
                        &input.analysis,
                    )
                    .await
                }
            },
            &mut observer,
        )
        .await;

        board.write().await.clear_selection();
        drop(guard);
        tally
    }
}

struct ApplyObserver {
    board: Arc<RwLock<TriageBoard>>,
}

#[async_trait]
impl BatchObserver<ApplyInput, ()> for ApplyObserver {
    async fn item_changed(&mut self, _index: usize, item: &ApplyItem) {
        if item.status() == ItemStatus::Complete {
            self.board.write().await.mark_applied(item.id());
        }
    }

    async fn state_changed(&mut self, state: &BatchState) {
        self.board.write().await.state = *state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeAssistant, FakePlatform};
    use crate::triage::tests::{analysis, input};

    fn shared(board: TriageBoard) -> Arc<RwLock<TriageBoard>> {
        Arc::new(RwLock::new(board))
    }

    fn board_with(inputs: Vec<TriageInput>) -> TriageBoard {
        let mut board = TriageBoard::default();
        board.replace_issues(inputs).unwrap();
        board
    }

    #[tokio::test]
    async fn test_analyze_one_stores_analysis() {
        let board = RwLock::new(board_with(vec![input(1, "Crash on save", "")]));
        let assistant = FakeAssistant::default();

        let analysis = analyze_one(&board, &assistant, 1).await.unwrap();

        assert_eq!(analysis.suggested_labels[0], "bug");
        let board = board.read().await;
        assert_eq!(board.get(1).unwrap().status(), ItemStatus::Complete);
        assert_eq!(board.analysis(1).unwrap(), &analysis);
    }

    #[tokio::test]
    async fn test_analyze_one_blank_issue_never_calls_model() {
        let board = RwLock::new(board_with(vec![input(1, "", "  ")]));
        let assistant = FakeAssistant::default();

        let err = analyze_one(&board, &assistant, 1).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(assistant.analyzed().is_empty());
        assert_eq!(board.read().await.get(1).unwrap().error(), Some(NO_DESCRIPTION));
    }

    #[tokio::test]
    async fn test_analyze_one_failure_marks_item() {
        let board = RwLock::new(board_with(vec![input(1, "boom", "")]));
        let assistant = FakeAssistant::failing_on("boom");

        assert!(analyze_one(&board, &assistant, 1).await.is_err());
        assert_eq!(
            board.read().await.get(1).unwrap().error(),
            Some(ANALYSIS_FAILED)
        );
        assert!(analyze_one(&board, &assistant, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_bulk_analyze_requires_selection() {
        let mut board = board_with(vec![input(1, "a", "")]);
        let err = board.begin_bulk_analyze().err().unwrap();
        assert_eq!(err.to_string(), "No issues selected");
    }

    #[tokio::test]
    async fn test_bulk_analyze_runs_selected_issues_in_order() {
        let mut board = board_with(vec![
            input(1, "first", ""),
            input(2, "", ""),
            input(3, "skipped", ""),
            input(4, "boom", ""),
        ]);
        board.toggle_selection(4).unwrap();
        board.toggle_selection(1).unwrap();
        board.toggle_selection(2).unwrap();
        let board = shared(board);
        let assistant = Arc::new(FakeAssistant::failing_on("boom"));

        let run = board.write().await.begin_bulk_analyze().unwrap();
        assert!(matches!(
            board.write().await.begin_bulk_analyze(),
            Err(AppError::BatchInProgress(_))
        ));
        let tally = run
            .execute(Arc::clone(&board), assistant.clone() as Arc<dyn Assistant>)
            .await;

        assert_eq!(tally, Tally { succeeded: 1, failed: 2 });
        assert_eq!(assistant.analyzed(), vec!["first", "boom"]);

        let board = board.read().await;
        assert_eq!(board.get(1).unwrap().status(), ItemStatus::Complete);
        assert_eq!(board.get(2).unwrap().error(), Some(NO_DESCRIPTION));
        assert_eq!(board.get(3).unwrap().status(), ItemStatus::Pending);
        assert_eq!(board.get(4).unwrap().error(), Some(ANALYSIS_FAILED));
        assert_eq!(board.state(), BatchState::Done { tally });
        assert!(board.is_selected(1));
    }

    #[tokio::test]
    async fn test_bulk_apply_skips_unanalyzed_and_applied() {
        let mut board = board_with(vec![
            input(1, "one", ""),
            input(2, "two", ""),
            input(3, "three", ""),
        ]);
        board.get_mut(1).unwrap().complete(analysis());
        board.get_mut(3).unwrap().complete(analysis());
        board.mark_applied(3);
        board.select_all_untriaged();
        board.toggle_selection(3).unwrap();
        let board = shared(board);
        let platform = Arc::new(FakePlatform::default());

        let run = board.write().await.begin_bulk_apply().unwrap();
        let tally = run
            .execute(
                Arc::clone(&board),
                platform.clone() as Arc<dyn Platform>,
                Arc::new(AuditLog::default()),
                "octocat".to_string(),
            )
            .await;

        assert_eq!(tally, Tally { succeeded: 1, failed: 0 });
        assert_eq!(platform.comment_count(), 1);
        let board = board.read().await;
        assert!(board.is_applied(1));
        assert!(!board.is_applied(2));
        assert_eq!(board.snapshot().selected, 0);
    }

    #[tokio::test]
    async fn test_bulk_apply_failure_keeps_issue_unapplied() {
        let mut board = board_with(vec![input(1, "one", "")]);
        board.get_mut(1).unwrap().complete(analysis());
        board.toggle_selection(1).unwrap();
        let board = shared(board);
        let platform = Arc::new(FakePlatform::default());
        platform.set_fail_labels(true);

        let run = board.write().await.begin_bulk_apply().unwrap();
        let tally = run
            .execute(
                Arc::clone(&board),
                platform.clone() as Arc<dyn Platform>,
                Arc::new(AuditLog::default()),
                "octocat".to_string(),
            )
            .await;

        assert_eq!(tally, Tally { succeeded: 0, failed: 1 });
        assert!(!board.read().await.is_applied(1));
    }

    #[tokio::test]
    async fn test_bulk_apply_without_analyzed_selection() {
        let mut board = board_with(vec![input(1, "one", "")]);
        board.toggle_selection(1).unwrap();

        let err = board.begin_bulk_apply().err().unwrap();
        assert_eq!(err.to_string(), "No analyzed issues selected");
    }
}
