//! Sequential batch processing shared by issue triage and template generation.
//!
//! A batch run walks a fixed work list one item at a time, records each
//! item's outcome independently and reports progress after every item.

pub mod guard;
pub mod processor;

use std::future::Future;

use serde::Serialize;

pub use guard::{RunGuard, RunSlot};
pub use processor::{run_batch, BatchObserver, NO_DESCRIPTION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Complete,
    Error,
}

/// Input carried by a work item.
pub trait BatchInput {
    /// Blank inputs are never sent to the external call.
    fn is_blank(&self) -> bool;
}

/// One unit of batch input and its outcome.
///
/// `result` is present iff the status is `Complete`; `error` iff it is `Error`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkItem<I, R> {
    id: u64,
    input: I,
    status: ItemStatus,
    result: Option<R>,
    error: Option<String>,
}

impl<I, R> WorkItem<I, R> {
    pub fn new(id: u64, input: I) -> Self {
        Self {
            id,
            input,
            status: ItemStatus::Pending,
            result: None,
            error: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    /// Edit the input. Resets the item to pending.
    pub fn input_mut(&mut self) -> &mut I {
        self.reset();
        &mut self.input
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn result(&self) -> Option<&R> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.status, ItemStatus::Complete | ItemStatus::Error)
    }

    pub fn reset(&mut self) {
        self.status = ItemStatus::Pending;
        self.result = None;
        self.error = None;
    }

    pub fn start(&mut self) {
        self.status = ItemStatus::Processing;
        self.result = None;
        self.error = None;
    }

    pub fn complete(&mut self, result: R) {
        self.status = ItemStatus::Complete;
        self.result = Some(result);
        self.error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = ItemStatus::Error;
        self.result = None;
        self.error = Some(message.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Tally {
    pub succeeded: usize,
    pub failed: usize,
}

impl Tally {
    pub fn of<I, R>(items: &[WorkItem<I, R>]) -> Self {
        items.iter().fold(Tally::default(), |mut tally, item| {
            match item.status {
                ItemStatus::Complete => tally.succeeded += 1,
                ItemStatus::Error => tally.failed += 1,
                ItemStatus::Pending | ItemStatus::Processing => {}
            }
            tally
        })
    }
}

/// Lifecycle of one batch run: `Idle -> Running -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BatchState {
    #[default]
    Idle,
    Running {
        completed: usize,
        total: usize,
        progress: u8,
    },
    Done {
        tally: Tally,
    },
}

impl BatchState {
    pub fn running(completed: usize, total: usize) -> Self {
        BatchState::Running {
            completed,
            total,
            progress: percent(completed, total),
        }
    }

    /// Aggregate progress; zero outside a run.
    pub fn progress(&self) -> u8 {
        match self {
            BatchState::Running { progress, .. } => *progress,
            BatchState::Idle | BatchState::Done { .. } => 0,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, BatchState::Running { .. })
    }
}

/// Spawn a batch run and watch it. When the run dies outside the per-item
/// scope the failure is logged and `recover` restores the work list.
pub fn spawn_supervised<F, R>(work_list: &'static str, run: F, recover: R)
where
    F: Future<Output = Tally> + Send + 'static,
    R: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(run);
    tokio::spawn(async move {
        if let Err(e) = handle.await {
            tracing::error!(work_list, error = %e, "Batch run failed");
            recover.await;
        }
    });
}

fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_result_and_error_are_exclusive() {
        let mut item: WorkItem<&str, u32> = WorkItem::new(1, "a");
        item.complete(7);
        assert_eq!(item.result(), Some(&7));
        assert!(item.error().is_none());

        item.fail("Generation failed");
        assert!(item.result().is_none());
        assert_eq!(item.error(), Some("Generation failed"));

        item.start();
        assert_eq!(item.status(), ItemStatus::Processing);
        assert!(item.result().is_none() && item.error().is_none());
    }

    #[test]
    fn test_editing_input_resets_item() {
        let mut item: WorkItem<String, u32> = WorkItem::new(1, "a".to_string());
        item.fail("No description provided");
        item.input_mut().push('b');
        assert_eq!(item.status(), ItemStatus::Pending);
        assert_eq!(item.input(), "ab");
    }

    #[test]
    fn test_percent_rounds() {
        assert_eq!(BatchState::running(1, 3).progress(), 33);
        assert_eq!(BatchState::running(2, 3).progress(), 67);
        assert_eq!(BatchState::running(3, 3).progress(), 100);
        assert_eq!(BatchState::running(0, 0).progress(), 0);
    }

    #[test]
    fn test_progress_is_zero_outside_run() {
        assert_eq!(BatchState::Idle.progress(), 0);
        let done = BatchState::Done {
            tally: Tally {
                succeeded: 2,
                failed: 1,
            },
        };
        assert_eq!(done.progress(), 0);
        assert!(!done.is_running());
    }

    #[tokio::test]
    async fn test_supervised_run_recovers_after_panic() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let run = async {
            if Tally::default().failed == 0 {
                panic!("batch blew up");
            }
            Tally::default()
        };

        spawn_supervised("test", run, async move {
            let _ = tx.send(());
        });

        assert!(rx.await.is_ok());
    }
}
