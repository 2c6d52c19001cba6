use std::future::Future;

use async_trait::async_trait;

use crate::error::Result;

use super::{BatchInput, BatchState, Tally, WorkItem};

/// Error recorded on items that were skipped because their input is blank.
pub const NO_DESCRIPTION: &str = "No description provided";

/// Receives every transition of a batch run.
#[async_trait]
pub trait BatchObserver<I, R>: Send
where
    I: Send + Sync,
    R: Send + Sync,
{
    /// An item changed status (started or settled).
    async fn item_changed(&mut self, index: usize, item: &WorkItem<I, R>);

    /// The run started, an item settled, or the run finished.
    async fn state_changed(&mut self, state: &BatchState);
}

/// Run `process` over `items` strictly in order, one at a time.
///
/// A failing item is recorded with `failure_message` and never stops the
/// run. The observer sees `Running` with the updated progress after every
/// settled item and `Done` at the end.
pub async fn run_batch<I, R, F, Fut, O>(
    work_list: &str,
    items: &mut [WorkItem<I, R>],
    failure_message: &str,
    mut process: F,
    observer: &mut O,
) -> Tally
where
    I: BatchInput + Clone + Send + Sync,
    R: Send + Sync,
    F: FnMut(I) -> Fut + Send,
    Fut: Future<Output = Result<R>> + Send,
    O: BatchObserver<I, R> + ?Sized,
{
    let total = items.len();
    let mut completed = 0;

    tracing::info!(work_list, total, "Batch run started");
    observer.state_changed(&BatchState::running(0, total)).await;

    for (index, item) in items.iter_mut().enumerate() {
        if item.input().is_blank() {
            item.fail(NO_DESCRIPTION);
        } else {
            item.start();
            observer.item_changed(index, item).await;

            match process(item.input().clone()).await {
                Ok(result) => item.complete(result),
                Err(e) => {
                    tracing::warn!(
                        work_list,
                        item = item.id(),
                        error = %e,
                        "Batch item failed"
                    );
                    item.fail(failure_message);
                }
            }
        }

        observer.item_changed(index, item).await;
        completed += 1;
        observer
            .state_changed(&BatchState::running(completed, total))
            .await;
    }

    let tally = Tally::of(items);
    tracing::info!(
        work_list,
        succeeded = tally.succeeded,
        failed = tally.failed,
        "Batch run finished"
    );
    observer.state_changed(&BatchState::Done { tally }).await;

    tally
}
