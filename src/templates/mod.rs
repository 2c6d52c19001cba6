//! Batch issue-template generation.
//!
//! The operator builds a work list of short descriptions (row by row or from
//! quick-entry text), runs it through the generator, then copies or opens
//! each resulting template.

pub mod export;
pub mod parse;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::agent::template::{IssueTemplate, IssueType, TemplateRequest};
use crate::agent::Assistant;
use crate::batch::{run_batch, BatchObserver, BatchState, RunGuard, RunSlot, Tally, WorkItem};
use crate::error::{AppError, Result};
use crate::platform::types::RepoRef;

pub use parse::TemplateInput;

const WORK_LIST: &str = "templates";
const GENERATION_FAILED: &str = "Generation failed";

pub type TemplateItem = WorkItem<TemplateInput, IssueTemplate>;

/// Partial edit of one row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RowUpdate {
    pub issue_type: Option<IssueType>,
    pub description: Option<String>,
}

/// Serializable view of the board.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSnapshot {
    pub items: Vec<TemplateItem>,
    pub repo: Option<String>,
    pub state: BatchState,
}

#[derive(Debug)]
pub struct TemplateBoard {
    items: Vec<TemplateItem>,
    repo: Option<String>,
    state: BatchState,
    slot: RunSlot,
}

impl Default for TemplateBoard {
    fn default() -> Self {
        Self {
            items: vec![blank_row(1)],
            repo: None,
            state: BatchState::Idle,
            slot: RunSlot::default(),
        }
    }
}

fn blank_row(id: u64) -> TemplateItem {
    WorkItem::new(id, TemplateInput::new(IssueType::Bug, ""))
}

impl TemplateBoard {
    pub fn items(&self) -> &[TemplateItem] {
        &self.items
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.slot.is_active()
    }

    pub fn repo(&self) -> Option<&str> {
        self.repo.as_deref()
    }

    pub fn snapshot(&self) -> TemplateSnapshot {
        TemplateSnapshot {
            items: self.items.clone(),
            repo: self.repo.clone(),
            state: self.state,
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.slot.is_active() {
            return Err(AppError::BatchInProgress(WORK_LIST.to_string()));
        }
        Ok(())
    }

    /// Target repository for generated templates (`owner/name`).
    pub fn set_repo(&mut self, repo: Option<String>) -> Result<()> {
        self.ensure_idle()?;
        if let Some(repo) = repo.as_deref() {
            repo.parse::<RepoRef>()?;
        }
        self.repo = repo;
        Ok(())
    }

    /// Replace the work list with the rows parsed from quick-entry text.
    pub fn load_quick_input(&mut self, text: &str) -> Result<usize> {
        self.ensure_idle()?;

        let inputs = parse::parse_quick_input(text);
        if inputs.is_empty() {
            return Err(AppError::Validation(
                "No issues found in the quick-entry text".to_string(),
            ));
        }

        self.items = inputs
            .into_iter()
            .zip(1..)
            .map(|(input, id)| WorkItem::new(id, input))
            .collect();
        self.state = BatchState::Idle;

        tracing::info!(count = self.items.len(), "Parsed quick-entry issues");
        Ok(self.items.len())
    }

    pub fn add_row(&mut self) -> Result<u64> {
        self.ensure_idle()?;
        let id = self.items.iter().map(WorkItem::id).max().unwrap_or(0) + 1;
        self.items.push(blank_row(id));
        Ok(id)
    }

    pub fn remove_row(&mut self, id: u64) -> Result<()> {
        self.ensure_idle()?;
        let position = self.position(id)?;
        if self.items.len() == 1 {
            return Err(AppError::Validation(
                "At least one issue is required".to_string(),
            ));
        }
        self.items.remove(position);
        Ok(())
    }

    pub fn update_row(&mut self, id: u64, update: RowUpdate) -> Result<&TemplateItem> {
        self.ensure_idle()?;
        let position = self.position(id)?;
        let item = &mut self.items[position];

        if update.issue_type.is_some() || update.description.is_some() {
            let input = item.input_mut();
            if let Some(issue_type) = update.issue_type {
                input.issue_type = issue_type;
            }
            if let Some(description) = update.description {
                input.description = description;
            }
        }

        Ok(&self.items[position])
    }

    /// Back to a single blank row.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.items = vec![blank_row(1)];
        self.repo = None;
        self.state = BatchState::Idle;
        Ok(())
    }

    fn position(&self, id: u64) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| AppError::NotFound(format!("template row {id}")))
    }

    /// The generated template of a completed row.
    pub fn template(&self, id: u64) -> Result<&IssueTemplate> {
        let item = &self.items[self.position(id)?];
        item.result().ok_or_else(|| {
            AppError::Validation(format!("Template {id} has not been generated"))
        })
    }

    pub fn completed_templates(&self) -> impl Iterator<Item = &IssueTemplate> {
        self.items.iter().filter_map(WorkItem::result)
    }

    /// Validate the work list and claim the run slot.
    ///
    /// Refused without any network call when every description is blank.
    pub fn begin_run(&mut self) -> Result<TemplateRun> {
        self.ensure_idle()?;

        let inputs: Vec<TemplateInput> = self.items.iter().map(|i| i.input().clone()).collect();
        if !parse::has_any_description(&inputs) {
            return Err(AppError::Validation(
                "Please provide at least one issue description".to_string(),
            ));
        }

        let guard = self.slot.try_acquire(WORK_LIST)?;
        for item in &mut self.items {
            item.reset();
        }
        self.state = BatchState::running(0, self.items.len());

        Ok(TemplateRun {
            guard,
            items: self.items.clone(),
            repo: self.repo.clone(),
        })
    }

    fn apply_item(&mut self, item: &TemplateItem) {
        if let Some(slot) = self.items.iter_mut().find(|i| i.id() == item.id()) {
            *slot = item.clone();
        }
    }

    /// Return to idle after a run died outside the per-item scope.
    ///
    /// Does nothing when a newer run already holds the work list.
    pub fn recover(&mut self) {
        if self.is_busy() {
            return;
        }
        for item in &mut self.items {
            if !item.is_settled() {
                item.reset();
            }
        }
        self.state = BatchState::Idle;
    }
}

/// A claimed, validated run. Dropping it releases the run slot.
#[derive(Debug)]
pub struct TemplateRun {
    guard: RunGuard,
    items: Vec<TemplateItem>,
    repo: Option<String>,
}

impl TemplateRun {
    /// Generate every row in order, mirroring each transition onto `board`.
    pub async fn execute(
        self,
        board: Arc<RwLock<TemplateBoard>>,
        assistant: Arc<dyn Assistant>,
    ) -> Tally {
        let TemplateRun {
            guard,
            mut items,
            repo,
        } = self;

        let mut observer = BoardObserver { board };
        let tally = run_batch(
            WORK_LIST,
            &mut items,
            GENERATION_FAILED,
            |input: TemplateInput| {
                let assistant = Arc::clone(&assistant);
                let repo = repo.clone();
                async move {
                    assistant
                        .generate_template(&TemplateRequest {
                            issue_type: input.issue_type,
                            description: input.description.trim(),
                            context: None,
                            repo_name: repo.as_deref(),
                        })
                        .await
                }
            },
            &mut observer,
        )
        .await;

        drop(guard);
        tally
    }
}

struct BoardObserver {
    board: Arc<RwLock<TemplateBoard>>,
}

#[async_trait]
impl BatchObserver<TemplateInput, IssueTemplate> for BoardObserver {
    async fn item_changed(&mut self, _index: usize, item: &TemplateItem) {
        self.board.write().await.apply_item(item);
    }

    async fn state_changed(&mut self, state: &BatchState) {
        self.board.write().await.state = *state;
    }
}
