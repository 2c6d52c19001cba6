//! AI triage of open issues across the operator's repositories.
//!
//! Issues are loaded into a work list, analyzed one by one or in bulk, and the
//! resulting labels and reply are pushed back to GitHub. Which issues have
//! been pushed is tracked for the lifetime of the process only.

pub mod apply;
pub mod runs;

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::agent::triage::{IssueContext, TriageAnalysis};
use crate::batch::{BatchInput, BatchState, ItemStatus, RunGuard, RunSlot, WorkItem};
use crate::config::TriageConfig;
use crate::error::{AppError, Result};
use crate::platform::types::{OpenIssue, RepoRef};
use crate::platform::Platform;

pub use apply::{apply_analysis, apply_one, ApplyOutcome};
pub use runs::{analyze_one, AnalyzeRun, ApplyRun};

const WORK_LIST: &str = "triage";

/// An open issue and the repository it lives in.
#[derive(Debug, Clone, Serialize)]
pub struct TriageInput {
    pub repo: RepoRef,
    pub issue: OpenIssue,
}

impl TriageInput {
    pub fn context<'a>(&'a self, repo_name: &'a str) -> IssueContext<'a> {
        IssueContext {
            title: &self.issue.title,
            body: &self.issue.body,
            repo_name,
        }
    }
}

impl BatchInput for TriageInput {
    fn is_blank(&self) -> bool {
        self.issue.title.trim().is_empty() && self.issue.body.trim().is_empty()
    }
}

pub type TriageItem = WorkItem<TriageInput, TriageAnalysis>;

/// The single-item action offered for an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageAction {
    Analyze,
    Apply,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageRow {
    #[serde(flatten)]
    pub item: TriageItem,
    pub applied: bool,
    pub selected: bool,
    pub action: Option<TriageAction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageSnapshot {
    pub items: Vec<TriageRow>,
    pub selected: usize,
    pub untriaged: usize,
    pub state: BatchState,
}

#[derive(Debug, Default)]
pub struct TriageBoard {
    items: Vec<TriageItem>,
    applied: HashSet<u64>,
    auto_triaging: HashSet<u64>,
    selected: BTreeSet<u64>,
    state: BatchState,
    slot: RunSlot,
}

impl TriageBoard {
    pub fn items(&self) -> &[TriageItem] {
        &self.items
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// True while a run or a single-item action holds the work list.
    pub fn is_busy(&self) -> bool {
        self.slot.is_active()
    }

    pub fn is_applied(&self, id: u64) -> bool {
        self.applied.contains(&id)
    }

    pub fn is_selected(&self, id: u64) -> bool {
        self.selected.contains(&id)
    }

    /// Swap in a freshly fetched issue list.
    ///
    /// The applied set and stored analyses survive a refresh; selections of
    /// issues that are no longer listed are dropped.
    pub fn replace_issues(&mut self, inputs: Vec<TriageInput>) -> Result<usize> {
        if self.slot.is_active() {
            return Err(AppError::BatchInProgress(WORK_LIST.to_string()));
        }

        let mut analyzed: HashMap<u64, TriageItem> = self
            .items
            .drain(..)
            .filter(|item| item.result().is_some())
            .map(|item| (item.id(), item))
            .collect();

        self.items = inputs
            .into_iter()
            .map(|input| match analyzed.remove(&input.issue.id) {
                Some(mut item) => {
                    *item.input_mut() = input;
                    item
                }
                None => WorkItem::new(input.issue.id, input),
            })
            .collect();
        let ids: HashSet<u64> = self.items.iter().map(WorkItem::id).collect();
        self.selected.retain(|id| ids.contains(id));
        self.state = BatchState::Idle;

        Ok(self.items.len())
    }

    fn position(&self, id: u64) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| AppError::NotFound(format!("issue {id}")))
    }

    pub fn get(&self, id: u64) -> Result<&TriageItem> {
        Ok(&self.items[self.position(id)?])
    }

    fn get_mut(&mut self, id: u64) -> Result<&mut TriageItem> {
        let position = self.position(id)?;
        Ok(&mut self.items[position])
    }

    /// The stored analysis of an issue.
    pub fn analysis(&self, id: u64) -> Result<&TriageAnalysis> {
        let item = self.get(id)?;
        item.result().ok_or_else(|| {
            AppError::Validation(format!(
                "Issue #{} has not been analyzed",
                item.input().issue.number
            ))
        })
    }

    /// Flip the selection of one issue; returns whether it is now selected.
    pub fn toggle_selection(&mut self, id: u64) -> Result<bool> {
        self.position(id)?;
        if self.selected.remove(&id) {
            Ok(false)
        } else {
            self.selected.insert(id);
            Ok(true)
        }
    }

    /// Select every issue not yet applied, or clear the selection when it
    /// already is exactly that set. Returns the new selection size.
    pub fn select_all_untriaged(&mut self) -> usize {
        let untriaged: BTreeSet<u64> = self
            .items
            .iter()
            .map(WorkItem::id)
            .filter(|id| !self.applied.contains(id))
            .collect();

        if self.selected == untriaged {
            self.selected.clear();
        } else {
            self.selected = untriaged;
        }
        self.selected.len()
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Selected issues are handled through the bulk actions only.
    pub fn affordance(&self, item: &TriageItem) -> Option<TriageAction> {
        if self.is_selected(item.id()) || self.is_applied(item.id()) {
            None
        } else if item.result().is_some() {
            Some(TriageAction::Apply)
        } else {
            Some(TriageAction::Analyze)
        }
    }

    pub fn snapshot(&self) -> TriageSnapshot {
        let items = self
            .items
            .iter()
            .map(|item| TriageRow {
                item: item.clone(),
                applied: self.is_applied(item.id()),
                selected: self.is_selected(item.id()),
                action: self.affordance(item),
            })
            .collect();

        TriageSnapshot {
            items,
            selected: self.selected.len(),
            untriaged: self
                .items
                .iter()
                .filter(|item| !self.is_applied(item.id()))
                .count(),
            state: self.state,
        }
    }

    fn claim(&self) -> Result<RunGuard> {
        self.slot.try_acquire(WORK_LIST)
    }

    /// Claim an issue for auto-triage. False when it was already applied or
    /// another delivery is handling it.
    pub fn reserve_auto_triage(&mut self, id: u64) -> bool {
        !self.is_applied(id) && self.auto_triaging.insert(id)
    }

    /// Give up an auto-triage claim without applying anything.
    pub fn release_auto_triage(&mut self, id: u64) {
        self.auto_triaging.remove(&id);
    }

    /// Record an analysis pushed outside the work list, e.g. by auto-triage.
    pub fn record_applied(&mut self, id: u64, analysis: TriageAnalysis) {
        if !self.is_busy() {
            if let Ok(item) = self.get_mut(id) {
                item.complete(analysis);
            }
        }
        self.auto_triaging.remove(&id);
        self.mark_applied(id);
    }

    fn mark_applied(&mut self, id: u64) {
        self.applied.insert(id);
    }

    /// Return to idle after a run died outside the per-item scope.
    ///
    /// Does nothing when a newer run already holds the work list.
    pub fn recover(&mut self) {
        if self.is_busy() {
            return;
        }
        for item in &mut self.items {
            if item.status() == ItemStatus::Processing {
                item.reset();
            }
        }
        self.state = BatchState::Idle;
    }
}

/// Open issues of the operator's most recently updated repositories,
/// newest first.
pub async fn fetch_open_issues(
    platform: &dyn Platform,
    config: &TriageConfig,
) -> Result<Vec<TriageInput>> {
    let repositories = platform.list_user_repos().await?;

    let mut inputs = Vec::new();
    for repository in repositories.iter().take(config.max_repositories) {
        let repo: RepoRef = repository.full_name.parse()?;
        let issues = platform
            .list_open_issues(&repo, config.issues_per_page)
            .await?;

        tracing::debug!(repo = %repo, count = issues.len(), "Loaded issues for triage");
        inputs.extend(issues.into_iter().map(|issue| TriageInput {
            repo: repo.clone(),
            issue,
        }));
    }

    inputs.sort_by(|a, b| b.issue.created_at.cmp(&a.issue.created_at));
    Ok(inputs)
}
