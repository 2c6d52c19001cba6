use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{AppError, Result};

/// Admits at most one batch run per work list.
#[derive(Debug, Clone, Default)]
pub struct RunSlot {
    active: Arc<AtomicBool>,
}

impl RunSlot {
    /// Claim the slot, or fail with `BatchInProgress` if a run holds it.
    pub fn try_acquire(&self, work_list: &str) -> Result<RunGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::BatchInProgress(work_list.to_string()))?;

        Ok(RunGuard {
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Releases its slot when dropped, including while unwinding from a panic.
#[derive(Debug)]
pub struct RunGuard {
    active: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}
