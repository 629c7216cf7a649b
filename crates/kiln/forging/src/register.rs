//! Work register: the single synchronisation point between the coordinator
//! and its workers.
//!
//! The register holds two slots. The work slot carries the current template
//! and target behind an atomic swap; the `Arc` installed there doubles as
//! the epoch token, so workers cancel themselves by comparing the pointer
//! they observed at epoch start against the live one. The solution slot
//! holds the first committed eligibility hit; committing consumes the work
//! slot, which forces every other worker's next token check to fail.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::U256;
use arc_swap::ArcSwapOption;
use kiln_primitives::Block;
use kiln_wallet::ForgingAccount;
use parking_lot::Mutex;

/// One unit of forging work: a block template plus its stake target.
#[derive(Debug)]
pub struct ForgingWork {
    /// The unsigned template for the next block.
    pub template: Block,
    /// Eligibility bound: a stake digest strictly below this value forges.
    pub target: U256,
}

/// A successful eligibility hit.
#[derive(Debug, Clone)]
pub struct ForgingSolution {
    /// Timestamp at which the account is eligible.
    pub timestamp: u64,
    /// The winning account.
    pub account: Arc<ForgingAccount>,
    /// The work item the hit was found against.
    pub work: Arc<ForgingWork>,
}

/// Shared work and solution slots.
///
/// If the solution slot is non-empty, the work slot is empty: solving
/// consumes the work.
#[derive(Default)]
pub struct WorkRegister {
    work: ArcSwapOption<ForgingWork>,
    solution: Mutex<Option<ForgingSolution>>,
}

impl WorkRegister {
    /// Create an empty register.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new work item, discarding any previous solution.
    ///
    /// In-flight workers for the previous item exit at their next token
    /// check, and their late commits are rejected.
    pub fn replace_work(&self, work: ForgingWork) {
        self.solution.lock().take();
        self.work.store(Some(Arc::new(work)));
    }

    /// Clear both slots.
    pub fn clear(&self) {
        self.work.store(None);
        self.solution.lock().take();
    }

    /// Current work item, if any. The returned `Arc` is the epoch token.
    pub fn load_work(&self) -> Option<Arc<ForgingWork>> {
        self.work.load_full()
    }

    /// Whether `token` still identifies the installed work item.
    pub fn is_current(&self, token: &Arc<ForgingWork>) -> bool {
        matches!(&*self.work.load(), Some(current) if Arc::ptr_eq(current, token))
    }

    /// Try to install a solution, consuming the work slot.
    ///
    /// Accepted only if the slot still holds the work the solution was
    /// found against; the first committer wins and later or stale commits
    /// return `false`.
    pub fn commit_solution(&self, solution: ForgingSolution) -> bool {
        let previous = self.work.compare_and_swap(&solution.work, None);
        let accepted = matches!(&*previous, Some(prev) if Arc::ptr_eq(prev, &solution.work));
        if accepted {
            *self.solution.lock() = Some(solution);
        }
        accepted
    }

    /// Consume the solution slot.
    pub fn take_solution(&self) -> Option<ForgingSolution> {
        self.solution.lock().take()
    }
}

impl fmt::Debug for WorkRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkRegister")
            .field("has_work", &self.work.load().is_some())
            .field("has_solution", &self.solution.lock().is_some())
            .finish()
    }
}
