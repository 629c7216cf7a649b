//! Shard scan worker.
//!
//! A worker owns one shard of staking accounts for the duration of an epoch
//! and walks candidate timestamps, asking the eligibility oracle about each
//! (account, timestamp) pair. It terminates on the first committed hit, on
//! cancellation (the register no longer holds the work it started with), or
//! once the search horizon is exhausted. Workers never report errors; a
//! no-solution exit is a benign outcome for the coordinator.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use kiln_consensus::{meets_target, stake_hash};
use kiln_wallet::ForgingAccount;
use tracing::debug;

use crate::register::{ForgingSolution, ForgingWork, WorkRegister};

/// Timestamp search bounds for one epoch.
#[derive(Debug, Clone, Copy)]
pub struct SearchWindow {
    /// Seconds between candidate timestamps.
    pub step_secs: u64,
    /// How far past the starting timestamp the scan may reach.
    pub horizon_secs: u64,
}

/// Seconds since the Unix epoch.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Scan one shard for an eligibility hit.
///
/// Candidate timestamps start at the later of the template's timestamp and
/// the current wall clock, advancing by `step_secs` up to `horizon_secs` of
/// lookahead. The token check between steps bounds cancellation latency to
/// roughly one pass over the shard.
pub fn scan_shard(
    register: &WorkRegister,
    work: &Arc<ForgingWork>,
    shard: &[Arc<ForgingAccount>],
    window: SearchWindow,
) {
    if shard.is_empty() {
        return;
    }

    let template = &work.template;
    let height = template.height;
    let start = template.timestamp.max(unix_now());
    let end = start.saturating_add(window.horizon_secs);
    let step = window.step_secs.max(1);

    let mut timestamp = start;
    while timestamp <= end {
        if !register.is_current(work) {
            debug!(target: "kiln::forging", height, "work replaced, abandoning scan");
            return;
        }

        for account in shard {
            // Stake is defined as zero at genesis; the snapshot is not
            // consulted there.
            let staking_amount = if height == 0 {
                0
            } else {
                match &account.account {
                    Some(state) => state.available_stake_at(height),
                    None => continue,
                }
            };

            let digest = stake_hash(
                template,
                account.public_key_hash,
                account.delegated_public_key,
                timestamp,
                staking_amount,
            );
            if meets_target(&digest, &work.target) {
                if register.commit_solution(ForgingSolution {
                    timestamp,
                    account: Arc::clone(account),
                    work: Arc::clone(work),
                }) {
                    debug!(
                        target: "kiln::forging",
                        height,
                        timestamp,
                        forger = %account.public_key_hash,
                        "eligibility hit committed"
                    );
                }
                // Either we won, or another worker's commit already cleared
                // the work slot; both end this epoch for us.
                return;
            }
        }

        timestamp = match timestamp.checked_add(step) {
            Some(next) => next,
            None => return,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, U256};
    use kiln_primitives::Block;
    use kiln_wallet::{AccountState, DelegatedKeypair};

    fn shard_of(n: usize, stake: u64) -> Vec<Arc<ForgingAccount>> {
        (0..n)
            .map(|_| {
                Arc::new(ForgingAccount::new(
                    DelegatedKeypair::generate(),
                    Some(AccountState::new(stake)),
                ))
            })
            .collect()
    }

    const WINDOW: SearchWindow = SearchWindow {
        step_secs: 1,
        horizon_secs: 2,
    };

    #[test]
    fn test_always_eligible_target_commits() {
        let register = WorkRegister::new();
        register.replace_work(ForgingWork {
            template: Block::new(1, B256::ZERO, 0),
            target: U256::MAX,
        });
        let work = register.load_work().unwrap();
        let shard = shard_of(1, 100);

        scan_shard(&register, &work, &shard, WINDOW);

        let solution = register.take_solution().expect("hit committed");
        assert_eq!(solution.account.public_key_hash, shard[0].public_key_hash);
        assert!(solution.timestamp >= work.template.timestamp);
        assert!(register.load_work().is_none());
    }

    #[test]
    fn test_impossible_target_exhausts_horizon() {
        let register = WorkRegister::new();
        register.replace_work(ForgingWork {
            template: Block::new(1, B256::ZERO, 0),
            target: U256::ZERO,
        });
        let work = register.load_work().unwrap();

        scan_shard(&register, &work, &shard_of(2, 100), WINDOW);

        assert!(register.take_solution().is_none());
        assert!(register.load_work().is_some());
    }

    #[test]
    fn test_cancelled_scan_exits_without_commit() {
        let register = WorkRegister::new();
        register.replace_work(ForgingWork {
            template: Block::new(1, B256::ZERO, 0),
            target: U256::MAX,
        });
        let work = register.load_work().unwrap();

        register.clear();
        scan_shard(&register, &work, &shard_of(1, 100), WINDOW);

        assert!(register.take_solution().is_none());
    }

    #[test]
    fn test_genesis_uses_zero_stake() {
        let register = WorkRegister::new();
        register.replace_work(ForgingWork {
            template: Block::new(0, B256::ZERO, 0),
            target: U256::MAX,
        });
        let work = register.load_work().unwrap();

        // stateless account, eligible only because height is 0
        let shard = vec![Arc::new(ForgingAccount::new(
            DelegatedKeypair::generate(),
            None,
        ))];
        scan_shard(&register, &work, &shard, WINDOW);

        assert!(register.take_solution().is_some());
    }
}
