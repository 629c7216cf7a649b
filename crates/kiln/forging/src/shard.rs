//! Uniform distribution of staking accounts across workers.

use std::sync::Arc;

use kiln_wallet::ForgingAccount;

/// Partition `accounts` into `n` round-robin shards.
///
/// Every account costs one oracle call per candidate timestamp, so
/// round-robin keeps shard sizes within one of each other. Accounts with no
/// balance snapshot only participate at height 0; all other heights drop
/// them before distribution.
pub fn shard_accounts(
    accounts: &[Arc<ForgingAccount>],
    n: usize,
    height: u64,
) -> Vec<Vec<Arc<ForgingAccount>>> {
    let n = n.max(1);
    let mut shards = vec![Vec::new(); n];

    let eligible = accounts
        .iter()
        .filter(|a| a.account.is_some() || height == 0);
    for (i, account) in eligible.enumerate() {
        shards[i % n].push(Arc::clone(account));
    }

    shards
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use alloy_primitives::Address;
    use kiln_wallet::{AccountState, DelegatedKeypair};

    fn account(stake: Option<u64>) -> Arc<ForgingAccount> {
        Arc::new(ForgingAccount::new(
            DelegatedKeypair::generate(),
            stake.map(AccountState::new),
        ))
    }

    #[test]
    fn test_round_robin_coverage_and_balance() {
        let accounts: Vec<_> = (0..10).map(|_| account(Some(100))).collect();
        let shards = shard_accounts(&accounts, 4, 1);

        assert_eq!(shards.len(), 4);

        let sizes: Vec<_> = shards.iter().map(|s| s.len()).collect();
        let min = sizes.iter().min().unwrap();
        let max = sizes.iter().max().unwrap();
        assert!(max - min <= 1);

        let mut seen: HashSet<Address> = HashSet::new();
        for shard in &shards {
            for a in shard {
                assert!(seen.insert(a.public_key_hash), "account assigned twice");
            }
        }
        assert_eq!(seen.len(), accounts.len());
    }

    #[test]
    fn test_stateless_accounts_dropped_above_genesis() {
        let accounts = vec![account(Some(100)), account(None), account(Some(50))];

        let shards = shard_accounts(&accounts, 2, 1);
        let total: usize = shards.iter().map(|s| s.len()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_all_accounts_participate_at_genesis() {
        let accounts = vec![account(Some(100)), account(None), account(None)];

        let shards = shard_accounts(&accounts, 2, 0);
        let total: usize = shards.iter().map(|s| s.len()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_zero_workers_clamped_to_one() {
        let accounts = vec![account(Some(100))];
        let shards = shard_accounts(&accounts, 0, 1);
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].len(), 1);
    }
}
