//! Kiln forging wallet.
//!
//! Holds the staking accounts a node forges with: the delegated signing key
//! for each account plus a snapshot of its stake. The forging engine takes a
//! read-consistent copy of the account list at the start of every epoch and
//! never mutates the handles it receives.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod account;
pub mod wallet;

pub use account::{AccountState, DelegatedKeypair, ForgingAccount, PendingStake};
pub use wallet::{ForgingWallet, WalletEntry};

use alloy_primitives::Address;
use thiserror::Error;

/// Wallet errors. All of them are fatal at load time.
#[derive(Debug, Error)]
pub enum WalletError {
    /// A stored entry's declared delegated public key does not match the
    /// key derived from its secret.
    #[error("delegated public key mismatch for account {0}")]
    KeyMismatch(Address),
}
