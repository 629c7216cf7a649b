//! Kiln Forging Engine
//!
//! This crate searches for a timestamp at which one of the node's staking
//! accounts is eligible to forge the next block, signs the block with the
//! account's delegated key, and hands it upstream.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       KILN FORGING ENGINE                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   ┌─────────────────────────────────────────────────────────┐   │
//! │   │  Work Register                                          │   │
//! │   │  • Current template + target behind an atomic swap      │   │
//! │   │  • The installed Arc doubles as the epoch token         │   │
//! │   └─────────────────────────────────────────────────────────┘   │
//! │                              │                                  │
//! │   ┌─────────────────────────────────────────────────────────┐   │
//! │   │  Timestamp Search (parallel workers)                    │   │
//! │   │  • Accounts sharded round-robin across N workers        │   │
//! │   │  • First committed eligibility hit wins                 │   │
//! │   └─────────────────────────────────────────────────────────┘   │
//! │                              │                                  │
//! │   ┌─────────────────────────────────────────────────────────┐   │
//! │   │  Publishing                                             │   │
//! │   │  • Finalize forger, timestamp, stake; sign; send        │   │
//! │   └─────────────────────────────────────────────────────────┘   │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Replacing the work item pre-empts the current epoch: workers notice the
//! swapped pointer at their next check and exit without reporting.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod engine;
pub mod register;
pub mod shard;
pub mod worker;

pub use engine::{ForgingConfig, ForgingEngine};
pub use register::{ForgingSolution, ForgingWork, WorkRegister};

use alloy_primitives::Address;
use thiserror::Error;

/// Forging errors.
#[derive(Debug, Error)]
pub enum ForgingError {
    /// The wallet failed to load at engine construction.
    #[error("wallet initialization failed: {0}")]
    WalletInit(#[from] kiln_wallet::WalletError),

    /// A solution referenced an account with no balance snapshot above
    /// genesis.
    #[error("no account state for forger {0}")]
    MissingAccountState(Address),

    /// The solution channel receiver was dropped.
    #[error("solution channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ForgingError::MissingAccountState(Address::repeat_byte(1));
        assert!(err.to_string().contains("no account state"));
    }
}
