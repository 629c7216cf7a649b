//! Stake eligibility kernel.
//!
//! The kernel feeds the block's signing serialization with the candidate
//! staker's identity, stake and timestamp substituted, hashes it with
//! Keccak256 and interprets the digest as a big-endian integer. A digest
//! strictly below the work's target makes the (staker, timestamp) pair
//! eligible to forge. The decision is deterministic and stateless.

use alloy_primitives::{Address, B256, U256};
use kiln_primitives::Block;
use sha3::{Digest, Keccak256};

/// Compute the stake kernel digest for a candidate (staker, timestamp) pair.
///
/// `staking_amount` is the stake available to the staker at the template's
/// height; at genesis it is defined as zero.
pub fn stake_hash(
    template: &Block,
    forger: Address,
    delegated_public_key: B256,
    timestamp: u64,
    staking_amount: u64,
) -> B256 {
    let serialization =
        template.forging_serialization(forger, delegated_public_key, timestamp, staking_amount);

    let mut hasher = Keccak256::new();
    hasher.update(&serialization);
    B256::from_slice(&hasher.finalize())
}

/// Whether a kernel digest beats the target.
pub fn meets_target(hash: &B256, target: &U256) -> bool {
    U256::from_be_bytes(hash.0) < *target
}
