//! Block structure and signing serialization.
//!
//! A `Block` doubles as the forging template: the engine receives it with
//! the forging fields zeroed, searches for an eligible (account, timestamp)
//! pair, then finalizes `forger`, `delegated_public_key`, `timestamp`,
//! `staking_amount` and `signature` before handing it upstream.

use alloy_primitives::{keccak256, Address, B256, B512};
use serde::{Deserialize, Serialize};

/// Byte length of the signing serialization.
const SIGNING_LEN: usize = 8 + 32 + 32 + 20 + 32 + 8 + 8;

/// A Kiln block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block height.
    pub height: u64,
    /// Hash of the parent block.
    pub prev_hash: B256,
    /// Merkle root of the block's transactions.
    pub merkle_root: B256,
    /// Public key hash of the staker that forged this block.
    pub forger: Address,
    /// Delegated public key authorized to sign on the forger's behalf.
    pub delegated_public_key: B256,
    /// Timestamp in seconds since the Unix epoch.
    pub timestamp: u64,
    /// Stake the forger proved at this height. Zero at genesis.
    pub staking_amount: u64,
    /// Ed25519 signature by the delegated key.
    pub signature: B512,
}

impl Block {
    /// Create an unsigned template with the forging fields zeroed.
    pub fn new(height: u64, prev_hash: B256, timestamp: u64) -> Self {
        Self {
            height,
            prev_hash,
            merkle_root: B256::ZERO,
            forger: Address::ZERO,
            delegated_public_key: B256::ZERO,
            timestamp,
            staking_amount: 0,
            signature: B512::ZERO,
        }
    }

    /// Byte serialization covered by the block signature.
    pub fn serialize_for_signing(&self) -> Vec<u8> {
        self.forging_serialization(
            self.forger,
            self.delegated_public_key,
            self.timestamp,
            self.staking_amount,
        )
    }

    /// Signing serialization with the forging fields substituted.
    ///
    /// Candidate evaluation goes through here so the shared template is
    /// never mutated while workers are scanning it.
    pub fn forging_serialization(
        &self,
        forger: Address,
        delegated_public_key: B256,
        timestamp: u64,
        staking_amount: u64,
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(SIGNING_LEN);
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(self.prev_hash.as_slice());
        out.extend_from_slice(self.merkle_root.as_slice());
        out.extend_from_slice(forger.as_slice());
        out.extend_from_slice(delegated_public_key.as_slice());
        out.extend_from_slice(&timestamp.to_be_bytes());
        out.extend_from_slice(&staking_amount.to_be_bytes());
        out
    }

    /// Block hash: Keccak256 over the signed serialization.
    pub fn hash(&self) -> B256 {
        let mut bytes = self.serialize_for_signing();
        bytes.extend_from_slice(self.signature.as_slice());
        keccak256(bytes)
    }
}
