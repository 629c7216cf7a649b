//! Staking account handles and delegated keys.

use std::fmt;

use alloy_primitives::{keccak256, Address, B256, B512};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

/// Delegated block-signing key pair.
///
/// A delegated key is separate from the staker's identity key and is
/// authorized to sign blocks on the staker's behalf.
#[derive(Clone)]
pub struct DelegatedKeypair {
    signing: SigningKey,
    public: B256,
}

impl DelegatedKeypair {
    /// Rebuild a keypair from stored secret key bytes.
    pub fn from_secret(secret: &B256) -> Self {
        let signing = SigningKey::from_bytes(&secret.0);
        let public = B256::from_slice(signing.verifying_key().as_bytes());
        Self { signing, public }
    }

    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let signing = SigningKey::generate(&mut rand::rngs::OsRng);
        let public = B256::from_slice(signing.verifying_key().as_bytes());
        Self { signing, public }
    }

    /// Secret key bytes, as persisted by the key store.
    pub fn secret_key(&self) -> B256 {
        B256::from_slice(&self.signing.to_bytes())
    }

    /// The delegated public key.
    pub fn public_key(&self) -> B256 {
        self.public
    }

    /// Public key hash identifying the staker in forged blocks: the last 20
    /// bytes of the Keccak256 of the public key.
    pub fn public_key_hash(&self) -> Address {
        Address::from_slice(&keccak256(self.public.as_slice())[12..])
    }

    /// Sign a message with the delegated key.
    pub fn sign(&self, message: &[u8]) -> B512 {
        B512::from_slice(&self.signing.sign(message).to_bytes())
    }

    /// Verify a signature produced by [`Self::sign`].
    pub fn verify(&self, message: &[u8], signature: &B512) -> bool {
        let signature = Signature::from_bytes(&signature.0);
        self.signing
            .verifying_key()
            .verify_strict(message, &signature)
            .is_ok()
    }

    /// The Ed25519 verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }
}

impl fmt::Debug for DelegatedKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatedKeypair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// A stake entry that activates at a future height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStake {
    /// Amount of stake.
    pub amount: u64,
    /// Height at which the stake becomes available for forging.
    pub activation_height: u64,
}

/// Balance snapshot for a staking account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Stake already active.
    pub delegated_stake: u64,
    /// Stake entries pending activation.
    pub pending: Vec<PendingStake>,
}

impl AccountState {
    /// State with `delegated_stake` active and nothing pending.
    pub fn new(delegated_stake: u64) -> Self {
        Self {
            delegated_stake,
            pending: Vec::new(),
        }
    }

    /// Stake available for forging at `height`: the active stake plus every
    /// pending entry whose activation height has been reached.
    pub fn available_stake_at(&self, height: u64) -> u64 {
        self.pending
            .iter()
            .filter(|p| p.activation_height <= height)
            .fold(self.delegated_stake, |acc, p| acc.saturating_add(p.amount))
    }
}

/// One forging-eligible staking account known to the wallet.
///
/// The engine receives shared handles for each epoch and never mutates
/// them. `account` is absent only for entries whose balance has not been
/// loaded; those participate solely at genesis.
#[derive(Debug, Clone)]
pub struct ForgingAccount {
    /// Public key hash written into forged blocks.
    pub public_key_hash: Address,
    /// Delegated public key written into forged blocks.
    pub delegated_public_key: B256,
    /// Delegated signing key.
    pub delegated_key: DelegatedKeypair,
    /// Balance snapshot, if one has been loaded.
    pub account: Option<AccountState>,
}

impl ForgingAccount {
    /// Build a handle from a delegated keypair.
    pub fn new(delegated_key: DelegatedKeypair, account: Option<AccountState>) -> Self {
        Self {
            public_key_hash: delegated_key.public_key_hash(),
            delegated_public_key: delegated_key.public_key(),
            delegated_key,
            account,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_roundtrip() {
        let key = DelegatedKeypair::generate();
        let restored = DelegatedKeypair::from_secret(&key.secret_key());
        assert_eq!(key.public_key(), restored.public_key());
        assert_eq!(key.public_key_hash(), restored.public_key_hash());
    }

    #[test]
    fn test_sign_verify() {
        let key = DelegatedKeypair::generate();
        let message = b"kiln block";
        let signature = key.sign(message);
        assert!(key.verify(message, &signature));
        assert!(!key.verify(b"other message", &signature));
    }

    #[test]
    fn test_available_stake_respects_activation_height() {
        let state = AccountState {
            delegated_stake: 100,
            pending: vec![
                PendingStake {
                    amount: 50,
                    activation_height: 10,
                },
                PendingStake {
                    amount: 25,
                    activation_height: 20,
                },
            ],
        };

        assert_eq!(state.available_stake_at(5), 100);
        assert_eq!(state.available_stake_at(10), 150);
        assert_eq!(state.available_stake_at(20), 175);
    }
}
