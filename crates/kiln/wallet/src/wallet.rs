//! Wallet store for forging accounts.

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{AccountState, DelegatedKeypair, ForgingAccount, WalletError};

/// A wallet record as persisted by the key store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEntry {
    /// Ed25519 secret key bytes of the delegated key.
    pub delegated_secret_key: B256,
    /// Declared delegated public key; must match the secret.
    pub delegated_public_key: B256,
    /// Balance snapshot, if one has been loaded for this account.
    pub account: Option<AccountState>,
}

impl WalletEntry {
    /// Entry for an in-memory keypair.
    pub fn new(key: &DelegatedKeypair, account: Option<AccountState>) -> Self {
        Self {
            delegated_secret_key: key.secret_key(),
            delegated_public_key: key.public_key(),
            account,
        }
    }
}

/// The staking accounts a node forges with.
///
/// Reads take a short lock to copy the account handles; the forging engine
/// holds no wallet lock while its workers run.
#[derive(Debug, Default)]
pub struct ForgingWallet {
    accounts: RwLock<Vec<Arc<ForgingAccount>>>,
}

impl ForgingWallet {
    /// Create an empty wallet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a wallet from persisted entries, validating each delegated key.
    pub fn load(entries: impl IntoIterator<Item = WalletEntry>) -> Result<Self, WalletError> {
        let wallet = Self::new();
        for entry in entries {
            wallet.import(entry)?;
        }
        Ok(wallet)
    }

    /// Validate and add an entry. An entry with a known public key hash
    /// replaces the previous one.
    pub fn import(&self, entry: WalletEntry) -> Result<Address, WalletError> {
        let key = DelegatedKeypair::from_secret(&entry.delegated_secret_key);
        if key.public_key() != entry.delegated_public_key {
            return Err(WalletError::KeyMismatch(key.public_key_hash()));
        }

        let account = Arc::new(ForgingAccount::new(key, entry.account));
        let public_key_hash = account.public_key_hash;

        let mut accounts = self.accounts.write();
        match accounts
            .iter_mut()
            .find(|a| a.public_key_hash == public_key_hash)
        {
            Some(slot) => *slot = account,
            None => accounts.push(account),
        }
        Ok(public_key_hash)
    }

    /// Remove an account. Returns whether it existed.
    pub fn remove(&self, address: &Address) -> bool {
        let mut accounts = self.accounts.write();
        let before = accounts.len();
        accounts.retain(|a| a.public_key_hash != *address);
        accounts.len() != before
    }

    /// Replace an account's balance snapshot.
    ///
    /// The handle is swapped wholesale so epochs already running keep the
    /// snapshot they started with.
    pub fn set_account_state(&self, address: &Address, state: AccountState) -> bool {
        let mut accounts = self.accounts.write();
        match accounts.iter_mut().find(|a| a.public_key_hash == *address) {
            Some(slot) => {
                let mut updated = (**slot).clone();
                updated.account = Some(state);
                *slot = Arc::new(updated);
                true
            }
            None => false,
        }
    }

    /// A read-consistent copy of the account handles.
    pub fn snapshot(&self) -> Vec<Arc<ForgingAccount>> {
        self.accounts.read().clone()
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    /// Whether the wallet holds no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_validates_keys() {
        let key = DelegatedKeypair::generate();
        let wallet =
            ForgingWallet::load(vec![WalletEntry::new(&key, Some(AccountState::new(10)))])
                .unwrap();
        assert_eq!(wallet.len(), 1);

        let mut bad = WalletEntry::new(&key, None);
        bad.delegated_public_key = B256::repeat_byte(0xAB);
        assert!(matches!(
            ForgingWallet::load(vec![bad]),
            Err(WalletError::KeyMismatch(_))
        ));
    }

    #[test]
    fn test_import_replaces_existing_entry() {
        let key = DelegatedKeypair::generate();
        let wallet = ForgingWallet::new();

        wallet
            .import(WalletEntry::new(&key, Some(AccountState::new(10))))
            .unwrap();
        wallet
            .import(WalletEntry::new(&key, Some(AccountState::new(99))))
            .unwrap();

        assert_eq!(wallet.len(), 1);
        let snapshot = wallet.snapshot();
        assert_eq!(
            snapshot[0].account.as_ref().map(|s| s.delegated_stake),
            Some(99)
        );
    }

    #[test]
    fn test_remove() {
        let key = DelegatedKeypair::generate();
        let wallet = ForgingWallet::new();
        let address = wallet.import(WalletEntry::new(&key, None)).unwrap();

        assert!(wallet.remove(&address));
        assert!(!wallet.remove(&address));
        assert!(wallet.is_empty());
    }

    #[test]
    fn test_set_account_state_preserves_running_snapshots() {
        let key = DelegatedKeypair::generate();
        let wallet = ForgingWallet::new();
        let address = wallet
            .import(WalletEntry::new(&key, Some(AccountState::new(10))))
            .unwrap();

        let epoch_snapshot = wallet.snapshot();
        assert!(wallet.set_account_state(&address, AccountState::new(500)));

        assert_eq!(
            epoch_snapshot[0].account.as_ref().map(|s| s.delegated_stake),
            Some(10)
        );
        assert_eq!(
            wallet.snapshot()[0].account.as_ref().map(|s| s.delegated_stake),
            Some(500)
        );
    }
}
