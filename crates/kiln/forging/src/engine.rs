//! Forging coordinator.
//!
//! The coordinator runs work epochs: it observes the work register, shards
//! the wallet's staking accounts across blocking workers, waits for them to
//! finish, and publishes the committed solution, if any, as a signed block
//! on the outbound channel. Replacing the work item at any point pre-empts
//! the running epoch.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use kiln_primitives::Block;
use kiln_wallet::{ForgingWallet, WalletEntry};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::register::{ForgingSolution, ForgingWork, WorkRegister};
use crate::shard::shard_accounts;
use crate::worker::{scan_shard, SearchWindow};
use crate::ForgingError;

/// Forging engine configuration.
#[derive(Debug, Clone)]
pub struct ForgingConfig {
    /// Worker threads per epoch.
    pub threads: usize,
    /// Seconds between candidate timestamps.
    pub step_secs: u64,
    /// Seconds of timestamp lookahead per epoch.
    pub horizon_secs: u64,
    /// Re-poll interval while no work is installed.
    pub idle_poll: Duration,
}

impl Default for ForgingConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get().max(1),
            step_secs: 1,
            horizon_secs: 300,
            idle_poll: Duration::from_millis(10),
        }
    }
}

impl ForgingConfig {
    /// Config with a specific worker count.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
            ..Default::default()
        }
    }
}

/// The forging engine.
///
/// Owns the wallet, the work register and the outbound solution channel.
/// The chain-tip watcher feeds templates in through [`Self::replace_work`];
/// signed blocks come out of the receiver returned by [`Self::new`].
pub struct ForgingEngine {
    register: WorkRegister,
    wallet: ForgingWallet,
    config: ForgingConfig,
    started: AtomicBool,
    run_id: AtomicU64,
    solution_tx: mpsc::Sender<Block>,
}

impl ForgingEngine {
    /// Build an engine over the given wallet entries.
    ///
    /// Loading validates every delegated key and fails fatally on a bad
    /// entry. Returns the engine plus the receiving end of the solution
    /// channel; the channel holds one block, which rate-limits forging to
    /// the consumer's pace.
    pub fn new(
        entries: Vec<WalletEntry>,
        config: ForgingConfig,
    ) -> Result<(Arc<Self>, mpsc::Receiver<Block>), ForgingError> {
        let wallet = ForgingWallet::load(entries)?;
        let (solution_tx, solution_rx) = mpsc::channel(1);

        info!(
            target: "kiln::forging",
            accounts = wallet.len(),
            "forging engine initialized"
        );

        Ok((
            Arc::new(Self {
                register: WorkRegister::new(),
                wallet,
                config,
                started: AtomicBool::new(false),
                run_id: AtomicU64::new(0),
                solution_tx,
            }),
            solution_rx,
        ))
    }

    /// The wallet backing this engine.
    pub fn wallet(&self) -> &ForgingWallet {
        &self.wallet
    }

    /// Start the coordinator loop with `threads` workers per epoch
    /// (0 = the configured default).
    ///
    /// Idempotent: a second call while running is a no-op. Each start stamps
    /// the loop with a fresh run id, so a loop surviving a quick
    /// stop/start cycle exits instead of racing the new one.
    pub fn start(self: &Arc<Self>, threads: usize) {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let run = self.run_id.fetch_add(1, Ordering::SeqCst) + 1;
        let threads = if threads == 0 {
            self.config.threads
        } else {
            threads
        };

        info!(target: "kiln::forging", threads, "forging started");

        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run(run, threads).await });
    }

    /// Halt the coordinator and drop any installed work and solution.
    ///
    /// Workers exit at their next token check; the loop exits at its next
    /// liveness check.
    pub fn stop(&self) {
        self.register.clear();
        let _ = self
            .started
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst);
        info!(target: "kiln::forging", "forging stopped");
    }

    /// Alias for [`Self::stop`].
    pub fn close(&self) {
        self.stop();
    }

    /// Install a new work item, pre-empting the current epoch.
    pub fn replace_work(&self, template: Block, target: U256) {
        debug!(target: "kiln::forging", height = template.height, "work replaced");
        self.register.replace_work(ForgingWork { template, target });
    }

    /// Clear the current work without stopping the coordinator.
    pub fn stop_workers(&self) {
        self.register.clear();
    }

    fn is_live(&self, run: u64) -> bool {
        self.started.load(Ordering::SeqCst) && self.run_id.load(Ordering::SeqCst) == run
    }

    async fn run(self: Arc<Self>, run: u64, threads: usize) {
        let window = SearchWindow {
            step_secs: self.config.step_secs,
            horizon_secs: self.config.horizon_secs,
        };

        while self.is_live(run) {
            let Some(work) = self.register.load_work() else {
                tokio::time::sleep(self.config.idle_poll).await;
                continue;
            };

            let height = work.template.height;
            let accounts = self.wallet.snapshot();
            let shards = shard_accounts(&accounts, threads, height);

            debug!(
                target: "kiln::forging",
                height,
                accounts = accounts.len(),
                threads,
                "epoch started"
            );

            let mut handles = Vec::with_capacity(shards.len());
            for shard in shards {
                if shard.is_empty() {
                    continue;
                }
                let engine = Arc::clone(&self);
                let work = Arc::clone(&work);
                handles.push(tokio::task::spawn_blocking(move || {
                    scan_shard(&engine.register, &work, &shard, window);
                }));
            }

            if handles.is_empty() {
                // nothing to forge with at this height
                tokio::time::sleep(self.config.idle_poll).await;
                continue;
            }

            for handle in handles {
                if handle.await.is_err() {
                    error!(target: "kiln::forging", height, "worker task failed");
                }
            }

            if let Some(solution) = self.register.take_solution() {
                if let Err(err) = self.publish(solution).await {
                    error!(
                        target: "kiln::forging",
                        height,
                        error = %err,
                        "failed to publish solution"
                    );
                }
            }
        }

        debug!(target: "kiln::forging", "coordinator loop exited");
    }

    /// Finalize and sign the winning template, then hand it upstream.
    async fn publish(&self, solution: ForgingSolution) -> Result<(), ForgingError> {
        let account = &solution.account;
        let mut block = solution.work.template.clone();

        block.forger = account.public_key_hash;
        block.delegated_public_key = account.delegated_public_key;
        block.timestamp = solution.timestamp;
        if block.height > 0 {
            let state = account
                .account
                .as_ref()
                .ok_or(ForgingError::MissingAccountState(account.public_key_hash))?;
            block.staking_amount = state.available_stake_at(block.height);
        }

        block.signature = account.delegated_key.sign(&block.serialize_for_signing());

        info!(
            target: "kiln::forging",
            height = block.height,
            forger = %block.forger,
            timestamp = block.timestamp,
            staking_amount = block.staking_amount,
            "block forged"
        );

        self.solution_tx
            .send(block)
            .await
            .map_err(|_| ForgingError::ChannelClosed)
    }
}
