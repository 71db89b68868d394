//! Node orchestration: shared ledger state, the mining worker and the two
//! background triggers (auto-mine and periodic consensus sync).
//!
//! All chain and mempool mutations go through one `Arc<RwLock<Ledger>>`;
//! every mutating operation takes the write lock, so admits, mining commits
//! and consensus replacements are mutually exclusive. The unbounded
//! proof-of-work search itself runs on a blocking thread without the lock
//! held (see `mine_once`).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::block::Block;
use crate::config::Config;
use crate::consensus::{ConsensusResolver, ResolveOutcome};
use crate::error::{ChainError, Result};
use crate::gossip::Gossiper;
use crate::ledger::{unix_time, Ledger};
use crate::miner;
use crate::peers::PeerRegistry;

/// True when the mempool state warrants an automatic mining run: enough
/// pending transactions, or the oldest one waiting too long.
pub fn should_auto_mine(
    pending: usize,
    oldest_timestamp: Option<f64>,
    now: f64,
    threshold: usize,
    max_age_secs: u64,
) -> bool {
    if pending >= threshold {
        return true;
    }
    match oldest_timestamp {
        Some(ts) => now - ts >= max_age_secs as f64,
        None => false,
    }
}

#[derive(Clone)]
pub struct Node {
    pub config: Arc<Config>,
    pub ledger: Arc<RwLock<Ledger>>,
    pub peers: Arc<RwLock<PeerRegistry>>,
    pub resolver: Arc<ConsensusResolver>,
    pub gossiper: Arc<Gossiper>,
    /// Serializes miners: one candidate at a time per ledger instance.
    mining_slot: Arc<Mutex<()>>,
}

impl Node {
    pub fn new(config: Config) -> Self {
        let peer_timeout = Duration::from_secs(config.sync.peer_timeout_secs);
        let mut peers = PeerRegistry::new();
        for peer in &config.network.bootstrap_peers {
            peers.register(peer);
        }
        info!(
            difficulty = config.mining.difficulty,
            bootstrap_peers = peers.len(),
            "node initialized"
        );

        Self {
            ledger: Arc::new(RwLock::new(Ledger::new(config.mining.difficulty))),
            peers: Arc::new(RwLock::new(peers)),
            resolver: Arc::new(ConsensusResolver::new(peer_timeout)),
            gossiper: Arc::new(Gossiper::new(peer_timeout)),
            config: Arc::new(config),
            mining_slot: Arc::new(Mutex::new(())),
        }
    }

    /// Mine one block from the current mempool. The caller blocks until the
    /// nonce search completes; the search has no cancellation.
    ///
    /// The mempool snapshot is taken under the ledger lock, the search runs
    /// on a blocking thread without it, and the commit re-takes the lock and
    /// removes exactly the snapshot's transactions. Concurrent mine calls
    /// queue on the mining slot instead of racing on index/previous_hash.
    pub async fn mine_once(&self) -> Result<Block> {
        let _slot = self.mining_slot.lock().await;

        let candidate = self.ledger.read().await.begin_seal()?;
        let snapshot = candidate.transactions.clone();
        info!(
            index = candidate.index,
            transactions = snapshot.len(),
            "mining started"
        );

        let started = std::time::Instant::now();
        let sealed = tokio::task::spawn_blocking(move || {
            miner::seal_with_pow(
                candidate.index,
                candidate.timestamp,
                candidate.transactions,
                candidate.previous_hash,
                candidate.difficulty,
            )
        })
        .await
        .expect("proof-of-work task panicked");
        info!(
            index = sealed.index,
            nonce = sealed.nonce,
            elapsed_ms = started.elapsed().as_millis() as u64,
            hash = %sealed.hash,
            "block sealed"
        );

        self.ledger
            .write()
            .await
            .commit_sealed(sealed.clone(), &snapshot)?;
        Ok(sealed)
    }

    /// Mine one block and notify peers on success.
    pub async fn mine_and_announce(&self) -> Result<Block> {
        let block = self.mine_once().await?;
        let peers = self.peers.read().await.addresses();
        self.gossiper.notify_new_block(&peers).await;
        Ok(block)
    }

    /// Run one consensus round against all known peers.
    pub async fn run_consensus(&self) -> ResolveOutcome {
        let peers = self.peers.read().await.addresses();
        self.resolver.resolve(&peers, &self.ledger).await
    }

    /// Background trigger: periodically checks the mempool size and oldest
    /// pending age and mines when either threshold is crossed.
    pub fn spawn_auto_mine(&self) -> JoinHandle<()> {
        let node = self.clone();
        let mining = self.config.mining.clone();
        info!("auto-mine trigger started");
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(mining.poll_secs)).await;

                let (pending, oldest) = {
                    let ledger = node.ledger.read().await;
                    (ledger.pending().len(), ledger.oldest_pending_timestamp())
                };
                if !should_auto_mine(
                    pending,
                    oldest,
                    unix_time(),
                    mining.mempool_threshold,
                    mining.max_pending_age_secs,
                ) {
                    continue;
                }

                info!(pending, "auto-mine trigger fired");
                match node.mine_and_announce().await {
                    Ok(block) => info!(index = block.index, "auto-mined block"),
                    // The mempool can drain or the tip can move between the
                    // check and the commit; both are benign here.
                    Err(ChainError::EmptyMempool) | Err(ChainError::StaleCandidate) => {}
                    Err(e) => warn!(error = %e, "auto-mine failed"),
                }
            }
        })
    }

    /// Background trigger: periodic consensus sync with known peers.
    pub fn spawn_sync(&self) -> JoinHandle<()> {
        let node = self.clone();
        let sync = self.config.sync.clone();
        info!("consensus sync trigger started");
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(sync.initial_delay_secs)).await;
            loop {
                let outcome = node.run_consensus().await;
                info!(
                    replaced = outcome.replaced,
                    length = outcome.new_length,
                    "periodic consensus round finished"
                );
                tokio::time::sleep(Duration::from_secs(sync.interval_secs)).await;
            }
        })
    }
}
