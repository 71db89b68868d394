//! Chain and mempool ownership: transaction admission, mining primitives and
//! whole-chain replacement.
//!
//! A `Ledger` is always constructed with its genesis block in place and the
//! genesis is never removed; the chain only shrinks via `replace_chain`,
//! which swaps in a strictly longer, fully valid candidate wholesale.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::block::{Block, Transaction, GENESIS_PREVIOUS_HASH};
use crate::error::{ChainError, Result};
use crate::miner;
use crate::validator;

/// Fixed genesis timestamp so every node starts from the same block.
const GENESIS_TIMESTAMP: f64 = 0.0;

/// Window within which a gossiped transaction counts as a duplicate.
const DUPLICATE_WINDOW_SECS: f64 = 1.0;

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn unix_time() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// A transaction as it arrives at an ingress boundary (client submission or
/// peer gossip). All fields optional so missing ones are reported as
/// `InvalidTransaction` rather than as a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionDraft {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<f64>,
    pub timestamp: Option<f64>,
}

/// Outcome of a duplicate-aware peer admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerAdmission {
    Accepted,
    Duplicate,
}

/// A mining candidate: the mempool snapshot plus the chain position it
/// extends. Produced under the ledger lock, sealed outside it, committed
/// back under the lock.
#[derive(Debug, Clone)]
pub struct MineCandidate {
    pub index: u64,
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub difficulty: u32,
}

/// Donation totals aggregated over all sealed blocks past genesis.
#[derive(Debug, Clone, Serialize)]
pub struct DonationTotals {
    pub total: f64,
    pub by_recipient: BTreeMap<String, f64>,
}

pub struct Ledger {
    pub chain: Vec<Block>,
    pub difficulty: u32,
    mempool: Vec<Transaction>,
}

impl Ledger {
    /// Create a ledger holding only the genesis block: index 0, the "0"
    /// previous-hash sentinel, a fixed sentinel transaction and nonce 0.
    pub fn new(difficulty: u32) -> Self {
        let genesis = Block::seal(
            0,
            GENESIS_TIMESTAMP,
            vec![Transaction {
                sender: "System".to_string(),
                recipient: "Genesis".to_string(),
                amount: 0.0,
                timestamp: GENESIS_TIMESTAMP,
            }],
            GENESIS_PREVIOUS_HASH.to_string(),
            0,
        );
        info!(hash = %genesis.hash, "genesis block created");
        Ledger {
            chain: vec![genesis],
            difficulty,
            mempool: Vec::new(),
        }
    }

    pub fn latest_block(&self) -> &Block {
        self.chain.last().expect("chain always holds genesis")
    }

    /// Pending transactions in admission (FIFO) order.
    pub fn pending(&self) -> &[Transaction] {
        &self.mempool
    }

    /// Admission timestamp of the oldest pending transaction, if any.
    pub fn oldest_pending_timestamp(&self) -> Option<f64> {
        self.mempool.first().map(|tx| tx.timestamp)
    }

    fn check_draft(draft: &TransactionDraft) -> Result<(String, String, f64)> {
        let sender = draft
            .sender
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ChainError::InvalidTransaction("sender is required".to_string()))?;
        let recipient = draft
            .recipient
            .clone()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ChainError::InvalidTransaction("recipient is required".to_string()))?;
        let amount = draft
            .amount
            .ok_or_else(|| ChainError::InvalidTransaction("amount is required".to_string()))?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ChainError::InvalidTransaction(
                "amount must be a positive number".to_string(),
            ));
        }
        Ok((sender, recipient, amount))
    }

    /// Validate a submitted transaction and append it to the mempool,
    /// assigning a timestamp when the submitter omitted one. The mempool
    /// grows by exactly one entry on success.
    pub fn admit(&mut self, draft: TransactionDraft) -> Result<Transaction> {
        let (sender, recipient, amount) = Self::check_draft(&draft)?;
        let tx = Transaction {
            sender,
            recipient,
            amount,
            timestamp: draft.timestamp.unwrap_or_else(unix_time),
        };
        info!(sender = %tx.sender, recipient = %tx.recipient, amount = tx.amount, "transaction admitted");
        self.mempool.push(tx.clone());
        Ok(tx)
    }

    /// Duplicate-aware admission for transactions arriving via peer gossip.
    /// A pending entry with the same sender, recipient and amount and a
    /// timestamp within one second makes the arrival a no-op, not an error:
    /// the same transaction may reach us along several gossip paths.
    pub fn admit_from_peer(&mut self, draft: TransactionDraft) -> Result<PeerAdmission> {
        let (sender, recipient, amount) = Self::check_draft(&draft)?;
        let tx = Transaction {
            sender,
            recipient,
            amount,
            timestamp: draft.timestamp.unwrap_or_else(unix_time),
        };
        if self
            .mempool
            .iter()
            .any(|pending| pending.is_duplicate_of(&tx, DUPLICATE_WINDOW_SECS))
        {
            info!(sender = %tx.sender, recipient = %tx.recipient, "duplicate gossip transaction ignored");
            return Ok(PeerAdmission::Duplicate);
        }
        self.mempool.push(tx);
        Ok(PeerAdmission::Accepted)
    }

    /// Take an immutable snapshot of the mempool together with the chain
    /// position a sealed block would occupy. Fails on an empty mempool.
    pub fn begin_seal(&self) -> Result<MineCandidate> {
        if self.mempool.is_empty() {
            return Err(ChainError::EmptyMempool);
        }
        Ok(MineCandidate {
            index: self.chain.len() as u64,
            timestamp: unix_time(),
            transactions: self.mempool.clone(),
            previous_hash: self.latest_block().hash.clone(),
            difficulty: self.difficulty,
        })
    }

    /// Append a sealed block and remove exactly the snapshot's transactions
    /// from the mempool. Transactions admitted while the nonce search ran
    /// stay pending. Fails with `StaleCandidate` when the tip moved under the
    /// candidate (a concurrent consensus replacement committed first); the
    /// sealed block is then discarded.
    pub fn commit_sealed(&mut self, block: Block, snapshot: &[Transaction]) -> Result<()> {
        if block.previous_hash != self.latest_block().hash {
            warn!(index = block.index, "discarding stale mined block: tip moved");
            return Err(ChainError::StaleCandidate);
        }
        for mined in snapshot {
            if let Some(pos) = self.mempool.iter().position(|tx| tx == mined) {
                self.mempool.remove(pos);
            }
        }
        info!(index = block.index, hash = %block.hash, "block appended to chain");
        self.chain.push(block);
        Ok(())
    }

    /// Snapshot the mempool, run the proof-of-work search and append the
    /// sealed block, all under one exclusive borrow. This is the synchronous
    /// form; `Node::mine_once` runs the same three steps with the search off
    /// the ledger lock.
    pub fn snapshot_and_seal(&mut self) -> Result<Block> {
        let candidate = self.begin_seal()?;
        let snapshot = candidate.transactions.clone();
        let sealed = miner::seal_with_pow(
            candidate.index,
            candidate.timestamp,
            candidate.transactions,
            candidate.previous_hash,
            candidate.difficulty,
        );
        self.commit_sealed(sealed.clone(), &snapshot)?;
        Ok(sealed)
    }

    /// Swap in `candidate` wholesale when it is strictly longer and fully
    /// valid. Equal-or-shorter candidates are rejected before any validation
    /// runs. The mempool is left untouched: transactions already present in
    /// the adopted chain are not purged and may be mined again (known
    /// consistency gap, accepted).
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<()> {
        if candidate.len() <= self.chain.len() {
            return Err(ChainError::ChainNotLonger);
        }
        validator::validate(&candidate, self.difficulty)?;
        info!(
            old_length = self.chain.len(),
            new_length = candidate.len(),
            "local chain replaced by longer valid candidate"
        );
        self.chain = candidate;
        Ok(())
    }

    /// Self-check of the local chain.
    pub fn is_valid(&self) -> bool {
        validator::validate(&self.chain, self.difficulty).is_ok()
    }

    /// Aggregate donation totals per recipient across every block past
    /// genesis.
    pub fn donation_totals(&self) -> DonationTotals {
        let mut total = 0.0;
        let mut by_recipient: BTreeMap<String, f64> = BTreeMap::new();
        for block in self.chain.iter().skip(1) {
            for tx in &block.transactions {
                total += tx.amount;
                *by_recipient.entry(tx.recipient.clone()).or_insert(0.0) += tx.amount;
            }
        }
        DonationTotals {
            total,
            by_recipient,
        }
    }
}
