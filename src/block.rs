//! Block and transaction types plus the canonical hash serialization.
//!
//! The hash input is a compact JSON object whose keys appear in fixed
//! lexicographic order: `index`, `nonce`, `previous_hash`, `timestamp`,
//! `transactions`, with each transaction rendered as `amount`, `recipient`,
//! `sender`, `timestamp`. This ordering is a cross-node contract: every node
//! must serialize numbers and strings identically or chain validation between
//! peers silently breaks. Do not change it.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

/// Sentinel `previous_hash` carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A donation moving from `sender` to `recipient`. Immutable once admitted to
/// the mempool; the ledger assigns `timestamp` when the submitter omits one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
    pub timestamp: f64,
}

impl Transaction {
    /// True when `other` carries the same sender, recipient and amount and a
    /// timestamp within `window_secs`. Used for gossip duplicate suppression:
    /// the same transaction may arrive via multiple peer paths.
    pub fn is_duplicate_of(&self, other: &Transaction, window_secs: f64) -> bool {
        self.sender == other.sender
            && self.recipient == other.recipient
            && self.amount == other.amount
            && (self.timestamp - other.timestamp).abs() < window_secs
    }
}

/// A sealed unit of ledger data. The serialized form of this struct is also
/// the wire record exchanged between nodes: exactly these six fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub nonce: u64,
    pub hash: String,
}

impl Block {
    /// Seal a block from its five content fields, computing the stored hash.
    pub fn seal(
        index: u64,
        timestamp: f64,
        transactions: Vec<Transaction>,
        previous_hash: String,
        nonce: u64,
    ) -> Self {
        let mut block = Block {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Canonical serialization of the five hashed fields. Keys are inserted
    /// in lexicographic order so the output is stable regardless of the
    /// underlying JSON map implementation.
    pub fn canonical_payload(&self) -> String {
        let transactions: Vec<serde_json::Value> = self
            .transactions
            .iter()
            .map(|tx| {
                json!({
                    "amount": tx.amount,
                    "recipient": tx.recipient,
                    "sender": tx.sender,
                    "timestamp": tx.timestamp,
                })
            })
            .collect();

        json!({
            "index": self.index,
            "nonce": self.nonce,
            "previous_hash": self.previous_hash,
            "timestamp": self.timestamp,
            "transactions": transactions,
        })
        .to_string()
    }

    /// Recompute the SHA-256 digest of the canonical payload as lowercase
    /// hex. Pure and deterministic; the stored `hash` field never feeds back
    /// into the digest.
    pub fn compute_hash(&self) -> String {
        hex::encode(Sha256::digest(self.canonical_payload().as_bytes()))
    }
}
