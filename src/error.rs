//! Error types for givechain

use thiserror::Error;

/// Structural defect found while validating a chain. Carries the index of the
/// offending block so operators can locate tampering in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChainFault {
    #[error("chain is empty")]
    EmptyChain,
    #[error("block {index}: stored hash does not match recomputation")]
    HashMismatch { index: u64 },
    #[error("block {index}: previous_hash does not match predecessor hash")]
    BrokenLink { index: u64 },
    #[error("block {index}: hash does not meet the difficulty target")]
    DifficultyNotMet { index: u64 },
}

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("no pending transactions to mine")]
    EmptyMempool,

    #[error("invalid chain: {0}")]
    InvalidChain(#[from] ChainFault),

    #[error("candidate chain is not longer than the local chain")]
    ChainNotLonger,

    #[error("peer {addr} unreachable: {reason}")]
    PeerUnreachable { addr: String, reason: String },

    /// The chain tip moved while a candidate was being mined (a concurrent
    /// consensus replacement committed first). The sealed block is discarded.
    #[error("sealed block is stale: chain tip moved during the nonce search")]
    StaleCandidate,
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
