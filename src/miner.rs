//! Proof-of-work nonce search.

use crate::block::{Block, Transaction};

/// True when `hash` carries at least `difficulty` leading zero hex characters.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    hash.bytes().take_while(|b| *b == b'0').count() >= difficulty as usize
}

/// Seal a block by brute-force nonce search: start at nonce 0 and recompute
/// the hash until it meets `difficulty`.
///
/// CPU-bound and blocking with no cancellation; once started it runs to
/// completion. Expected trial count is 16^difficulty, so callers should run
/// this off the async runtime (see `Node::mine_once`).
pub fn seal_with_pow(
    index: u64,
    timestamp: f64,
    transactions: Vec<Transaction>,
    previous_hash: String,
    difficulty: u32,
) -> Block {
    let mut block = Block::seal(index, timestamp, transactions, previous_hash, 0);
    while !meets_difficulty(&block.hash, difficulty) {
        block.nonce += 1;
        block.hash = block.compute_hash();
    }
    block
}
