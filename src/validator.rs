//! Structural chain validation.
//!
//! Applied both to the local chain (self-check) and to candidate chains
//! received from peers before adoption. The genesis block is trusted
//! structurally: it is exempt from the linkage and difficulty checks, but the
//! chain must be non-empty.

use crate::block::Block;
use crate::error::ChainFault;
use crate::miner::meets_difficulty;

/// Check the three structural invariants over every non-genesis block:
/// stored hash matches independent recomputation, `previous_hash` links to
/// the predecessor, and the hash meets the difficulty target. Returns the
/// first fault found.
pub fn validate(chain: &[Block], difficulty: u32) -> Result<(), ChainFault> {
    if chain.is_empty() {
        return Err(ChainFault::EmptyChain);
    }

    for i in 1..chain.len() {
        let current = &chain[i];
        let previous = &chain[i - 1];

        if current.hash != current.compute_hash() {
            return Err(ChainFault::HashMismatch {
                index: current.index,
            });
        }
        if current.previous_hash != previous.hash {
            return Err(ChainFault::BrokenLink {
                index: current.index,
            });
        }
        if !meets_difficulty(&current.hash, difficulty) {
            return Err(ChainFault::DifficultyNotMet {
                index: current.index,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Transaction;
    use crate::miner::seal_with_pow;

    const DIFFICULTY: u32 = 1;

    fn tx(n: u64) -> Transaction {
        Transaction {
            sender: format!("donor-{n}"),
            recipient: "UNICEF".to_string(),
            amount: 1.0 + n as f64,
            timestamp: 1_600_000_000.0 + n as f64,
        }
    }

    fn mined_chain(blocks: u64) -> Vec<Block> {
        let mut chain = vec![Block::seal(
            0,
            0.0,
            vec![tx(0)],
            "0".to_string(),
            0,
        )];
        for i in 1..=blocks {
            let prev = chain.last().unwrap().hash.clone();
            chain.push(seal_with_pow(
                i,
                1_600_000_000.0 + i as f64,
                vec![tx(i)],
                prev,
                DIFFICULTY,
            ));
        }
        chain
    }

    #[test]
    fn accepts_a_well_formed_chain() {
        let chain = mined_chain(3);
        assert_eq!(validate(&chain, DIFFICULTY), Ok(()));
    }

    #[test]
    fn rejects_an_empty_chain() {
        assert_eq!(validate(&[], DIFFICULTY), Err(ChainFault::EmptyChain));
    }

    #[test]
    fn genesis_is_exempt_from_link_and_difficulty_checks() {
        // Genesis hash carries no leading zeros and links to the "0"
        // sentinel; a single-block chain must still be valid.
        let chain = mined_chain(0);
        assert_eq!(validate(&chain, DIFFICULTY), Ok(()));
    }

    #[test]
    fn rejects_a_tampered_block_hash() {
        let mut chain = mined_chain(3);
        chain[2].transactions[0].amount = 1_000_000.0;
        assert_eq!(
            validate(&chain, DIFFICULTY),
            Err(ChainFault::HashMismatch { index: 2 })
        );
    }

    #[test]
    fn rejects_a_broken_link() {
        let mut chain = mined_chain(3);
        // Re-seal block 2 against a foreign parent so its own hash is
        // consistent but the link to block 1 is broken.
        chain[2] = seal_with_pow(
            2,
            chain[2].timestamp,
            chain[2].transactions.clone(),
            "deadbeef".to_string(),
            DIFFICULTY,
        );
        assert_eq!(
            validate(&chain, DIFFICULTY),
            Err(ChainFault::BrokenLink { index: 2 })
        );
    }

    #[test]
    fn rejects_unmet_difficulty() {
        let chain = mined_chain(2);
        // The same chain held to a much higher target must fail on the first
        // non-genesis block that misses it.
        let result = validate(&chain, 12);
        assert!(matches!(result, Err(ChainFault::DifficultyNotMet { .. })));
    }
}
