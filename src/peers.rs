//! Peer address registry.
//!
//! A plain set of peer base URLs with no health-checking. The set is kept
//! sorted so every scan iterates in lexicographic address order, which makes
//! the longest-chain tie-break in consensus deterministic: among peers
//! reporting equally long valid chains, the lexicographically smallest
//! address wins.

use std::collections::BTreeSet;

#[derive(Debug, Default, Clone)]
pub struct PeerRegistry {
    peers: BTreeSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `address` looks like a usable peer base URL.
    pub fn is_valid_address(address: &str) -> bool {
        address.starts_with("http://") || address.starts_with("https://")
    }

    /// Add a peer. Returns false when the address was already known.
    pub fn register(&mut self, address: &str) -> bool {
        self.peers.insert(address.trim_end_matches('/').to_string())
    }

    /// All known peer addresses in lexicographic order.
    pub fn addresses(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
