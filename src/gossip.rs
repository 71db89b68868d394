//! Transaction and block gossip to known peers.
//!
//! Fire-and-forget fan-out: a failing peer is logged and skipped, never
//! fatal. Block gossip is a bare notification; the receiving node pulls the
//! chain itself through its consensus round rather than trusting pushed
//! blocks.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::block::Transaction;

pub struct Gossiper {
    client: reqwest::Client,
    peer_timeout: Duration,
}

impl Gossiper {
    pub fn new(peer_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            peer_timeout,
        }
    }

    /// Forward a freshly admitted transaction to every known peer.
    pub async fn broadcast_transaction(&self, peers: &[String], tx: &Transaction) {
        if peers.is_empty() {
            debug!("no known peers; transaction not broadcast");
            return;
        }
        for peer in peers {
            let url = format!("{}/transactions/receive", peer.trim_end_matches('/'));
            match self
                .client
                .post(&url)
                .json(tx)
                .timeout(self.peer_timeout)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    info!(peer = %peer, "transaction forwarded");
                }
                Ok(response) => {
                    warn!(peer = %peer, status = %response.status(), "peer rejected transaction");
                }
                Err(e) => warn!(peer = %peer, error = %e, "transaction broadcast failed"),
            }
        }
    }

    /// Notify every known peer that a new block was sealed. Peers react by
    /// running their own consensus round.
    pub async fn notify_new_block(&self, peers: &[String]) {
        if peers.is_empty() {
            debug!("no known peers; block notification not sent");
            return;
        }
        for peer in peers {
            let url = format!("{}/blocks/receive", peer.trim_end_matches('/'));
            match self
                .client
                .post(&url)
                .json(&serde_json::json!({}))
                .timeout(self.peer_timeout)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    info!(peer = %peer, "block notification sent");
                }
                Ok(response) => {
                    warn!(peer = %peer, status = %response.status(), "block notification rejected");
                }
                Err(e) => warn!(peer = %peer, error = %e, "block notification failed"),
            }
        }
    }
}
