//! Integration tests for peer-chain consensus reconciliation
//!
//! Runs real HTTP listeners on ephemeral ports: canned peers serving fixed
//! chains for the resolver scenarios, and full nodes for the end-to-end
//! notification flow.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use givechain::api::build_router;
use givechain::block::Block;
use givechain::config::Config;
use givechain::ledger::{Ledger, TransactionDraft};
use givechain::node::Node;

const DIFFICULTY: u32 = 1;

fn draft(sender: &str, recipient: &str, amount: f64) -> TransactionDraft {
    TransactionDraft {
        sender: Some(sender.to_string()),
        recipient: Some(recipient.to_string()),
        amount: Some(amount),
        timestamp: None,
    }
}

/// Mine a valid chain of `length` blocks (including genesis) whose
/// donations all go to `recipient`.
fn mined_chain_to(length: usize, recipient: &str) -> Vec<Block> {
    let mut ledger = Ledger::new(DIFFICULTY);
    for i in 1..length {
        ledger
            .admit(draft(&format!("donor-{i}"), recipient, i as f64))
            .unwrap();
        ledger.snapshot_and_seal().unwrap();
    }
    ledger.chain
}

/// Mine a valid chain of `length` blocks (including genesis).
fn mined_chain(length: usize) -> Vec<Block> {
    mined_chain_to(length, "UNICEF")
}

/// Serve a fixed `/chain` response on an ephemeral port; returns the base URL.
async fn spawn_canned_peer(chain: Vec<Block>) -> String {
    let body = json!({ "length": chain.len(), "chain": chain });
    let app = Router::new().route(
        "/chain",
        get(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn test_node(local_chain_length: usize) -> Node {
    let mut config = Config::default();
    config.mining.difficulty = DIFFICULTY;
    let node = Node::new(config);
    {
        let mut ledger = node.ledger.write().await;
        for i in 1..local_chain_length {
            ledger
                .admit(draft(&format!("local-{i}"), "WWF", i as f64))
                .unwrap();
            ledger.snapshot_and_seal().unwrap();
        }
    }
    node
}

#[tokio::test]
async fn resolver_adopts_the_longest_valid_peer_chain() {
    let node = test_node(4).await;
    let shorter = spawn_canned_peer(mined_chain(5)).await;
    let longer = spawn_canned_peer(mined_chain(6)).await;
    {
        let mut peers = node.peers.write().await;
        peers.register(&shorter);
        peers.register(&longer);
    }

    let outcome = node.run_consensus().await;
    assert!(outcome.replaced);
    assert_eq!(outcome.new_length, 6);
    assert_eq!(node.ledger.read().await.chain.len(), 6);
    assert!(node.ledger.read().await.is_valid());
}

#[tokio::test]
async fn resolver_skips_unreachable_peers_and_still_adopts() {
    let node = test_node(3).await;
    let healthy = spawn_canned_peer(mined_chain(5)).await;
    {
        let mut peers = node.peers.write().await;
        // Nothing listens on port 9; the connection fails fast and the peer
        // is skipped without aborting the round.
        peers.register("http://127.0.0.1:9");
        peers.register(&healthy);
    }

    let outcome = node.run_consensus().await;
    assert!(outcome.replaced);
    assert_eq!(outcome.new_length, 5);
}

#[tokio::test]
async fn resolver_rejects_a_longer_but_tampered_peer_chain() {
    let node = test_node(3).await;
    let mut forged = mined_chain(6);
    forged[2].transactions[0].amount = 1_000_000.0;
    let tampering_peer = spawn_canned_peer(forged).await;
    node.peers.write().await.register(&tampering_peer);

    let outcome = node.run_consensus().await;
    assert!(!outcome.replaced);
    assert_eq!(outcome.new_length, 3);
    assert_eq!(node.ledger.read().await.chain.len(), 3);
}

#[tokio::test]
async fn resolver_breaks_ties_toward_the_smallest_peer_address() {
    let node = test_node(1).await;
    // Two distinct valid chains of equal length, both longer than local.
    let chain_x = mined_chain_to(4, "UNICEF");
    let chain_y = mined_chain_to(4, "WWF");
    let addr_x = spawn_canned_peer(chain_x.clone()).await;
    let addr_y = spawn_canned_peer(chain_y.clone()).await;
    {
        let mut peers = node.peers.write().await;
        peers.register(&addr_x);
        peers.register(&addr_y);
    }
    // The registry hands peers over in lexicographic order and equal-length
    // candidates never displace the first winner, so the smaller address
    // decides the adopted tip.
    let expected_tip = if addr_x < addr_y {
        &chain_x.last().unwrap().hash
    } else {
        &chain_y.last().unwrap().hash
    };

    let outcome = node.run_consensus().await;
    assert!(outcome.replaced);
    assert_eq!(outcome.new_length, 4);
    let ledger = node.ledger.read().await;
    assert_eq!(&ledger.latest_block().hash, expected_tip);
    assert!(ledger.is_valid());
}

#[tokio::test]
async fn resolver_ignores_equal_or_shorter_peer_chains() {
    let node = test_node(4).await;
    let equal = spawn_canned_peer(mined_chain(4)).await;
    let shorter = spawn_canned_peer(mined_chain(2)).await;
    {
        let mut peers = node.peers.write().await;
        peers.register(&equal);
        peers.register(&shorter);
    }

    let outcome = node.run_consensus().await;
    assert!(!outcome.replaced);
    assert_eq!(outcome.new_length, 4);
}

/// Spawn a full node serving its API on an ephemeral port.
async fn spawn_full_node() -> (Arc<Node>, String) {
    let mut config = Config::default();
    config.mining.difficulty = DIFFICULTY;
    let node = Arc::new(Node::new(config));
    let app = build_router(node.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (node, format!("http://{addr}"))
}

#[tokio::test]
async fn block_notification_propagates_a_mined_chain_between_nodes() {
    let (node_a, addr_a) = spawn_full_node().await;
    let (node_b, addr_b) = spawn_full_node().await;

    // A knows B (for the notification); B knows A (to pull the chain).
    node_a.peers.write().await.register(&addr_b);
    node_b.peers.write().await.register(&addr_a);

    node_a
        .ledger
        .write()
        .await
        .admit(draft("Alice", "UNICEF", 10.0))
        .unwrap();
    // Mining announces to B; B's /blocks/receive handler runs a full
    // consensus round before responding, so B has caught up once this
    // returns.
    node_a.mine_and_announce().await.unwrap();

    assert_eq!(node_a.ledger.read().await.chain.len(), 2);
    let ledger_b = node_b.ledger.read().await;
    assert_eq!(ledger_b.chain.len(), 2);
    assert!(ledger_b.is_valid());
    assert_eq!(ledger_b.chain[1].transactions[0].sender, "Alice");
}

#[tokio::test]
async fn gossiped_transactions_reach_peer_mempools() {
    let (node_a, _addr_a) = spawn_full_node().await;
    let (node_b, addr_b) = spawn_full_node().await;
    node_a.peers.write().await.register(&addr_b);

    // Submitting through A's API broadcasts to B's /transactions/receive.
    let client = reqwest::Client::new();
    let tx = node_a
        .ledger
        .write()
        .await
        .admit(draft("Alice", "UNICEF", 10.0))
        .unwrap();
    let peers = node_a.peers.read().await.addresses();
    node_a.gossiper.broadcast_transaction(&peers, &tx).await;

    assert_eq!(node_b.ledger.read().await.pending().len(), 1);

    // The duplicate arriving again over HTTP is suppressed.
    let response = client
        .post(format!("{addr_b}/transactions/receive"))
        .json(&tx)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(node_b.ledger.read().await.pending().len(), 1);

    let body: Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("duplicate"));
}
