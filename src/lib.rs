//! givechain - a minimal donation-ledger node
//!
//! An append-only sequence of blocks secured by proof-of-work, a pending
//! transaction mempool, and longest-valid-chain reconciliation across
//! gossiping HTTP peers.
//!
//! # Architecture
//!
//! ## Core Ledger
//! - [`block`] - Block and transaction types, canonical hash serialization
//! - [`ledger`] - Chain and mempool ownership, admission, replacement
//! - [`miner`] - Proof-of-work nonce search
//! - [`validator`] - Structural chain validation
//!
//! ## Consensus & Networking
//! - [`consensus`] - Longest-valid-chain reconciliation with peers
//! - [`gossip`] - Transaction and block fan-out to peers
//! - [`peers`] - Peer address registry
//!
//! ## Integration
//! - [`node`] - Node orchestration and background triggers
//! - [`api`] - REST API server
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod block;
pub mod ledger;
pub mod miner;
pub mod validator;

// ============================================================================
// Consensus & Networking
// ============================================================================
pub mod consensus;
pub mod gossip;
pub mod peers;

// ============================================================================
// Integration
// ============================================================================
pub mod api;
pub mod node;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
