//! REST API server for givechain
//!
//! Exposes the node's operations to clients and peers: transaction
//! submission and gossip receipt, manual mining, consensus triggering, chain
//! retrieval, peer registration and donation statistics.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ChainError;
use crate::ledger::{PeerAdmission, TransactionDraft};
use crate::node::Node;
use crate::peers::PeerRegistry;

/// Placeholder substituted when a donor submits an empty sender field.
pub const ANONYMOUS_SENDER: &str = "Anonymous";

/// Curated charity recipients surfaced to clients.
pub const ORGANIZATIONS: [&str; 5] = [
    "Red Cross",
    "WWF",
    "UNICEF",
    "Greenpeace",
    "Doctors Without Borders",
];

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Chain(ChainError),
    InvalidInput(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Chain(e) => {
                let status = match e {
                    ChainError::InvalidTransaction(_)
                    | ChainError::EmptyMempool
                    | ChainError::InvalidChain(_) => StatusCode::BAD_REQUEST,
                    ChainError::ChainNotLonger | ChainError::StaleCandidate => {
                        StatusCode::CONFLICT
                    }
                    ChainError::PeerUnreachable { .. } => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string())
            }
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::Chain(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
struct RegisterPeerRequest {
    node_address: Option<String>,
}

#[derive(Serialize)]
struct ConsensusResponse {
    message: String,
    replaced: bool,
    length: usize,
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let (blocks, pending, valid) = {
        let ledger = node.ledger.read().await;
        (
            ledger.chain.len(),
            ledger.pending().len(),
            ledger.is_valid(),
        )
    };
    let known_peers = node.peers.read().await.len();
    Json(json!({
        "status": "online",
        "blocks": blocks,
        "pending_transactions": pending,
        "known_peers": known_peers,
        "valid": valid,
    }))
}

async fn get_chain(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let ledger = node.ledger.read().await;
    Json(json!({
        "chain": ledger.chain,
        "length": ledger.chain.len(),
    }))
}

async fn get_organizations() -> impl IntoResponse {
    Json(json!({ "organizations": ORGANIZATIONS }))
}

async fn submit_transaction(
    State(node): State<Arc<Node>>,
    Json(mut draft): Json<TransactionDraft>,
) -> Result<impl IntoResponse, ApiError> {
    // An empty sender is a deliberate anonymous donation, not a bad request.
    // A missing sender field stays missing and is rejected by admission.
    if draft.sender.as_deref() == Some("") {
        draft.sender = Some(ANONYMOUS_SENDER.to_string());
    }
    let tx = node.ledger.write().await.admit(draft)?;

    let peers = node.peers.read().await.addresses();
    node.gossiper.broadcast_transaction(&peers, &tx).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "transaction admitted",
            "transaction": tx,
        })),
    ))
}

async fn receive_transaction(
    State(node): State<Arc<Node>>,
    Json(draft): Json<TransactionDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let admission = node.ledger.write().await.admit_from_peer(draft)?;
    Ok(match admission {
        PeerAdmission::Accepted => (
            StatusCode::CREATED,
            Json(json!({ "message": "transaction admitted" })),
        ),
        PeerAdmission::Duplicate => (
            StatusCode::OK,
            Json(json!({ "message": "duplicate transaction ignored" })),
        ),
    })
}

async fn mine(State(node): State<Arc<Node>>) -> Result<impl IntoResponse, ApiError> {
    info!("manual mining requested");
    let block = node.mine_and_announce().await?;
    Ok(Json(json!({
        "message": "new block sealed",
        "block": block,
    })))
}

async fn trigger_consensus(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let outcome = node.run_consensus().await;
    let message = if outcome.replaced {
        "local chain replaced by a longer peer chain"
    } else {
        "local chain is already the longest; no changes made"
    };
    Json(ConsensusResponse {
        message: message.to_string(),
        replaced: outcome.replaced,
        length: outcome.new_length,
    })
}

async fn receive_block_notification(State(node): State<Arc<Node>>) -> impl IntoResponse {
    info!("block notification received from peer");
    trigger_consensus(State(node)).await
}

async fn register_peer(
    State(node): State<Arc<Node>>,
    Json(req): Json<RegisterPeerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let address = req
        .node_address
        .ok_or_else(|| ApiError::InvalidInput("node_address is required".to_string()))?;
    if !PeerRegistry::is_valid_address(&address) {
        return Err(ApiError::InvalidInput(
            "node_address must start with http:// or https://".to_string(),
        ));
    }

    let mut peers = node.peers.write().await;
    let newly_added = peers.register(&address);
    if newly_added {
        info!(peer = %address, "peer registered");
    }
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "peer registered",
            "total_peers": peers.len(),
            "known_peers": peers.addresses(),
        })),
    ))
}

async fn list_peers(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let peers = node.peers.read().await;
    Json(json!({
        "known_peers": peers.addresses(),
        "total_peers": peers.len(),
    }))
}

async fn stats(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let ledger = node.ledger.read().await;
    let totals = ledger.donation_totals();
    Json(json!({
        "total_donated": totals.total,
        "donations_by_recipient": totals.by_recipient,
        "block_count": ledger.chain.len(),
        "pending_transactions": ledger.pending().len(),
        "chain_valid": ledger.is_valid(),
    }))
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints (also used by tests).
pub fn build_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/chain", get(get_chain))
        .route("/organizations", get(get_organizations))
        .route("/transactions/new", post(submit_transaction))
        .route("/transactions/receive", post(receive_transaction))
        .route("/mine", post(mine))
        .route("/blocks/receive", post(receive_block_notification))
        .route("/consensus", post(trigger_consensus))
        .route("/nodes/register", post(register_peer))
        .route("/nodes/list", get(list_peers))
        .route("/stats", get(stats))
        .with_state(node)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Bind and serve the API until the process exits.
pub async fn run_api_server(
    node: Arc<Node>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(node);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
