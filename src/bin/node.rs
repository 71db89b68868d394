use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use givechain::api::run_api_server;
use givechain::config::load_config;
use givechain::node::Node;

#[derive(Parser, Debug)]
#[command(name = "givechain-node")]
#[command(about = "A minimal donation-ledger node")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Override the API port from the configuration
    #[arg(long)]
    port: Option<u16>,

    /// Additional peer base URLs to register at startup
    #[arg(long = "peer")]
    peers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = load_config(&args.config)?;
    if let Some(port) = args.port {
        config.network.api_port = port;
    }
    config.network.bootstrap_peers.extend(args.peers);

    let port = config.network.api_port;
    let auto_mine = config.mining.auto_mine;
    let auto_sync = config.sync.auto_sync;

    let node = Node::new(config);
    info!(
        genesis = %node.ledger.read().await.chain[0].hash,
        "givechain node is online"
    );

    if auto_mine {
        let _mine_task = node.spawn_auto_mine();
    }
    if auto_sync {
        let _sync_task = node.spawn_sync();
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    run_api_server(Arc::new(node), addr).await
}
