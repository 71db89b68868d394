//! Configuration management for givechain

use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MiningConfig {
    /// Required count of leading zero hex characters in a block hash.
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    /// Mempool size that triggers an automatic mining run.
    #[serde(default = "default_mempool_threshold")]
    pub mempool_threshold: usize,
    /// Oldest-pending-transaction age that triggers an automatic mining run.
    #[serde(default = "default_max_pending_age_secs")]
    pub max_pending_age_secs: u64,
    /// How often the auto-mine trigger re-checks its conditions.
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
    #[serde(default = "default_auto_mine")]
    pub auto_mine: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Interval between periodic consensus rounds.
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,
    /// Delay before the first periodic consensus round.
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
    /// Per-peer timeout for chain fetches and gossip calls.
    #[serde(default = "default_peer_timeout_secs")]
    pub peer_timeout_secs: u64,
    #[serde(default = "default_auto_sync")]
    pub auto_sync: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            bootstrap_peers: Vec::new(),
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            mempool_threshold: default_mempool_threshold(),
            max_pending_age_secs: default_max_pending_age_secs(),
            poll_secs: default_poll_secs(),
            auto_mine: default_auto_mine(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval_secs(),
            initial_delay_secs: default_initial_delay_secs(),
            peer_timeout_secs: default_peer_timeout_secs(),
            auto_sync: default_auto_sync(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            mining: MiningConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

/// Load configuration from a TOML file, falling back to defaults when the
/// file is absent or empty.
pub fn load_config(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)?
    };

    // Validate critical values
    if config.mining.difficulty == 0 {
        return Err("mining.difficulty must be a positive integer".into());
    }
    for peer in &config.network.bootstrap_peers {
        if !crate::peers::PeerRegistry::is_valid_address(peer) {
            return Err(format!("bootstrap peer {peer} must start with http:// or https://").into());
        }
    }

    Ok(config)
}

fn default_api_port() -> u16 {
    5000
}

fn default_difficulty() -> u32 {
    4
}

fn default_mempool_threshold() -> usize {
    5
}

fn default_max_pending_age_secs() -> u64 {
    120
}

fn default_poll_secs() -> u64 {
    30
}

fn default_auto_mine() -> bool {
    true
}

fn default_sync_interval_secs() -> u64 {
    60
}

fn default_initial_delay_secs() -> u64 {
    30
}

fn default_peer_timeout_secs() -> u64 {
    5
}

fn default_auto_sync() -> bool {
    true
}
