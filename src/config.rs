use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::blockchain::peers::random_node_address;
use crate::blockchain::pow::{self, DEFAULT_DIFFICULTY};

/// Errors that can occur while reading the node configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings of a node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Host the HTTP server binds to
    pub host: String,

    /// Port the HTTP server binds to
    pub port: u16,

    /// Identity announced to peers, normally this node's public base URL
    pub node_url: String,

    /// Starting mining difficulty
    pub difficulty: usize,

    /// Period of the continuous miner
    pub mining_interval: Duration,

    /// Timeout of every request sent to a peer
    pub peer_timeout: Duration,

    /// Peers registered at startup
    pub bootstrap_peers: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            node_url: random_node_address(),
            difficulty: DEFAULT_DIFFICULTY,
            mining_interval: Duration::from_secs(10),
            peer_timeout: Duration::from_secs(10),
            bootstrap_peers: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Loads the configuration from the environment, reading `.env` first
    /// when one exists
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = NodeConfig::default();

        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = parse_var(&lookup, "PORT")?.unwrap_or(defaults.port);
        let node_url = lookup("NODE_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.node_url);

        let difficulty = parse_var(&lookup, "MINING_DIFFICULTY")?.unwrap_or(defaults.difficulty);
        if !pow::is_valid_difficulty(difficulty) {
            return Err(ConfigError::InvalidValue {
                name: "MINING_DIFFICULTY",
                value: difficulty.to_string(),
                reason: "must be between 1 and 64".to_string(),
            });
        }

        let mining_interval = parse_secs(&lookup, "MINING_INTERVAL_SECS")?
            .unwrap_or(defaults.mining_interval);
        let peer_timeout = parse_secs(&lookup, "PEER_TIMEOUT_SECS")?
            .unwrap_or(defaults.peer_timeout);

        let bootstrap_peers = lookup("BOOTSTRAP_PEERS")
            .map(|peers| {
                peers
                    .split(',')
                    .map(str::trim)
                    .filter(|peer| !peer.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(NodeConfig {
            host,
            port,
            node_url,
            difficulty,
            mining_interval,
            peer_timeout,
            bootstrap_peers,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name,
                reason: e.to_string(),
                value,
            }),
    }
}

fn parse_secs<F>(lookup: &F, name: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var::<F, u64>(lookup, name)? {
        Some(0) => Err(ConfigError::InvalidValue {
            name,
            value: "0".to_string(),
            reason: "must be at least one second".to_string(),
        }),
        other => Ok(other.map(Duration::from_secs)),
    }
}
