use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::block::Block;
use super::transaction::Transaction;

/// Errors that can occur while talking to a single peer
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {peer} failed: {source}")]
    Request {
        peer: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Peer {peer} answered with status {status}")]
    Status { peer: String, status: u16 },
}

/// The node state served at `/blockchain` and fetched during consensus
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,

    pub pending_transactions: Vec<Transaction>,

    #[serde(default)]
    pub node_address: String,

    #[serde(default)]
    pub network_nodes: Vec<String>,
}

/// Body announcing a single node to a peer
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNodeRequest {
    pub new_node_url: Option<String>,
}

/// Body handing a whole peer list to a node
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNodesBulkRequest {
    pub all_network_nodes: Vec<String>,
}

/// Out-of-process communication with peer nodes
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Fetches a peer's chain and pending pool
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, TransportError>;

    /// Tells `peer` about `new_node`
    async fn announce_node(&self, peer: &str, new_node: &str) -> Result<(), TransportError>;

    /// Hands `peer` the full list of network nodes
    async fn register_nodes_bulk(&self, peer: &str, nodes: &[String]) -> Result<(), TransportError>;

    /// Pushes a pending transaction to `peer`
    async fn send_transaction(&self, peer: &str, transaction: &Transaction) -> Result<(), TransportError>;
}

/// JSON over HTTP transport with a per-request timeout
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Client)?;

        Ok(HttpTransport { client })
    }

    async fn post_json<T: Serialize + ?Sized + Sync>(
        &self,
        peer: &str,
        path: &str,
        body: &T,
    ) -> Result<(), TransportError> {
        let url = format!("{}{}", peer, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                peer: peer.to_string(),
                source,
            })?;

        check_status(peer, response.status())
    }
}

fn check_status(peer: &str, status: reqwest::StatusCode) -> Result<(), TransportError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::Status {
            peer: peer.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot, TransportError> {
        let url = format!("{}/blockchain", peer);
        debug!("GET {}", url);

        let request_error = |source| TransportError::Request {
            peer: peer.to_string(),
            source,
        };

        let response = self.client.get(&url).send().await.map_err(request_error)?;
        check_status(peer, response.status())?;

        response.json::<ChainSnapshot>().await.map_err(request_error)
    }

    async fn announce_node(&self, peer: &str, new_node: &str) -> Result<(), TransportError> {
        let body = RegisterNodeRequest {
            new_node_url: Some(new_node.to_string()),
        };
        self.post_json(peer, "/nodes/register-node", &body).await
    }

    async fn register_nodes_bulk(&self, peer: &str, nodes: &[String]) -> Result<(), TransportError> {
        let body = RegisterNodesBulkRequest {
            all_network_nodes: nodes.to_vec(),
        };
        self.post_json(peer, "/nodes/register-nodes-bulk", &body).await
    }

    async fn send_transaction(&self, peer: &str, transaction: &Transaction) -> Result<(), TransportError> {
        self.post_json(peer, "/transactions/receive", transaction).await
    }
}
