use log::{debug, info};
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during peer registration
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Invalid peer address: {0:?}")]
    InvalidAddress(String),
}

/// The set of peers known to this node
///
/// Peers are kept in registration order so broadcasts and consensus visit
/// them deterministically. The node's own address is never stored. There is
/// no removal: an unreachable peer stays registered.
#[derive(Debug)]
pub struct PeerRegistry {
    /// This node's identity
    node_address: String,

    peers: RwLock<Vec<String>>,
}

impl PeerRegistry {
    /// Creates an empty registry for a node with the given identity
    pub fn new(node_address: impl Into<String>) -> Self {
        PeerRegistry {
            node_address: normalize(&node_address.into()),
            peers: RwLock::new(Vec::new()),
        }
    }

    /// Gets this node's identity
    pub fn node_address(&self) -> &str {
        &self.node_address
    }

    /// Registers a peer
    ///
    /// # Returns
    ///
    /// true if the peer was added, false if it is this node or already known
    pub fn register(&self, peer_address: &str) -> Result<bool, PeerError> {
        let peer_address = normalize(peer_address);
        if peer_address.is_empty() {
            return Err(PeerError::InvalidAddress(peer_address));
        }

        if peer_address == self.node_address {
            debug!("Ignoring registration of own address {}", peer_address);
            return Ok(false);
        }

        let mut peers = self.peers.write();
        if peers.contains(&peer_address) {
            return Ok(false);
        }

        info!("Registered peer {}", peer_address);
        peers.push(peer_address);
        Ok(true)
    }

    /// Registers every address in `addresses`, skipping invalid ones
    ///
    /// # Returns
    ///
    /// The number of peers added
    pub fn register_bulk<I, S>(&self, addresses: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        addresses
            .into_iter()
            .filter(|address| matches!(self.register(address.as_ref()), Ok(true)))
            .count()
    }

    /// Gets every registered peer in registration order
    pub fn list(&self) -> Vec<String> {
        self.peers.read().clone()
    }

    /// Checks if a peer is registered
    pub fn contains(&self, peer_address: &str) -> bool {
        self.peers.read().contains(&normalize(peer_address))
    }

    /// Gets the number of registered peers
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Checks if no peer is registered
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

/// Generates a random node identity
pub fn random_node_address() -> String {
    Uuid::new_v4().simple().to_string()
}

// Peers are base URLs; "http://a:1/" and "http://a:1" are the same node
fn normalize(address: &str) -> String {
    address.trim().trim_end_matches('/').to_string()
}
