// API module
//
// This module contains the HTTP surface of a ledger node

pub mod error;
pub mod handlers;
pub mod routes;

use std::sync::Arc;

use crate::blockchain::{ContinuousMiner, Ledger, PeerRegistry, PeerTransport};

// Re-export main components for easier access
pub use routes::configure_routes;

/// Everything a node's handlers share
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub peers: PeerRegistry,
    pub transport: Arc<dyn PeerTransport>,
    pub miner: ContinuousMiner,
}

impl AppState {
    pub fn new(ledger: Arc<Ledger>, peers: PeerRegistry, transport: Arc<dyn PeerTransport>, miner: ContinuousMiner) -> Self {
        AppState {
            ledger,
            peers,
            transport,
            miner,
        }
    }
}
