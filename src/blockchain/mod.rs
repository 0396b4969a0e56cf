// Blockchain module
//
// This module contains the ledger engine:
// - Block and transaction structures
// - Block hashing and proof of work
// - Chain validation
// - The ledger (chain + pending pool)
// - Peer registry, peer transport and broadcasts
// - Longest-valid-chain consensus
// - The continuous miner

pub mod block;
pub mod broadcast;
pub mod chain;
pub mod consensus;
pub mod hash;
pub mod miner;
pub mod peers;
pub mod pow;
pub mod transaction;
pub mod transport;
pub mod validator;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{Ledger, LedgerError};
pub use consensus::ConsensusError;
pub use miner::{ContinuousMiner, MinerError};
pub use peers::{PeerError, PeerRegistry};
pub use transaction::Transaction;
pub use transport::{ChainSnapshot, HttpTransport, PeerTransport};
