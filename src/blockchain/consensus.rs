use futures::future::join_all;
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use super::chain::{Ledger, LedgerError};
use super::peers::PeerRegistry;
use super::transport::{ChainSnapshot, PeerTransport};
use super::validator::is_chain_valid;

/// Errors that can occur while resolving consensus
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("Failed to reach consensus: {0}")]
    Unavailable(String),
}

/// What consensus did to the local chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsensusOutcome {
    Replaced,
    Unchanged,
}

/// Applies the longest-valid-chain rule against every registered peer
///
/// Peer chains are fetched concurrently. The longest chain that is strictly
/// longer than the local one and valid at the local difficulty wins; equal
/// lengths go to the peer registered first. A failing peer is skipped as
/// long as at least one other peer answered.
///
/// # Returns
///
/// Whether the local chain was replaced
pub async fn resolve(
    ledger: &Ledger,
    registry: &PeerRegistry,
    transport: &dyn PeerTransport,
) -> Result<ConsensusOutcome, ConsensusError> {
    let peers = registry.list();
    if peers.is_empty() {
        return Err(ConsensusError::Unavailable("no peers are registered".to_string()));
    }

    let responses = join_all(peers.iter().map(|peer| transport.fetch_chain(peer))).await;

    let mut snapshots: Vec<(&String, ChainSnapshot)> = Vec::new();
    for (peer, response) in peers.iter().zip(responses) {
        match response {
            Ok(snapshot) => snapshots.push((peer, snapshot)),
            Err(err) => warn!("Skipping peer {} during consensus: {}", peer, err),
        }
    }

    if snapshots.is_empty() {
        return Err(ConsensusError::Unavailable(format!(
            "none of the {} registered peer(s) could be reached",
            peers.len()
        )));
    }

    let difficulty = ledger.difficulty();
    let mut best_length = ledger.chain_length();
    let mut best: Option<(&String, ChainSnapshot)> = None;

    for (peer, snapshot) in snapshots {
        if snapshot.chain.len() > best_length && is_chain_valid(&snapshot.chain, difficulty) {
            best_length = snapshot.chain.len();
            best = Some((peer, snapshot));
        }
    }

    let Some((peer, snapshot)) = best else {
        info!("Consensus kept the local chain of length {}", ledger.chain_length());
        return Ok(ConsensusOutcome::Unchanged);
    };

    match ledger.replace_chain(snapshot.chain, snapshot.pending_transactions) {
        Ok(()) => {
            info!("Consensus adopted the chain of length {} from {}", best_length, peer);
            Ok(ConsensusOutcome::Replaced)
        }
        Err(LedgerError::StaleReplacement { candidate, local }) => {
            info!(
                "Chain from {} (length {}) is no longer longer than the local chain (length {})",
                peer, candidate, local
            );
            Ok(ConsensusOutcome::Unchanged)
        }
        Err(err) => Err(ConsensusError::Unavailable(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::transport::testing::MockTransport;
    use crate::blockchain::Block;

    const SELF_URL: &str = "http://localhost:3000";
    const NODE_B: &str = "http://localhost:3001";
    const NODE_C: &str = "http://localhost:3002";

    async fn ledger_with_blocks(blocks: usize) -> Ledger {
        let ledger = Ledger::with_difficulty(1).unwrap();
        for _ in 0..blocks {
            ledger.create_transaction("a", "b", "P1").unwrap();
            ledger.mine_block("miner").await.unwrap();
        }
        ledger
    }

    fn registry_with(peers: &[&str]) -> PeerRegistry {
        let registry = PeerRegistry::new(SELF_URL);
        registry.register_bulk(peers.iter().copied());
        registry
    }

    #[tokio::test]
    async fn test_adopts_longer_valid_chain() {
        let node_a = ledger_with_blocks(1).await;
        let node_b = ledger_with_blocks(2).await;
        let node_c = ledger_with_blocks(1).await;
        let (b_chain, b_pending) = node_b.snapshot();
        let (c_chain, c_pending) = node_c.snapshot();

        let transport = MockTransport::default()
            .with_chain(NODE_B, b_chain.clone(), b_pending.clone())
            .with_chain(NODE_C, c_chain, c_pending);
        let registry = registry_with(&[NODE_B, NODE_C]);

        let outcome = resolve(&node_a, &registry, &transport).await.unwrap();

        assert_eq!(outcome, ConsensusOutcome::Replaced);
        assert_eq!(node_a.get_chain(), b_chain);
        assert_eq!(node_a.get_pending_transactions(), b_pending);
    }

    #[tokio::test]
    async fn test_keeps_chain_when_no_peer_is_longer() {
        let node_a = ledger_with_blocks(2).await;
        let local_chain = node_a.get_chain();
        let node_b = ledger_with_blocks(2).await;
        let (b_chain, _) = node_b.snapshot();

        let transport = MockTransport::default()
            .with_chain(NODE_B, b_chain, Vec::new())
            .with_chain(NODE_C, vec![Block::genesis()], Vec::new());
        let registry = registry_with(&[NODE_B, NODE_C]);

        let outcome = resolve(&node_a, &registry, &transport).await.unwrap();

        assert_eq!(outcome, ConsensusOutcome::Unchanged);
        assert_eq!(node_a.get_chain(), local_chain);
    }

    #[tokio::test]
    async fn test_rejects_longer_invalid_chain() {
        let node_a = ledger_with_blocks(1).await;
        let local_chain = node_a.get_chain();
        let (mut forged, _) = ledger_with_blocks(3).await.snapshot();
        forged[2].transactions[0].recipient = "Mallory".to_string();

        let transport = MockTransport::default().with_chain(NODE_B, forged, Vec::new());
        let registry = registry_with(&[NODE_B]);

        let outcome = resolve(&node_a, &registry, &transport).await.unwrap();

        assert_eq!(outcome, ConsensusOutcome::Unchanged);
        assert_eq!(node_a.get_chain(), local_chain);
    }

    #[tokio::test]
    async fn test_prefers_longest_and_first_on_ties() {
        let node_a = ledger_with_blocks(0).await;
        let (first, _) = ledger_with_blocks(2).await.snapshot();
        let (second, _) = ledger_with_blocks(2).await.snapshot();
        let (longest, _) = ledger_with_blocks(3).await.snapshot();

        let transport = MockTransport::default()
            .with_chain(NODE_B, first.clone(), Vec::new())
            .with_chain(NODE_C, second, Vec::new());
        let registry = registry_with(&[NODE_B, NODE_C]);

        resolve(&node_a, &registry, &transport).await.unwrap();
        assert_eq!(node_a.get_chain(), first);

        let node_d = ledger_with_blocks(0).await;
        let transport = MockTransport::default()
            .with_chain(NODE_B, first, Vec::new())
            .with_chain(NODE_C, longest.clone(), Vec::new());

        resolve(&node_d, &registry, &transport).await.unwrap();
        assert_eq!(node_d.get_chain(), longest);
    }

    #[tokio::test]
    async fn test_tolerates_single_peer_failure() {
        let node_a = ledger_with_blocks(0).await;
        let (b_chain, _) = ledger_with_blocks(1).await.snapshot();

        let transport = MockTransport::default()
            .with_unreachable(NODE_B)
            .with_chain(NODE_C, b_chain.clone(), Vec::new());
        let registry = registry_with(&[NODE_B, NODE_C]);

        let outcome = resolve(&node_a, &registry, &transport).await.unwrap();

        assert_eq!(outcome, ConsensusOutcome::Replaced);
        assert_eq!(node_a.get_chain(), b_chain);
    }

    #[tokio::test]
    async fn test_unavailable_when_every_peer_fails() {
        let node_a = ledger_with_blocks(1).await;
        let local_chain = node_a.get_chain();
        let transport = MockTransport::default()
            .with_unreachable(NODE_B)
            .with_unreachable(NODE_C);
        let registry = registry_with(&[NODE_B, NODE_C]);

        let result = resolve(&node_a, &registry, &transport).await;

        assert!(matches!(result, Err(ConsensusError::Unavailable(_))));
        assert_eq!(node_a.get_chain(), local_chain);
    }

    #[tokio::test]
    async fn test_unavailable_without_peers() {
        let node_a = ledger_with_blocks(0).await;
        let transport = MockTransport::default();
        let registry = registry_with(&[]);

        let result = resolve(&node_a, &registry, &transport).await;

        assert!(matches!(result, Err(ConsensusError::Unavailable(_))));
        assert!(transport.calls().is_empty());
    }
}
