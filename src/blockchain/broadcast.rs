use futures::future::join_all;
use log::{info, warn};
use thiserror::Error;

use super::chain::Ledger;
use super::peers::{PeerError, PeerRegistry};
use super::transaction::Transaction;
use super::transport::{PeerTransport, TransportError};

/// Errors that can occur while fanning a change out to peers
///
/// Local state is always committed before the fan-out starts, so none of
/// these errors means the local ledger or registry was left half-updated.
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error(transparent)]
    InvalidPeer(#[from] PeerError),

    #[error("There are no pending transactions to broadcast")]
    NothingToBroadcast,

    #[error("No peers are registered to hand the pending transactions to")]
    NoPeers,

    #[error("Failed to reach {} of {attempted} peer request(s): {}", .failures.len(), summarize(.failures))]
    Unreachable {
        attempted: usize,
        failures: Vec<TransportError>,
    },
}

fn summarize(failures: &[TransportError]) -> String {
    failures
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn collect_failures(results: Vec<Result<(), TransportError>>) -> Result<usize, BroadcastError> {
    let attempted = results.len();
    let failures: Vec<TransportError> = results.into_iter().filter_map(Result::err).collect();

    if failures.is_empty() {
        Ok(attempted)
    } else {
        for failure in &failures {
            warn!("Broadcast failure: {}", failure);
        }
        Err(BroadcastError::Unreachable { attempted, failures })
    }
}

/// Registers `new_node` locally, announces it to every other known peer and
/// hands it the full list of network nodes including this one
///
/// # Returns
///
/// The number of peer requests that succeeded
pub async fn register_and_broadcast(
    registry: &PeerRegistry,
    transport: &dyn PeerTransport,
    new_node: &str,
) -> Result<usize, BroadcastError> {
    registry.register(new_node)?;
    let new_node = new_node.trim().trim_end_matches('/');

    let peers = registry.list();
    let announcements = peers
        .iter()
        .filter(|peer| peer.as_str() != new_node)
        .map(|peer| transport.announce_node(peer, new_node));
    let mut results = join_all(announcements).await;

    if new_node != registry.node_address() {
        let mut all_nodes = peers;
        all_nodes.push(registry.node_address().to_string());
        results.push(transport.register_nodes_bulk(new_node, &all_nodes).await);
    }

    let delivered = collect_failures(results)?;
    info!("Broadcast registration of {} with {} request(s)", new_node, delivered);
    Ok(delivered)
}

/// Pushes a locally created transaction to every peer
///
/// The local copy stays pending whatever the peers answer.
pub async fn broadcast_transaction(
    registry: &PeerRegistry,
    transport: &dyn PeerTransport,
    transaction: &Transaction,
) -> Result<usize, BroadcastError> {
    let peers = registry.list();
    let sends = peers.iter().map(|peer| transport.send_transaction(peer, transaction));
    let delivered = collect_failures(join_all(sends).await)?;

    info!("Broadcast transaction {} to {} peer(s)", transaction.transaction_id, delivered);
    Ok(delivered)
}

/// Hands the whole pending pool over to the peers
///
/// The pool is emptied only if every peer accepted every transaction;
/// otherwise the transactions go back to the front of the pool. Refused
/// while no peer is registered.
///
/// # Returns
///
/// The transactions that were handed over
pub async fn broadcast_pending(
    ledger: &Ledger,
    registry: &PeerRegistry,
    transport: &dyn PeerTransport,
) -> Result<Vec<Transaction>, BroadcastError> {
    let peers = registry.list();
    if peers.is_empty() {
        return Err(BroadcastError::NoPeers);
    }

    let transactions = ledger.take_pending();
    if transactions.is_empty() {
        return Err(BroadcastError::NothingToBroadcast);
    }

    let sends = peers.iter().flat_map(|peer| {
        transactions
            .iter()
            .map(move |transaction| transport.send_transaction(peer, transaction))
    });

    let results = join_all(sends).await;
    match collect_failures(results) {
        Ok(delivered) => {
            info!(
                "Handed {} pending transaction(s) to {} peer(s) with {} request(s)",
                transactions.len(),
                peers.len(),
                delivered
            );
            Ok(transactions)
        }
        Err(err) => {
            ledger.restore_pending(transactions);
            Err(err)
        }
    }
}
