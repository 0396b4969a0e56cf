use log::debug;

use super::block::Block;
use super::hash::{hash_block, meets_difficulty};

/// Validates a candidate chain against this node's difficulty
///
/// Checks the genesis block first, then for every later block: its index and
/// link to the predecessor, its recomputed hash, and its proof of work.
/// Stops at the first failure.
///
/// # Returns
///
/// true if every block passes every check, false otherwise
pub fn is_chain_valid(chain: &[Block], difficulty: usize) -> bool {
    let Some(genesis) = chain.first() else {
        debug!("Rejected chain: empty");
        return false;
    };

    if genesis.index != 1 || !genesis.is_genesis() {
        debug!("Rejected chain: genesis block does not match");
        return false;
    }

    for (position, pair) in chain.windows(2).enumerate() {
        let (previous_block, current_block) = (&pair[0], &pair[1]);

        // Link integrity
        if current_block.index != position as u64 + 2
            || current_block.previous_block_hash != previous_block.hash
        {
            debug!("Rejected chain: block {} is not linked to its predecessor", current_block.index);
            return false;
        }

        // Content integrity
        let recomputed = match hash_block(
            &current_block.previous_block_hash,
            &current_block.data(),
            current_block.nonce,
        ) {
            Ok(hash) => hash,
            Err(err) => {
                debug!("Rejected chain: block {} cannot be encoded: {}", current_block.index, err);
                return false;
            }
        };
        if recomputed != current_block.hash {
            debug!("Rejected chain: block {} hash does not match its content", current_block.index);
            return false;
        }

        // Work integrity
        if !meets_difficulty(&current_block.hash, difficulty) {
            debug!(
                "Rejected chain: block {} does not meet difficulty {}",
                current_block.index, difficulty
            );
            return false;
        }
    }

    true
}
