use log::debug;

use super::block::BlockData;
use super::hash::{encode_block_data, hash_encoded, meets_difficulty};

/// Lowest accepted difficulty
pub const MIN_DIFFICULTY: usize = 1;

/// Highest accepted difficulty (length of a SHA-256 hex digest)
pub const MAX_DIFFICULTY: usize = 64;

/// Difficulty a fresh node starts with
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Nonce attempts between two yields to the scheduler
const YIELD_INTERVAL: u64 = 1_000;

/// Checks that a difficulty lies in the accepted range
pub fn is_valid_difficulty(difficulty: usize) -> bool {
    (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty)
}

/// Searches for a nonce whose block hash starts with `difficulty` zeros
///
/// Nonces are tried in increasing order from 0 with no upper bound. The
/// search yields to the runtime every `YIELD_INTERVAL` attempts so other
/// tasks on the same worker keep being served while a block is mined.
///
/// # Returns
///
/// The smallest nonce meeting the target
pub async fn solve(
    previous_block_hash: &str,
    data: &BlockData<'_>,
    difficulty: usize,
) -> Result<u64, serde_json::Error> {
    // The block content does not change with the nonce
    let encoded = encode_block_data(data)?;
    let mut nonce: u64 = 0;

    loop {
        let hash = hash_encoded(previous_block_hash, nonce, &encoded);
        if meets_difficulty(&hash, difficulty) {
            debug!("Found nonce {} for block {} at difficulty {}", nonce, data.index, difficulty);
            return Ok(nonce);
        }

        nonce += 1;
        if nonce % YIELD_INTERVAL == 0 {
            tokio::task::yield_now().await;
        }
    }
}
