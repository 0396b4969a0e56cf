use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::transaction::Transaction;

/// Nonce of the genesis block
pub const GENESIS_NONCE: u64 = 100;

/// Hash and previous hash of the genesis block
pub const GENESIS_HASH: &str = "0";

/// Represents a block in the blockchain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// 1-based position of the block in the chain
    pub index: u64,

    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Transactions settled by this block, in submission order
    pub transactions: Vec<Transaction>,

    /// Proof of work
    pub nonce: u64,

    /// Hash of this block's content
    pub hash: String,

    /// Hash of the previous block
    pub previous_block_hash: String,
}

/// The part of a block covered by its hash besides the previous hash and nonce
///
/// Serializes as `{"transactions":[...],"index":N}`.
#[derive(Debug, Serialize)]
pub struct BlockData<'a> {
    pub transactions: &'a [Transaction],
    pub index: u64,
}

impl Block {
    /// Creates a block stamped with the current time
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        nonce: u64,
        hash: String,
        previous_block_hash: String,
    ) -> Self {
        Block {
            index,
            timestamp: Utc::now().timestamp_millis(),
            transactions,
            nonce,
            hash,
            previous_block_hash,
        }
    }

    /// Creates the fixed first block of every chain
    pub fn genesis() -> Self {
        Block::new(
            1,
            Vec::new(),
            GENESIS_NONCE,
            GENESIS_HASH.to_string(),
            GENESIS_HASH.to_string(),
        )
    }

    /// Checks the fixed genesis invariants; the timestamp is free
    pub fn is_genesis(&self) -> bool {
        self.nonce == GENESIS_NONCE
            && self.previous_block_hash == GENESIS_HASH
            && self.hash == GENESIS_HASH
            && self.transactions.is_empty()
    }

    /// Borrows the hashed content of this block
    pub fn data(&self) -> BlockData<'_> {
        BlockData {
            transactions: &self.transactions,
            index: self.index,
        }
    }
}
