use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sender used for the reward transaction credited to a miner
pub const REWARD_SENDER: &str = "00-REWARD-SYSTEM";

/// Product id marking a reward transaction
pub const REWARD_PRODUCT_ID: &str = "MINING-REWARD";

/// Number of random bytes behind a transaction id
const TRANSACTION_ID_BYTES: usize = 16;

/// Represents a product trade between two parties
///
/// Field order matters: it is the serialization order used when hashing
/// blocks, and peers recompute hashes from the same JSON layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Address of the party handing over the product
    pub sender: String,

    /// Address of the party receiving the product
    pub recipient: String,

    /// Identifier of the traded product
    pub product_id: String,

    /// Random hex identifier, unique per node
    pub transaction_id: String,

    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Transaction {
    /// Creates a new transaction with a fresh id and the current time
    pub fn new(sender: &str, recipient: &str, product_id: &str) -> Self {
        Transaction {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            product_id: product_id.to_string(),
            transaction_id: generate_transaction_id(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Creates the reward transaction paid to a miner
    pub fn new_reward(miner_address: &str) -> Self {
        Transaction::new(REWARD_SENDER, miner_address, REWARD_PRODUCT_ID)
    }

    /// Checks if the transaction is a mining reward
    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER && self.product_id == REWARD_PRODUCT_ID
    }

    /// Checks if `address` is either side of the trade
    pub fn involves(&self, address: &str) -> bool {
        self.sender == address || self.recipient == address
    }
}

fn generate_transaction_id() -> String {
    let mut bytes = [0u8; TRANSACTION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
