use sha2::{Digest, Sha256};

use super::block::BlockData;

/// Encodes the hashed part of a block as JSON
pub fn encode_block_data(data: &BlockData<'_>) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Hashes already encoded block content
///
/// The digest input is the previous hash, the nonce in decimal and the JSON
/// form of the block data, concatenated in that order. The JSON ends with the
/// index, so any change to the transactions, their order, the index or the
/// nonce yields a different digest.
///
/// # Returns
///
/// The SHA-256 hash as a lowercase hexadecimal string
pub fn hash_encoded(previous_block_hash: &str, nonce: u64, encoded_data: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(previous_block_hash.as_bytes());
    hasher.update(nonce.to_string().as_bytes());
    hasher.update(encoded_data.as_bytes());

    hex::encode(hasher.finalize())
}

/// Hashes a block's content
pub fn hash_block(
    previous_block_hash: &str,
    data: &BlockData<'_>,
    nonce: u64,
) -> Result<String, serde_json::Error> {
    let encoded = encode_block_data(data)?;
    Ok(hash_encoded(previous_block_hash, nonce, &encoded))
}

/// Checks that `hash` starts with `difficulty` zero hex characters
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Transaction;

    fn sample_transactions() -> Vec<Transaction> {
        vec![
            Transaction::new("Alice", "Bob", "P1"),
            Transaction::new("Bob", "Carol", "P2"),
        ]
    }

    #[test]
    fn test_hash_is_deterministic() {
        let transactions = sample_transactions();
        let data = BlockData { transactions: &transactions, index: 2 };

        let first = hash_block("0", &data, 42).unwrap();
        let second = hash_block("0", &data, 42).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_changes_with_every_input() {
        let transactions = sample_transactions();
        let data = BlockData { transactions: &transactions, index: 2 };
        let base = hash_block("0", &data, 42).unwrap();

        assert_ne!(base, hash_block("1", &data, 42).unwrap());
        assert_ne!(base, hash_block("0", &data, 43).unwrap());

        let other_index = BlockData { transactions: &transactions, index: 3 };
        assert_ne!(base, hash_block("0", &other_index, 42).unwrap());

        let mut reversed = transactions.clone();
        reversed.reverse();
        let reordered = BlockData { transactions: &reversed, index: 2 };
        assert_ne!(base, hash_block("0", &reordered, 42).unwrap());

        let mut tampered = transactions.clone();
        tampered[0].recipient = "Zed".to_string();
        let tampered = BlockData { transactions: &tampered, index: 2 };
        assert_ne!(base, hash_block("0", &tampered, 42).unwrap());
    }

    #[test]
    fn test_hash_matches_reference_layout() {
        let data = BlockData { transactions: &[], index: 2 };
        let expected = hex::encode(Sha256::digest(b"07{\"transactions\":[],\"index\":2}"));

        assert_eq!(hash_block("0", &data, 7).unwrap(), expected);
    }

    #[test]
    fn test_hash_encoded_matches_hash_block() {
        let transactions = sample_transactions();
        let data = BlockData { transactions: &transactions, index: 2 };
        let encoded = encode_block_data(&data).unwrap();

        assert!(encoded.starts_with("{\"transactions\":["));
        assert!(encoded.ends_with(",\"index\":2}"));
        assert_eq!(hash_encoded("0", 42, &encoded), hash_block("0", &data, 42).unwrap());
    }

    #[test]
    fn test_meets_difficulty() {
        assert!(meets_difficulty("000abc", 3));
        assert!(!meets_difficulty("000abc", 4));
        assert!(meets_difficulty("abc", 0));
        assert!(!meets_difficulty("00", 3));
    }
}
