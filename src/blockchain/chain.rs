use std::sync::atomic::{AtomicUsize, Ordering};

use log::{info, warn};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;

use super::block::{Block, BlockData};
use super::hash::hash_block;
use super::pow::{self, DEFAULT_DIFFICULTY};
use super::transaction::Transaction;
use super::validator::is_chain_valid;

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("A miner address is required to receive the mining reward")]
    InvalidMiner,

    #[error("Invalid difficulty {0}: must be between 1 and 64")]
    InvalidDifficulty(usize),

    #[error("{0}")]
    Validation(String),

    #[error("Chain tip {expected} was replaced while mining; block discarded")]
    TipMoved { expected: String },

    #[error("Replacement chain of length {candidate} is not longer than the local chain of length {local}")]
    StaleReplacement { candidate: usize, local: usize },

    #[error("Failed to encode block content: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// A transaction annotated with the block that contains it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(flatten)]
    pub transaction: Transaction,

    pub block_index: u64,

    pub block_hash: String,
}

impl TransactionRecord {
    fn new(transaction: &Transaction, block: &Block) -> Self {
        TransactionRecord {
            transaction: transaction.clone(),
            block_index: block.index,
            block_hash: block.hash.clone(),
        }
    }
}

#[derive(Debug)]
struct LedgerState {
    /// The chain of blocks, never empty
    chain: Vec<Block>,

    /// Transactions waiting for the next block
    pending: Vec<Transaction>,
}

impl LedgerState {
    fn tip(&self) -> &Block {
        self.chain.last().expect("chain always holds the genesis block")
    }

    fn contains_transaction(&self, transaction_id: &str) -> bool {
        self.pending.iter().any(|t| t.transaction_id == transaction_id)
            || self
                .chain
                .iter()
                .flat_map(|b| b.transactions.iter())
                .any(|t| t.transaction_id == transaction_id)
    }

    /// Puts transactions back in front of the pool, skipping those already
    /// mined or pending again
    fn restore_unmined(&mut self, transactions: Vec<Transaction>) {
        let arrived = std::mem::take(&mut self.pending);
        let mut restored: Vec<Transaction> = transactions
            .into_iter()
            .filter(|t| {
                !self.contains_transaction(&t.transaction_id)
                    && !arrived.iter().any(|a| a.transaction_id == t.transaction_id)
            })
            .collect();
        restored.extend(arrived);
        self.pending = restored;
    }
}

/// Transactions taken from the pool for the block being mined
///
/// Unless committed into a block, they return to the pool on drop, including
/// when the mining future is cancelled mid-search.
struct TakenTransactions<'a> {
    state: &'a RwLock<LedgerState>,
    transactions: Option<Vec<Transaction>>,
}

impl<'a> TakenTransactions<'a> {
    fn new(state: &'a RwLock<LedgerState>, transactions: Vec<Transaction>) -> Self {
        TakenTransactions {
            state,
            transactions: Some(transactions),
        }
    }

    fn as_slice(&self) -> &[Transaction] {
        self.transactions.as_deref().unwrap_or_default()
    }

    fn commit(mut self) -> Vec<Transaction> {
        self.transactions.take().unwrap_or_default()
    }
}

impl Drop for TakenTransactions<'_> {
    fn drop(&mut self) {
        if let Some(transactions) = self.transactions.take() {
            if !transactions.is_empty() {
                warn!("Returning {} transaction(s) to the pending pool", transactions.len());
                self.state.write().restore_unmined(transactions);
            }
        }
    }
}

/// The ledger: the chain plus the pool of pending transactions
///
/// Chain and pool share one lock so that mining and chain replacement swap
/// them together. Mining is single-flight: concurrent callers queue on
/// `mining_lock` and each one builds on the tip left by the previous.
#[derive(Debug)]
pub struct Ledger {
    state: RwLock<LedgerState>,

    /// Number of leading zero hex characters required in a block hash
    difficulty: AtomicUsize,

    mining_lock: tokio::sync::Mutex<()>,
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger::new()
    }
}

impl Ledger {
    /// Creates a ledger holding only the genesis block
    pub fn new() -> Self {
        Ledger {
            state: RwLock::new(LedgerState {
                chain: vec![Block::genesis()],
                pending: Vec::new(),
            }),
            difficulty: AtomicUsize::new(DEFAULT_DIFFICULTY),
            mining_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Creates a ledger with a custom starting difficulty
    pub fn with_difficulty(difficulty: usize) -> Result<Self, LedgerError> {
        let ledger = Ledger::new();
        ledger.set_difficulty(difficulty)?;
        Ok(ledger)
    }

    /// Gets the current mining difficulty
    pub fn difficulty(&self) -> usize {
        self.difficulty.load(Ordering::SeqCst)
    }

    /// Sets the mining difficulty, rejecting values outside [1, 64]
    pub fn set_difficulty(&self, difficulty: usize) -> Result<(), LedgerError> {
        if !pow::is_valid_difficulty(difficulty) {
            return Err(LedgerError::InvalidDifficulty(difficulty));
        }

        let previous = self.difficulty.swap(difficulty, Ordering::SeqCst);
        if previous != difficulty {
            info!("Mining difficulty changed from {} to {}", previous, difficulty);
        }
        Ok(())
    }

    /// Creates a transaction and appends it to the pending pool
    ///
    /// Parties are not authenticated; only presence of every field is checked.
    pub fn create_transaction(
        &self,
        sender: &str,
        recipient: &str,
        product_id: &str,
    ) -> Result<Transaction, LedgerError> {
        for (name, value) in [("sender", sender), ("recipient", recipient), ("productId", product_id)] {
            if value.trim().is_empty() {
                return Err(LedgerError::Validation(format!(
                    "sender, recipient, and productId are required ({} is missing)",
                    name
                )));
            }
        }

        let transaction = Transaction::new(sender, recipient, product_id);
        self.state.write().pending.push(transaction.clone());

        Ok(transaction)
    }

    /// Adds a transaction created by another node to the pending pool
    ///
    /// # Returns
    ///
    /// false if a transaction with the same id is already pending or mined
    pub fn add_transaction(&self, transaction: Transaction) -> bool {
        let mut state = self.state.write();
        if state.contains_transaction(&transaction.transaction_id) {
            return false;
        }

        state.pending.push(transaction);
        true
    }

    /// Mines a new block from the pending pool
    ///
    /// The pool is taken whole when mining starts; transactions submitted
    /// during the proof of work wait for the next block. The miner's reward
    /// is queued behind them, so it lands in the following block.
    ///
    /// # Returns
    ///
    /// Result with the newly mined block
    pub async fn mine_block(&self, miner_address: &str) -> Result<Block, LedgerError> {
        let miner_address = miner_address.trim();
        if miner_address.is_empty() {
            return Err(LedgerError::InvalidMiner);
        }

        let _single_flight = self.mining_lock.lock().await;
        let difficulty = self.difficulty();

        let (previous_block_hash, index, transactions) = {
            let mut state = self.state.write();
            let tip = state.tip();
            let previous_block_hash = tip.hash.clone();
            let index = tip.index + 1;
            (previous_block_hash, index, std::mem::take(&mut state.pending))
        };
        let taken = TakenTransactions::new(&self.state, transactions);

        let data = BlockData {
            transactions: taken.as_slice(),
            index,
        };
        let nonce = pow::solve(&previous_block_hash, &data, difficulty).await?;
        let hash = hash_block(&previous_block_hash, &data, nonce)?;

        let mut state = self.state.write();
        if state.tip().hash != previous_block_hash {
            warn!("Discarding block {}: chain was replaced while mining", index);
            drop(state);
            drop(taken);
            return Err(LedgerError::TipMoved {
                expected: previous_block_hash,
            });
        }

        let block = Block::new(index, taken.commit(), nonce, hash, previous_block_hash);
        state.pending.push(Transaction::new_reward(miner_address));
        state.chain.push(block.clone());

        info!(
            "Mined block {} with {} transaction(s), nonce {}, hash {}",
            block.index,
            block.transactions.len(),
            block.nonce,
            block.hash
        );

        Ok(block)
    }

    /// Gets the last block in the chain
    pub fn get_last_block(&self) -> Block {
        self.state.read().tip().clone()
    }

    /// Gets the entire chain
    pub fn get_chain(&self) -> Vec<Block> {
        self.state.read().chain.clone()
    }

    /// Gets the number of blocks in the chain
    pub fn chain_length(&self) -> usize {
        self.state.read().chain.len()
    }

    /// Gets all pending transactions
    pub fn get_pending_transactions(&self) -> Vec<Transaction> {
        self.state.read().pending.clone()
    }

    /// Gets the chain and pending pool as one consistent pair
    pub fn snapshot(&self) -> (Vec<Block>, Vec<Transaction>) {
        let state = self.state.read();
        (state.chain.clone(), state.pending.clone())
    }

    /// Removes and returns every pending transaction
    pub fn take_pending(&self) -> Vec<Transaction> {
        std::mem::take(&mut self.state.write().pending)
    }

    /// Puts transactions back at the front of the pending pool
    pub fn restore_pending(&self, transactions: Vec<Transaction>) {
        self.state.write().restore_unmined(transactions);
    }

    /// Validates the local chain at the current difficulty
    pub fn is_valid(&self) -> bool {
        is_chain_valid(&self.state.read().chain, self.difficulty())
    }

    /// Finds a mined transaction and the block containing it
    pub fn find_transaction(&self, transaction_id: &str) -> Option<(Transaction, Block)> {
        let state = self.state.read();
        state.chain.iter().find_map(|block| {
            block
                .transactions
                .iter()
                .find(|t| t.transaction_id == transaction_id)
                .map(|t| (t.clone(), block.clone()))
        })
    }

    /// Finds a block by its hash
    pub fn find_block_by_hash(&self, hash: &str) -> Option<Block> {
        self.state.read().chain.iter().find(|b| b.hash == hash).cloned()
    }

    /// Finds a block by its 1-based index
    pub fn find_block_by_index(&self, index: u64) -> Result<Option<Block>, LedgerError> {
        if index == 0 {
            return Err(LedgerError::Validation(
                "Block index must be a positive integer".to_string(),
            ));
        }

        let state = self.state.read();
        Ok(usize::try_from(index - 1)
            .ok()
            .and_then(|position| state.chain.get(position))
            .cloned())
    }

    /// Gets the transactions of the block at `index`
    pub fn transactions_in_block(&self, index: u64) -> Result<Option<Vec<Transaction>>, LedgerError> {
        Ok(self.find_block_by_index(index)?.map(|block| block.transactions))
    }

    /// Gets every mined transaction of a product, oldest first
    pub fn transactions_for_product(&self, product_id: &str) -> Vec<TransactionRecord> {
        self.collect_records(|t| t.product_id == product_id)
    }

    /// Gets every mined transaction sent or received by `address`, oldest first
    pub fn transactions_for_address(&self, address: &str) -> Vec<TransactionRecord> {
        self.collect_records(|t| t.involves(address))
    }

    /// Gets up to `count` mined transactions, newest block first and, within
    /// a block, last submitted first
    pub fn latest_transactions(&self, count: usize) -> Result<Vec<TransactionRecord>, LedgerError> {
        if count == 0 {
            return Err(LedgerError::Validation(
                "Count must be a positive integer".to_string(),
            ));
        }

        let state = self.state.read();
        Ok(state
            .chain
            .iter()
            .rev()
            .flat_map(|block| {
                block
                    .transactions
                    .iter()
                    .rev()
                    .map(move |t| TransactionRecord::new(t, block))
            })
            .take(count)
            .collect())
    }

    /// Swaps in a chain and pending pool received from a peer
    ///
    /// The caller validates `chain` beforehand. The swap is refused when the
    /// local chain has grown to the candidate's length in the meantime.
    pub fn replace_chain(
        &self,
        chain: Vec<Block>,
        pending: Vec<Transaction>,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        if chain.len() <= state.chain.len() {
            return Err(LedgerError::StaleReplacement {
                candidate: chain.len(),
                local: state.chain.len(),
            });
        }

        info!(
            "Replacing chain of length {} with chain of length {}",
            state.chain.len(),
            chain.len()
        );
        state.chain = chain;
        state.pending = pending;

        Ok(())
    }

    fn collect_records<F>(&self, predicate: F) -> Vec<TransactionRecord>
    where
        F: Fn(&Transaction) -> bool,
    {
        let state = self.state.read();
        let mut records = Vec::new();
        for block in &state.chain {
            for transaction in block.transactions.iter().filter(|t| predicate(*t)) {
                records.push(TransactionRecord::new(transaction, block));
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::transaction::REWARD_PRODUCT_ID;
    use std::sync::Arc;
    use tokio::task::JoinHandle;

    fn test_ledger() -> Ledger {
        Ledger::with_difficulty(2).unwrap()
    }

    #[test]
    fn test_new_ledger() {
        let ledger = Ledger::new();
        let chain = ledger.get_chain();

        assert_eq!(chain.len(), 1);
        assert!(chain[0].is_genesis());
        assert_eq!(ledger.difficulty(), DEFAULT_DIFFICULTY);
        assert!(ledger.get_pending_transactions().is_empty());
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_set_difficulty_rejects_out_of_range() {
        let ledger = Ledger::new();

        assert!(matches!(ledger.set_difficulty(0), Err(LedgerError::InvalidDifficulty(0))));
        assert!(matches!(ledger.set_difficulty(65), Err(LedgerError::InvalidDifficulty(65))));
        assert_eq!(ledger.difficulty(), DEFAULT_DIFFICULTY);

        ledger.set_difficulty(5).unwrap();
        assert_eq!(ledger.difficulty(), 5);
        ledger.set_difficulty(64).unwrap();
        assert_eq!(ledger.difficulty(), 64);
    }

    #[test]
    fn test_create_transaction() {
        let ledger = test_ledger();
        let transaction = ledger.create_transaction("Alice", "Bob", "P1").unwrap();

        let pending = ledger.get_pending_transactions();
        assert_eq!(pending, vec![transaction]);
    }

    #[test]
    fn test_create_transaction_requires_every_field() {
        let ledger = test_ledger();

        assert!(matches!(
            ledger.create_transaction("Alice", "Bob", ""),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.create_transaction("", "Bob", "P1"),
            Err(LedgerError::Validation(_))
        ));
        assert!(ledger.get_pending_transactions().is_empty());
    }

    #[test]
    fn test_add_transaction_ignores_duplicates() {
        let ledger = test_ledger();
        let transaction = Transaction::new("Alice", "Bob", "P1");

        assert!(ledger.add_transaction(transaction.clone()));
        assert!(!ledger.add_transaction(transaction));
        assert_eq!(ledger.get_pending_transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_mine_block_requires_miner() {
        let ledger = test_ledger();
        ledger.create_transaction("Alice", "Bob", "P1").unwrap();

        assert!(matches!(ledger.mine_block("").await, Err(LedgerError::InvalidMiner)));
        assert!(matches!(ledger.mine_block("   ").await, Err(LedgerError::InvalidMiner)));
        assert_eq!(ledger.chain_length(), 1);
        assert_eq!(ledger.get_pending_transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_mine_block() {
        let ledger = test_ledger();
        let transaction = ledger.create_transaction("Alice", "Bob", "P1").unwrap();

        let block = ledger.mine_block("Charlie").await.unwrap();

        assert_eq!(block.index, 2);
        assert_eq!(block.previous_block_hash, "0");
        assert_eq!(block.transactions, vec![transaction]);
        assert!(block.hash.starts_with("00"));
        assert_eq!(ledger.get_last_block(), block);

        // The reward waits for the next block
        let pending = ledger.get_pending_transactions();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].recipient, "Charlie");
        assert_eq!(pending[0].product_id, REWARD_PRODUCT_ID);
        assert!(ledger.is_valid());
    }

    #[tokio::test]
    async fn test_reward_lands_in_following_block() {
        let ledger = test_ledger();
        ledger.create_transaction("Alice", "Bob", "P1").unwrap();

        ledger.mine_block("Charlie").await.unwrap();
        let second = ledger.mine_block("Dave").await.unwrap();

        assert_eq!(second.transactions.len(), 1);
        assert!(second.transactions[0].is_reward());
        assert_eq!(second.transactions[0].recipient, "Charlie");
        assert_eq!(ledger.chain_length(), 3);
        assert!(ledger.is_valid());
    }

    #[tokio::test]
    async fn test_mined_block_is_independent_of_pool() {
        let ledger = test_ledger();
        ledger.create_transaction("Alice", "Bob", "P1").unwrap();

        let block = ledger.mine_block("Charlie").await.unwrap();
        ledger.create_transaction("Eve", "Frank", "P2").unwrap();
        ledger.take_pending();

        assert_eq!(ledger.get_last_block().transactions, block.transactions);
        assert!(ledger.is_valid());
    }

    #[tokio::test]
    async fn test_concurrent_mining_is_serialized() {
        let ledger = Arc::new(test_ledger());
        ledger.create_transaction("Alice", "Bob", "P1").unwrap();

        let first = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.mine_block("m1").await }
        });
        let second = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.mine_block("m2").await }
        });

        let mut indexes = vec![
            first.await.unwrap().unwrap().index,
            second.await.unwrap().unwrap().index,
        ];
        indexes.sort();

        assert_eq!(indexes, vec![2, 3]);
        assert_eq!(ledger.chain_length(), 3);
        assert!(ledger.is_valid());
    }

    #[tokio::test]
    async fn test_cancelled_mining_returns_transactions() {
        let ledger = Arc::new(Ledger::with_difficulty(7).unwrap());
        let transaction = ledger.create_transaction("Alice", "Bob", "P1").unwrap();

        let handle = tokio::spawn({
            let ledger = ledger.clone();
            async move { ledger.mine_block("miner").await }
        });
        while !ledger.get_pending_transactions().is_empty() {
            tokio::task::yield_now().await;
        }
        handle.abort();

        assert!(handle.await.unwrap_err().is_cancelled());
        assert_eq!(ledger.get_pending_transactions(), vec![transaction.clone()]);
        assert_eq!(ledger.chain_length(), 1);

        // The mining lock went away with the cancelled future
        ledger.set_difficulty(1).unwrap();
        let block = ledger.mine_block("miner").await.unwrap();
        assert_eq!(block.transactions, vec![transaction]);
    }

    /// Starts mining `transactions` on a fresh ledger and returns once the
    /// miner holds them but has not appended a block yet
    async fn ledger_mining_in_background(
        transactions: &[Transaction],
    ) -> (Arc<Ledger>, JoinHandle<Result<Block, LedgerError>>) {
        loop {
            let ledger = Arc::new(test_ledger_at(3));
            for transaction in transactions {
                ledger.add_transaction(transaction.clone());
            }

            let handle = tokio::spawn({
                let ledger = ledger.clone();
                async move { ledger.mine_block("miner").await }
            });
            while ledger.chain_length() == 1 && !ledger.get_pending_transactions().is_empty() {
                tokio::task::yield_now().await;
            }
            if ledger.chain_length() == 1 {
                return (ledger, handle);
            }

            // Solved within the first slice; try a fresh ledger
            handle.await.unwrap().unwrap();
        }
    }

    fn test_ledger_at(difficulty: usize) -> Ledger {
        Ledger::with_difficulty(difficulty).unwrap()
    }

    #[tokio::test]
    async fn test_chain_replaced_while_mining() {
        let shared = Transaction::new("Alice", "Bob", "P1");
        let local = Transaction::new("Carol", "Dave", "P2");

        let source = test_ledger_at(3);
        source.add_transaction(shared.clone());
        source.mine_block("peer").await.unwrap();
        source.mine_block("peer").await.unwrap();
        let (chain, pending) = source.snapshot();

        let (ledger, handle) = ledger_mining_in_background(&[shared, local.clone()]).await;
        ledger.replace_chain(chain.clone(), pending.clone()).unwrap();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(LedgerError::TipMoved { .. })));
        assert_eq!(ledger.get_chain(), chain);

        // The already mined transaction is not restored a second time
        let mut expected = vec![local];
        expected.extend(pending);
        assert_eq!(ledger.get_pending_transactions(), expected);
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_restore_pending_skips_known_transactions() {
        let ledger = test_ledger();
        let first = ledger.create_transaction("a", "b", "P1").unwrap();

        let taken = ledger.take_pending();
        ledger.add_transaction(first.clone());
        ledger.restore_pending(taken);

        assert_eq!(ledger.get_pending_transactions(), vec![first]);
    }

    #[tokio::test]
    async fn test_find_transaction_round_trip() {
        let ledger = test_ledger();
        let transaction = ledger.create_transaction("Alice", "Bob", "P1").unwrap();
        let block = ledger.mine_block("Charlie").await.unwrap();

        let (found, containing) = ledger.find_transaction(&transaction.transaction_id).unwrap();

        assert_eq!(found, transaction);
        assert_eq!(containing.index, block.index);
        assert!(ledger.find_transaction("missing").is_none());
    }

    #[tokio::test]
    async fn test_find_blocks() {
        let ledger = test_ledger();
        let block = ledger.mine_block("Charlie").await.unwrap();

        assert_eq!(ledger.find_block_by_hash(&block.hash), Some(block.clone()));
        assert_eq!(ledger.find_block_by_hash(&"a".repeat(64)), None);

        assert_eq!(ledger.find_block_by_index(2).unwrap(), Some(block));
        assert!(ledger.find_block_by_index(1).unwrap().unwrap().is_genesis());
        assert_eq!(ledger.find_block_by_index(999).unwrap(), None);
        assert!(matches!(ledger.find_block_by_index(0), Err(LedgerError::Validation(_))));

        assert_eq!(ledger.transactions_in_block(1).unwrap(), Some(Vec::new()));
        assert_eq!(ledger.transactions_in_block(3).unwrap(), None);
    }

    #[tokio::test]
    async fn test_histories() {
        let ledger = test_ledger();
        ledger.create_transaction("seller", "buyer-1", "P1").unwrap();
        ledger.mine_block("miner").await.unwrap();
        ledger.create_transaction("other", "seller", "P2").unwrap();
        let second = ledger.mine_block("miner").await.unwrap();

        let product = ledger.transactions_for_product("P1");
        assert_eq!(product.len(), 1);
        assert_eq!(product[0].transaction.recipient, "buyer-1");
        assert_eq!(product[0].block_index, 2);

        let address = ledger.transactions_for_address("seller");
        assert_eq!(address.len(), 2);
        assert!(address.iter().all(|r| r.transaction.involves("seller")));
        assert_eq!(address[1].block_hash, second.hash);

        assert!(ledger.transactions_for_product("missing").is_empty());
        assert!(ledger.transactions_for_address("nobody").is_empty());
    }

    #[test]
    fn test_latest_transactions_on_genesis_only_chain() {
        let ledger = test_ledger();

        assert!(ledger.latest_transactions(5).unwrap().is_empty());
        assert!(matches!(ledger.latest_transactions(0), Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_latest_transactions_newest_first() {
        let ledger = test_ledger();
        let mut created = Vec::new();
        for product in ["P1", "P2", "P3"] {
            // Drop the previous reward so every block holds one transaction
            ledger.take_pending();
            created.push(ledger.create_transaction("a", "b", product).unwrap());
            ledger.mine_block("miner").await.unwrap();
        }

        let latest = ledger.latest_transactions(2).unwrap();

        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].transaction, created[2]);
        assert_eq!(latest[1].transaction, created[1]);
        assert_eq!(latest[0].block_index, 4);

        assert_eq!(ledger.latest_transactions(10).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_latest_transactions_reverse_in_block_order() {
        let ledger = test_ledger();
        let first = ledger.create_transaction("a", "b", "P1").unwrap();
        let second = ledger.create_transaction("a", "b", "P2").unwrap();
        ledger.mine_block("miner").await.unwrap();

        let latest = ledger.latest_transactions(2).unwrap();

        assert_eq!(latest[0].transaction, second);
        assert_eq!(latest[1].transaction, first);
    }

    #[tokio::test]
    async fn test_replace_chain() {
        let source = test_ledger();
        source.mine_block("miner").await.unwrap();
        source.mine_block("miner").await.unwrap();
        let (chain, pending) = source.snapshot();

        let ledger = test_ledger();
        ledger.replace_chain(chain.clone(), pending.clone()).unwrap();

        assert_eq!(ledger.get_chain(), chain);
        assert_eq!(ledger.get_pending_transactions(), pending);

        let shorter = chain[..2].to_vec();
        assert!(matches!(
            ledger.replace_chain(shorter, Vec::new()),
            Err(LedgerError::StaleReplacement { candidate: 2, local: 3 })
        ));
        assert_eq!(ledger.chain_length(), 3);
    }

    #[test]
    fn test_take_and_restore_pending() {
        let ledger = test_ledger();
        let first = ledger.create_transaction("a", "b", "P1").unwrap();

        let taken = ledger.take_pending();
        let later = ledger.create_transaction("a", "b", "P2").unwrap();
        ledger.restore_pending(taken);

        assert_eq!(ledger.get_pending_transactions(), vec![first, later]);
    }
}
