use actix_web::{web, HttpResponse};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::error::ApiError;
use super::AppState;
use crate::blockchain::broadcast;
use crate::blockchain::consensus::{self, ConsensusOutcome};
use crate::blockchain::transport::{RegisterNodeRequest, RegisterNodesBulkRequest};
use crate::blockchain::{Block, ChainSnapshot, Transaction};

/// Shared node state as seen by the handlers
pub type NodeData = web::Data<AppState>;

type ApiResult = Result<HttpResponse, ApiError>;

/// Request for the transaction endpoints
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// The party handing over the product
    pub sender: Option<String>,

    /// The party receiving the product
    pub recipient: Option<String>,

    /// The traded product
    pub product_id: Option<String>,
}

/// Request for the mine endpoints
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MineRequest {
    /// The address receiving the mining reward
    pub miner_address: Option<String>,
}

/// Request for the difficulty endpoint
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyRequest {
    /// Number of leading zeros required in block hashes, 1 to 64
    pub new_difficulty: Option<i64>,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    pub result: String,

    pub message: String,

    /// The newly mined block
    pub block: Block,
}

fn required(value: &Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::Validation(message.to_string()))
}

fn not_found_if_empty<T>(items: &[T], message: String) -> Result<(), ApiError> {
    if items.is_empty() {
        Err(ApiError::NotFound(message))
    } else {
        Ok(())
    }
}

fn snapshot(state: &AppState) -> ChainSnapshot {
    let (chain, pending_transactions) = state.ledger.snapshot();
    ChainSnapshot {
        chain,
        pending_transactions,
        node_address: state.peers.node_address().to_string(),
        network_nodes: state.peers.list(),
    }
}

/// Welcome message with this node's identity
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Node identity")
    )
)]
pub async fn index(state: NodeData) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Welcome to the product ledger API!",
        "nodeAddress": state.peers.node_address()
    }))
}

/// Get the full node state
///
/// Returns the chain, the pending pool and the known peers. Peers fetch this
/// document during consensus.
#[utoipa::path(
    get,
    path = "/blockchain",
    responses(
        (status = 200, description = "Node state retrieved successfully", body = ChainSnapshot)
    )
)]
pub async fn get_blockchain(state: NodeData) -> HttpResponse {
    HttpResponse::Ok().json(snapshot(&state))
}

/// Get the last block
#[utoipa::path(
    get,
    path = "/blockchain/last-block",
    responses(
        (status = 200, description = "Last block retrieved successfully", body = Block)
    )
)]
pub async fn get_last_block(state: NodeData) -> HttpResponse {
    HttpResponse::Ok().json(state.ledger.get_last_block())
}

/// Get a block by index
#[utoipa::path(
    get,
    path = "/blockchain/block/{block_index}",
    params(
        ("block_index" = u64, Path, description = "1-based block index")
    ),
    responses(
        (status = 200, description = "Block found"),
        (status = 400, description = "Invalid block index"),
        (status = 404, description = "Block not found")
    )
)]
pub async fn get_block_by_index(state: NodeData, block_index: web::Path<u64>) -> ApiResult {
    let block_index = block_index.into_inner();
    let block = state
        .ledger
        .find_block_by_index(block_index)?
        .ok_or_else(|| ApiError::NotFound(format!("Block with index {} not found", block_index)))?;

    Ok(HttpResponse::Ok().json(json!({ "result": "Success", "block": block })))
}

/// Check if the local chain is valid
#[utoipa::path(
    get,
    path = "/validate",
    responses(
        (status = 200, description = "Chain validation status")
    )
)]
pub async fn validate_chain(state: NodeData) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "result": "Success",
        "isValid": state.ledger.is_valid(),
        "difficulty": state.ledger.difficulty()
    }))
}

/// Get all pending transactions
#[utoipa::path(
    get,
    path = "/transactions",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully")
    )
)]
pub async fn get_pending_transactions(state: NodeData) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "pendingTransactions": state.ledger.get_pending_transactions()
    }))
}

fn create_transaction(state: &AppState, request: &TransactionRequest) -> Result<Transaction, ApiError> {
    let message = "sender, recipient, and productId are required.";
    let sender = required(&request.sender, message)?;
    let recipient = required(&request.recipient, message)?;
    let product_id = required(&request.product_id, message)?;

    Ok(state.ledger.create_transaction(&sender, &recipient, &product_id)?)
}

/// Create a new transaction
///
/// Adds a new transaction to the pending pool; it is settled by the next block
#[utoipa::path(
    post,
    path = "/transactions",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction created successfully"),
        (status = 400, description = "Missing field")
    )
)]
pub async fn new_transaction(state: NodeData, request: web::Json<TransactionRequest>) -> ApiResult {
    let transaction = create_transaction(&state, &request)?;

    Ok(HttpResponse::Created().json(json!({
        "result": "Success",
        "message": "Transaction created and added to pending transactions. It will be added to the chain in the next block.",
        "transaction": transaction
    })))
}

/// Create a transaction and push it to every peer
#[utoipa::path(
    post,
    path = "/transactions/broadcast",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction created and broadcast"),
        (status = 400, description = "Missing field"),
        (status = 500, description = "A peer could not be reached; the transaction stays pending locally")
    )
)]
pub async fn broadcast_new_transaction(
    state: NodeData,
    request: web::Json<TransactionRequest>,
) -> ApiResult {
    let transaction = create_transaction(&state, &request)?;
    broadcast::broadcast_transaction(&state.peers, state.transport.as_ref(), &transaction).await?;

    Ok(HttpResponse::Created().json(json!({
        "result": "Success",
        "message": "Transaction created and broadcast successfully.",
        "transaction": transaction
    })))
}

/// Accept a transaction created by a peer
#[utoipa::path(
    post,
    path = "/transactions/receive",
    request_body = Transaction,
    responses(
        (status = 201, description = "Transaction added to the pending pool"),
        (status = 200, description = "Transaction already known")
    )
)]
pub async fn receive_transaction(state: NodeData, transaction: web::Json<Transaction>) -> HttpResponse {
    let transaction = transaction.into_inner();
    let transaction_id = transaction.transaction_id.clone();

    if state.ledger.add_transaction(transaction) {
        HttpResponse::Created().json(json!({
            "result": "Success",
            "message": format!("Transaction {} added to pending transactions.", transaction_id)
        }))
    } else {
        HttpResponse::Ok().json(json!({
            "result": "Success",
            "message": format!("Transaction {} is already known.", transaction_id)
        }))
    }
}

/// Hand every pending transaction over to the peers
#[utoipa::path(
    post,
    path = "/transactions/pending/broadcast",
    responses(
        (status = 200, description = "Pending transactions handed over"),
        (status = 400, description = "No pending transactions"),
        (status = 500, description = "A peer could not be reached; the pool is unchanged")
    )
)]
pub async fn broadcast_pending_transactions(state: NodeData) -> ApiResult {
    let transactions =
        broadcast::broadcast_pending(&state.ledger, &state.peers, state.transport.as_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "result": "Success",
        "message": format!("Broadcast {} pending transaction(s).", transactions.len()),
        "transactions": transactions
    })))
}

/// Get a mined transaction by id
#[utoipa::path(
    get,
    path = "/transactions/{transaction_id}",
    params(
        ("transaction_id" = String, Path, description = "Transaction id")
    ),
    responses(
        (status = 200, description = "Transaction found"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn get_transaction(state: NodeData, transaction_id: web::Path<String>) -> ApiResult {
    transaction_detail(&state, &transaction_id)
}

/// Get the transactions of a block
#[utoipa::path(
    get,
    path = "/transactions/block/{block_index}",
    params(
        ("block_index" = u64, Path, description = "1-based block index")
    ),
    responses(
        (status = 200, description = "Block transactions"),
        (status = 400, description = "Invalid block index"),
        (status = 404, description = "Block not found")
    )
)]
pub async fn get_block_transactions(state: NodeData, block_index: web::Path<u64>) -> ApiResult {
    let block_index = block_index.into_inner();
    let transactions = state
        .ledger
        .transactions_in_block(block_index)?
        .ok_or_else(|| ApiError::NotFound(format!("Block with index {} not found", block_index)))?;

    Ok(HttpResponse::Ok().json(json!({
        "result": "Success",
        "blockIndex": block_index,
        "transactions": transactions
    })))
}

/// Mine a new block
///
/// Creates a new block from the pending pool; the miner's reward is settled
/// by the following block
#[utoipa::path(
    post,
    path = "/mine",
    request_body = MineRequest,
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 400, description = "Missing miner address"),
        (status = 409, description = "The chain was replaced while mining")
    )
)]
pub async fn mine_block(state: NodeData, request: web::Json<MineRequest>) -> ApiResult {
    let miner_address = required(
        &request.miner_address,
        "A miner address is required to receive the mining reward.",
    )?;
    let block = state.ledger.mine_block(&miner_address).await?;

    Ok(HttpResponse::Ok().json(MineResponse {
        result: "Success".to_string(),
        message: "New block mined successfully!".to_string(),
        block,
    }))
}

/// Get the mining status
#[utoipa::path(
    get,
    path = "/mine/status",
    responses(
        (status = 200, description = "Mining status")
    )
)]
pub async fn mining_status(state: NodeData) -> HttpResponse {
    let miner_address = state.miner.miner_address().await;

    HttpResponse::Ok().json(json!({
        "result": "Success",
        "lastBlock": state.ledger.get_last_block(),
        "pendingTransactionsCount": state.ledger.get_pending_transactions().len(),
        "miningDifficulty": state.ledger.difficulty(),
        "isMiningActive": miner_address.is_some(),
        "minerAddress": miner_address
    }))
}

/// Start continuous mining
#[utoipa::path(
    post,
    path = "/mine/start",
    request_body = MineRequest,
    responses(
        (status = 200, description = "Continuous mining started"),
        (status = 400, description = "Missing miner address or already mining")
    )
)]
pub async fn start_mining(state: NodeData, request: web::Json<MineRequest>) -> ApiResult {
    let miner_address = required(
        &request.miner_address,
        "A miner address is required to start continuous mining.",
    )?;
    state.miner.start(&miner_address).await?;

    Ok(HttpResponse::Ok().json(json!({
        "result": "Success",
        "message": format!("Continuous mining started for miner {}.", miner_address)
    })))
}

/// Stop continuous mining
#[utoipa::path(
    post,
    path = "/mine/stop",
    responses(
        (status = 200, description = "Continuous mining stopped"),
        (status = 400, description = "No mining in progress")
    )
)]
pub async fn stop_mining(state: NodeData) -> ApiResult {
    let miner_address = state.miner.stop().await?;

    Ok(HttpResponse::Ok().json(json!({
        "result": "Success",
        "message": format!("Continuous mining stopped for miner {}.", miner_address)
    })))
}

/// Get the mining difficulty
#[utoipa::path(
    get,
    path = "/mine/difficulty",
    responses(
        (status = 200, description = "Current difficulty")
    )
)]
pub async fn get_difficulty(state: NodeData) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "result": "Success",
        "difficulty": state.ledger.difficulty()
    }))
}

/// Set the mining difficulty
#[utoipa::path(
    put,
    path = "/mine/difficulty",
    request_body = DifficultyRequest,
    responses(
        (status = 200, description = "Difficulty updated"),
        (status = 400, description = "Difficulty missing or outside 1 to 64")
    )
)]
pub async fn set_difficulty(state: NodeData, request: web::Json<DifficultyRequest>) -> ApiResult {
    let new_difficulty = request
        .new_difficulty
        .ok_or_else(|| ApiError::Validation("newDifficulty is required.".to_string()))?;
    let new_difficulty = usize::try_from(new_difficulty).map_err(|_| {
        ApiError::Validation(format!("Invalid difficulty {}: must be between 1 and 64", new_difficulty))
    })?;

    state.ledger.set_difficulty(new_difficulty)?;

    Ok(HttpResponse::Ok().json(json!({
        "result": "Success",
        "message": format!("Mining difficulty set to {}.", new_difficulty),
        "newDifficulty": new_difficulty
    })))
}

/// Register a node and broadcast it to the whole network
#[utoipa::path(
    post,
    path = "/nodes/register-and-broadcast-node",
    request_body = RegisterNodeRequest,
    responses(
        (status = 200, description = "Node registered and broadcast"),
        (status = 400, description = "Missing node URL"),
        (status = 500, description = "Broadcast failed; the node stays registered locally")
    )
)]
pub async fn register_and_broadcast_node(
    state: NodeData,
    request: web::Json<RegisterNodeRequest>,
) -> ApiResult {
    let new_node_url = required(&request.new_node_url, "newNodeUrl is required.")?;
    broadcast::register_and_broadcast(&state.peers, state.transport.as_ref(), &new_node_url).await?;

    Ok(HttpResponse::Ok().json(json!({
        "result": "Success",
        "message": "New node registered with network successfully."
    })))
}

/// Register a node announced by a peer
#[utoipa::path(
    post,
    path = "/nodes/register-node",
    request_body = RegisterNodeRequest,
    responses(
        (status = 200, description = "Node registered"),
        (status = 400, description = "Missing node URL")
    )
)]
pub async fn register_node(state: NodeData, request: web::Json<RegisterNodeRequest>) -> ApiResult {
    let new_node_url = required(&request.new_node_url, "newNodeUrl is required.")?;
    state.peers.register(&new_node_url)?;

    Ok(HttpResponse::Ok().json(json!({
        "result": "Success",
        "message": "New node registered successfully."
    })))
}

/// Register every node of an existing network at once
#[utoipa::path(
    post,
    path = "/nodes/register-nodes-bulk",
    request_body = RegisterNodesBulkRequest,
    responses(
        (status = 200, description = "Nodes registered")
    )
)]
pub async fn register_nodes_bulk(
    state: NodeData,
    request: web::Json<RegisterNodesBulkRequest>,
) -> HttpResponse {
    let added = state.peers.register_bulk(&request.all_network_nodes);

    HttpResponse::Ok().json(json!({
        "result": "Success",
        "message": format!("Bulk registration successful, {} new node(s).", added)
    }))
}

/// List the registered nodes
#[utoipa::path(
    get,
    path = "/nodes",
    responses(
        (status = 200, description = "Registered nodes")
    )
)]
pub async fn list_nodes(state: NodeData) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "result": "Success",
        "message": "Currently registered network nodes.",
        "networkNodes": state.peers.list()
    }))
}

/// Run the longest-valid-chain consensus against every peer
#[utoipa::path(
    get,
    path = "/nodes/consensus",
    responses(
        (status = 200, description = "Consensus outcome and resulting chain"),
        (status = 500, description = "No peer could be reached")
    )
)]
pub async fn run_consensus(state: NodeData) -> ApiResult {
    let outcome = consensus::resolve(&state.ledger, &state.peers, state.transport.as_ref()).await?;

    let message = match outcome {
        ConsensusOutcome::Replaced => "This chain has been replaced with the longest valid chain.",
        ConsensusOutcome::Unchanged => "Current chain has not been replaced.",
    };
    info!("Consensus finished: {:?}", outcome);

    Ok(HttpResponse::Ok().json(json!({
        "result": "Success",
        "message": message,
        "outcome": outcome,
        "chain": state.ledger.get_chain()
    })))
}

/// Get the transaction history of a product
#[utoipa::path(
    get,
    path = "/histories/{product_id}",
    params(
        ("product_id" = String, Path, description = "Product id")
    ),
    responses(
        (status = 200, description = "Product history"),
        (status = 404, description = "No transaction for this product")
    )
)]
pub async fn product_history(state: NodeData, product_id: web::Path<String>) -> ApiResult {
    let history = state.ledger.transactions_for_product(&product_id);
    not_found_if_empty(
        &history,
        format!("No transaction history found for productId: {}", product_id),
    )?;

    Ok(HttpResponse::Ok().json(json!({
        "result": "Success",
        "message": format!("Found {} transaction(s) for productId: {}", history.len(), product_id),
        "history": history
    })))
}

fn transaction_detail(state: &AppState, transaction_id: &str) -> ApiResult {
    let (transaction, block) = state
        .ledger
        .find_transaction(transaction_id)
        .ok_or_else(|| ApiError::NotFound(format!("Transaction {} could not be found", transaction_id)))?;

    Ok(HttpResponse::Ok().json(json!({
        "result": "Success",
        "transaction": transaction,
        "block": {
            "index": block.index,
            "hash": block.hash,
            "timestamp": block.timestamp
        }
    })))
}

/// Get a mined transaction and its block
#[utoipa::path(
    get,
    path = "/histories/transactions/{transaction_id}",
    params(
        ("transaction_id" = String, Path, description = "Transaction id")
    ),
    responses(
        (status = 200, description = "Transaction found"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn transaction_history(state: NodeData, transaction_id: web::Path<String>) -> ApiResult {
    transaction_detail(&state, &transaction_id)
}

/// Get every transaction sent or received by an address
#[utoipa::path(
    get,
    path = "/histories/address/{address}",
    params(
        ("address" = String, Path, description = "Sender or recipient address")
    ),
    responses(
        (status = 200, description = "Address history"),
        (status = 404, description = "No transaction for this address")
    )
)]
pub async fn address_history(state: NodeData, address: web::Path<String>) -> ApiResult {
    let transactions = state.ledger.transactions_for_address(&address);
    not_found_if_empty(
        &transactions,
        format!("No transaction history found for address: {}", address),
    )?;

    Ok(HttpResponse::Ok().json(json!({
        "result": "Success",
        "message": format!("Found {} transaction(s) for address: {}", transactions.len(), address),
        "transactions": transactions
    })))
}

/// Get a block by hash
#[utoipa::path(
    get,
    path = "/histories/block/{block_hash}",
    params(
        ("block_hash" = String, Path, description = "Block hash")
    ),
    responses(
        (status = 200, description = "Block found"),
        (status = 404, description = "Block not found")
    )
)]
pub async fn block_history(state: NodeData, block_hash: web::Path<String>) -> ApiResult {
    let block = state
        .ledger
        .find_block_by_hash(&block_hash)
        .ok_or_else(|| ApiError::NotFound(format!("Block with hash {} could not be found", block_hash)))?;

    Ok(HttpResponse::Ok().json(json!({ "result": "Success", "block": block })))
}

/// Get the most recent mined transactions, newest first
#[utoipa::path(
    get,
    path = "/histories/latest/{count}",
    params(
        ("count" = usize, Path, description = "Maximum number of transactions")
    ),
    responses(
        (status = 200, description = "Latest transactions"),
        (status = 400, description = "Invalid count"),
        (status = 404, description = "No mined transaction yet")
    )
)]
pub async fn latest_transactions(state: NodeData, count: web::Path<usize>) -> ApiResult {
    let transactions = state.ledger.latest_transactions(count.into_inner())?;
    not_found_if_empty(&transactions, "No latest transactions could be found".to_string())?;

    Ok(HttpResponse::Ok().json(json!({
        "result": "Success",
        "message": format!("Found {} latest transaction(s).", transactions.len()),
        "transactions": transactions
    })))
}
