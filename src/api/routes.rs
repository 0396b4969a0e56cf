use actix_web::web;

use super::error::{json_config, path_config};
use super::handlers;

/// Configures the API routes
///
/// Fixed paths are registered before the parameterised ones sharing their
/// prefix, otherwise `/transactions/{transaction_id}` would answer them.
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .route("/", web::get().to(handlers::index))
        .route("/blockchain", web::get().to(handlers::get_blockchain))
        .route("/blockchain/last-block", web::get().to(handlers::get_last_block))
        .route("/blockchain/block/{block_index}", web::get().to(handlers::get_block_by_index))
        .route("/validate", web::get().to(handlers::validate_chain))
        .route("/transactions", web::get().to(handlers::get_pending_transactions))
        .route("/transactions", web::post().to(handlers::new_transaction))
        .route("/transactions/broadcast", web::post().to(handlers::broadcast_new_transaction))
        .route("/transactions/receive", web::post().to(handlers::receive_transaction))
        .route(
            "/transactions/pending/broadcast",
            web::post().to(handlers::broadcast_pending_transactions),
        )
        .route("/transactions/block/{block_index}", web::get().to(handlers::get_block_transactions))
        .route("/transactions/{transaction_id}", web::get().to(handlers::get_transaction))
        .route("/mine", web::post().to(handlers::mine_block))
        .route("/mine/status", web::get().to(handlers::mining_status))
        .route("/mine/start", web::post().to(handlers::start_mining))
        .route("/mine/stop", web::post().to(handlers::stop_mining))
        .route("/mine/difficulty", web::get().to(handlers::get_difficulty))
        .route("/mine/difficulty", web::put().to(handlers::set_difficulty))
        .route("/nodes", web::get().to(handlers::list_nodes))
        .route(
            "/nodes/register-and-broadcast-node",
            web::post().to(handlers::register_and_broadcast_node),
        )
        .route("/nodes/register-node", web::post().to(handlers::register_node))
        .route("/nodes/register-nodes-bulk", web::post().to(handlers::register_nodes_bulk))
        .route("/nodes/consensus", web::get().to(handlers::run_consensus))
        .route("/histories/transactions/{transaction_id}", web::get().to(handlers::transaction_history))
        .route("/histories/address/{address}", web::get().to(handlers::address_history))
        .route("/histories/block/{block_hash}", web::get().to(handlers::block_history))
        .route("/histories/latest/{count}", web::get().to(handlers::latest_transactions))
        .route("/histories/{product_id}", web::get().to(handlers::product_history));
}
