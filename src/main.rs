use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use log::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod blockchain;
mod config;

use api::AppState;
use blockchain::{ContinuousMiner, HttpTransport, Ledger, PeerRegistry};
use config::NodeConfig;

// Build the node state from the configuration
fn initialize_node(config: &NodeConfig) -> std::io::Result<AppState> {
    let ledger = Ledger::with_difficulty(config.difficulty)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
    let ledger = Arc::new(ledger);

    let peers = PeerRegistry::new(config.node_url.clone());
    for peer in &config.bootstrap_peers {
        match peers.register(peer) {
            Ok(true) => info!("Registered bootstrap peer {}", peer),
            Ok(false) => {}
            Err(err) => warn!("Skipping bootstrap peer {}: {}", peer, err),
        }
    }

    if peers.is_empty() {
        warn!("No peers configured; consensus stays unavailable until a node registers");
    }

    let transport = HttpTransport::new(config.peer_timeout)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    let miner = ContinuousMiner::new(ledger.clone(), config.mining_interval);

    info!(
        "Node {} starts with difficulty {} and {} peer(s)",
        peers.node_address(),
        ledger.difficulty(),
        peers.len()
    );

    Ok(AppState::new(ledger, peers, Arc::new(transport), miner))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::index,
        api::handlers::get_blockchain,
        api::handlers::get_last_block,
        api::handlers::get_block_by_index,
        api::handlers::validate_chain,
        api::handlers::get_pending_transactions,
        api::handlers::new_transaction,
        api::handlers::broadcast_new_transaction,
        api::handlers::receive_transaction,
        api::handlers::broadcast_pending_transactions,
        api::handlers::get_transaction,
        api::handlers::get_block_transactions,
        api::handlers::mine_block,
        api::handlers::mining_status,
        api::handlers::start_mining,
        api::handlers::stop_mining,
        api::handlers::get_difficulty,
        api::handlers::set_difficulty,
        api::handlers::register_and_broadcast_node,
        api::handlers::register_node,
        api::handlers::register_nodes_bulk,
        api::handlers::list_nodes,
        api::handlers::run_consensus,
        api::handlers::product_history,
        api::handlers::transaction_history,
        api::handlers::address_history,
        api::handlers::block_history,
        api::handlers::latest_transactions
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::ChainSnapshot,
            blockchain::transport::RegisterNodeRequest,
            blockchain::transport::RegisterNodesBulkRequest,
            api::handlers::TransactionRequest,
            api::handlers::MineRequest,
            api::handlers::MineResponse,
            api::handlers::DifficultyRequest
        )
    ),
    tags(
        (name = "ledger", description = "Product ledger node endpoints")
    ),
    info(
        title = "Product Ledger API",
        version = "1.0.0",
        description = "A proof-of-work ledger recording product handovers",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = NodeConfig::from_env()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
    let state = web::Data::new(initialize_node(&config)?);

    info!("Starting HTTP server at http://{}:{}", config.host, config.port);

    // Start HTTP server
    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        // Configure OpenAPI documentation
        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            // API routes
            .configure(api::configure_routes)
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
