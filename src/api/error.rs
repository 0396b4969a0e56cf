use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use thiserror::Error;

use crate::blockchain::broadcast::BroadcastError;
use crate::blockchain::{ConsensusError, LedgerError, MinerError, PeerError};

/// Errors returned by the API handlers
///
/// Every variant renders as `{"result": "Fail", "error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Miner(#[from] MinerError),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Peer(_) | ApiError::Miner(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Ledger(err) => match err {
                LedgerError::InvalidMiner
                | LedgerError::InvalidDifficulty(_)
                | LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
                LedgerError::TipMoved { .. } | LedgerError::StaleReplacement { .. } => StatusCode::CONFLICT,
                LedgerError::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Consensus(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Broadcast(err) => match err {
                BroadcastError::InvalidPeer(_)
                | BroadcastError::NothingToBroadcast
                | BroadcastError::NoPeers => StatusCode::BAD_REQUEST,
                BroadcastError::Unreachable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "result": "Fail",
            "error": self.to_string()
        }))
    }
}

/// JSON body extractor settings answering malformed bodies with a 400
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::Validation(format!("Invalid request body: {}", err)).into())
}

/// Path extractor settings answering malformed segments with a 400
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| ApiError::Validation(format!("Invalid path parameter: {}", err)).into())
}
