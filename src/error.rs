use alloy_primitives::B256;
use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("ABI error: {0}")]
    Abi(#[from] alloy_dyn_abi::Error),

    /// The log source failed or ended. Fatal to the ingestion loop.
    #[error("Log stream failure: {0}")]
    StreamFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Failure to turn one raw log into a typed event. Always local to that record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("log carries no topics")]
    MissingSignature,

    #[error("unknown event signature {0}")]
    UnknownEvent(B256),

    #[error("{event}: bad indexed topics: {reason}")]
    TopicDecode { event: &'static str, reason: String },

    #[error("{event}: bad payload: {reason}")]
    PayloadDecode { event: &'static str, reason: String },
}
