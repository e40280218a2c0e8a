use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session expired")]
    SessionExpired,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Stored token cannot be sent as a header")]
    InvalidToken,

    #[error("Invalid backend URL {0}")]
    InvalidBaseUrl(String),

    #[error("Session storage error: {0}")]
    Storage(#[from] StoreError),
}
