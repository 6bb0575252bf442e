//! Error types for the presale trading agent

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Contract interface unavailable: {0}")]
    AbiUnavailable(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Receipt not found within timeout for transaction {0}")]
    ReceiptTimeout(String),
}

/// Classification driving retry behavior in the executor and the loop.
///
/// The executor never inspects error text; the chain and venue adapters
/// translate provider failures into `Error` variants at the boundary and
/// everything downstream branches on this kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Retried with fixed backoff, never fatal.
    Transient,
    /// The action cannot succeed as attempted; abort it, keep the loop alive.
    NonRetryable,
    /// Broken configuration or environment; continuing would decide on bad data.
    Fatal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Rpc(_) | Error::Network(_) | Error::ReceiptTimeout(_) => ErrorKind::Transient,
            Error::InsufficientBalance(_) => ErrorKind::NonRetryable,
            Error::Json(_) | Error::Config(_) | Error::AbiUnavailable(_) | Error::Wallet(_) => {
                ErrorKind::Fatal
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

pub type Result<T> = std::result::Result<T, Error>;
