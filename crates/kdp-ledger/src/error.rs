//! Error taxonomy for the ledger library
//!
//! Degraded rows are not errors: the extractor fills them with placeholders
//! and logs a warning. Everything here propagates to the caller unmodified.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The document could not be turned into a tree at all
    #[error("Failed to parse HTML: {0}")]
    Parse(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    /// Transaction or query failure; the pass was rolled back
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn royalty_not_found(id: i64) -> Self {
        Self::NotFound { entity: "Royalty", id }
    }

    pub fn portfolio_not_found(id: i64) -> Self {
        Self::NotFound { entity: "Portfolio", id }
    }

    /// Errors caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::NotFound { .. } | Self::Conflict(_))
    }
}
