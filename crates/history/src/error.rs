//! History error types.

use thiserror::Error;

/// Errors that can occur while reading order history.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// An error occurred in the order store.
    #[error("Order store error: {0}")]
    Store(#[from] order_store::OrderStoreError),

    /// A continuation cursor could not be parsed.
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
}

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;
