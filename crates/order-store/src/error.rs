use thiserror::Error;

use crate::IdempotencyKey;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// An order already exists under this idempotency key but records a
    /// different checkout (other owner, items, or total).
    #[error("Idempotency key {key} is already used by a different order")]
    KeyConflict { key: IdempotencyKey },

    /// The order failed validation before being written.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// The store could not be reached or did not confirm the write.
    #[error("Order store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrderStoreError {
    /// Returns true if repeating the same write may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OrderStoreError::Unavailable(_) | OrderStoreError::Database(_)
        )
    }
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, OrderStoreError>;
