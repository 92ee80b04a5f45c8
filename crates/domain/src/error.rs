//! Domain error types.

use thiserror::Error;

use crate::Money;

/// Errors raised while building catalog products or order snapshots.
///
/// Cart mutations never fail; these only cover data entering from the
/// catalog side or a checkout that has nothing to record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// Product prices must not be negative.
    #[error("Invalid price: {price} (must not be negative)")]
    NegativePrice { price: Money },

    /// The category name is not one the storefront sells.
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// The condition name is not recognised.
    #[error("Unknown condition: {0}")]
    UnknownCondition(String),

    /// An order needs at least one line item.
    #[error("Order has no items")]
    EmptyOrder,
}
