//! Checkout error types.

use domain::DomainError;
use order_store::OrderStoreError;
use thiserror::Error;

use crate::attempt::PendingCommit;
use crate::state::CheckoutState;

/// The checkout could not start. No collaborator was contacted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("No authenticated owner")]
    MissingIdentity,
}

/// The payment was not captured. The cart is intact and a new attempt may
/// start from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The gateway refused the charge.
    #[error("Payment declined: {0}")]
    Declined(String),

    /// The shopper cancelled before the order was recorded.
    #[error("Payment cancelled")]
    Cancelled,

    /// The gateway could not be reached or answered with an error.
    #[error("Payment gateway error: {0}")]
    Gateway(String),
}

/// The payment was captured but the order was not recorded.
///
/// Carries the [`PendingCommit`] needed to retry the write. Retrying never
/// charges again.
#[derive(Debug, Error)]
#[error("Payment {} captured but the order was not recorded: {source}", .pending.reference())]
pub struct CommitError {
    pending: PendingCommit,
    source: OrderStoreError,
}

impl CommitError {
    pub fn new(pending: PendingCommit, source: OrderStoreError) -> Self {
        Self { pending, source }
    }

    pub fn pending(&self) -> &PendingCommit {
        &self.pending
    }

    pub fn into_pending(self) -> PendingCommit {
        self.pending
    }

    pub fn store_error(&self) -> &OrderStoreError {
        &self.source
    }
}

/// Errors that can occur during checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    /// Another attempt in this session has not finished.
    #[error("A checkout is already in progress ({state})")]
    InProgress { state: CheckoutState },

    /// Cancellation is only possible while awaiting payment.
    #[error("Checkout cannot be cancelled while {state}")]
    NotCancellable { state: CheckoutState },

    /// A captured payment is still waiting for its order; retry the commit.
    #[error("Payment {reference} is awaiting a commit retry")]
    CommitPending { reference: String },

    /// There is no captured payment waiting for a commit.
    #[error("No pending commit to retry")]
    NothingToRetry,

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl CheckoutError {
    /// Short failure label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            CheckoutError::Precondition(_) => "precondition",
            CheckoutError::Payment(PaymentError::Cancelled) => "cancelled",
            CheckoutError::Payment(_) => "payment",
            CheckoutError::Commit(_) => "commit",
            CheckoutError::InProgress { .. } => "in_progress",
            CheckoutError::NotCancellable { .. } => "not_cancellable",
            CheckoutError::CommitPending { .. } => "commit_pending",
            CheckoutError::NothingToRetry => "nothing_to_retry",
            CheckoutError::Domain(_) => "domain",
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
