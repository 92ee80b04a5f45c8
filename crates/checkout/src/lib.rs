//! Checkout coordination for one shopping session.
//!
//! A checkout runs two remote calls strictly in sequence:
//! 1. Capture the cart total through the [`PaymentGateway`]
//! 2. Record the order through the order store, keyed by the attempt's
//!    idempotency key
//!
//! A failed capture leaves the cart untouched. A failed commit after a
//! successful capture keeps a [`PendingCommit`] so the order can be recorded
//! later without charging again.

pub mod attempt;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod state;

pub use attempt::{CheckoutStatus, PendingCommit};
pub use coordinator::CheckoutCoordinator;
pub use error::{CheckoutError, CommitError, PaymentError, PreconditionError, Result};
pub use gateway::{InMemoryPaymentGateway, PaymentCapture, PaymentGateway};
pub use state::CheckoutState;
