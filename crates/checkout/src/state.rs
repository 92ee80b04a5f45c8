//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The state of a session's checkout.
///
/// State transitions:
/// ```text
/// Idle ──► AwaitingPayment ──┬──► Committing ──┬──► Completed
///                            │                 └──► Failed
///                            └──► Failed
/// ```
/// A new attempt may start from `Idle`, `Completed` or `Failed`. A commit-only
/// retry re-enters `Committing` from `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    /// No checkout has run in this session yet.
    #[default]
    Idle,

    /// Waiting for the payment gateway to capture the total.
    AwaitingPayment,

    /// Payment captured; the order is being written.
    Committing,

    /// The order was recorded and the cart cleared.
    Completed,

    /// The attempt failed; the cart is intact.
    Failed,
}

impl CheckoutState {
    /// Returns true if a new checkout attempt may start.
    pub fn can_begin(&self) -> bool {
        matches!(
            self,
            CheckoutState::Idle | CheckoutState::Completed | CheckoutState::Failed
        )
    }

    /// Returns true if the attempt may be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, CheckoutState::AwaitingPayment)
    }

    /// Returns true while a remote call is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            CheckoutState::AwaitingPayment | CheckoutState::Committing
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Completed | CheckoutState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::AwaitingPayment => "awaiting_payment",
            CheckoutState::Committing => "committing",
            CheckoutState::Completed => "completed",
            CheckoutState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
