//! Checkout attempt records.

use chrono::{DateTime, Utc};
use common::{IdempotencyKey, OrderId};
use domain::{CartSnapshot, DomainError, Money, NewOrder, OwnerId};
use serde::{Deserialize, Serialize};

use crate::gateway::PaymentCapture;
use crate::state::CheckoutState;

/// A captured payment whose order has not been recorded yet.
///
/// Holds everything needed to build the order again, so the commit can be
/// retried, possibly from another process, without contacting the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommit {
    idempotency_key: IdempotencyKey,
    owner_id: OwnerId,
    snapshot: CartSnapshot,
    capture: PaymentCapture,
    captured_at: DateTime<Utc>,
}

impl PendingCommit {
    pub fn new(
        idempotency_key: IdempotencyKey,
        owner_id: OwnerId,
        snapshot: CartSnapshot,
        capture: PaymentCapture,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            idempotency_key,
            owner_id,
            snapshot,
            capture,
            captured_at,
        }
    }

    pub fn idempotency_key(&self) -> IdempotencyKey {
        self.idempotency_key
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn snapshot(&self) -> &CartSnapshot {
        &self.snapshot
    }

    pub fn capture(&self) -> &PaymentCapture {
        &self.capture
    }

    /// The gateway's reference for the captured payment.
    pub fn reference(&self) -> &str {
        &self.capture.reference
    }

    /// Amount charged.
    pub fn amount(&self) -> Money {
        self.capture.amount
    }

    /// Builds the order to write. Every call yields the same order, so
    /// repeated commits are recognized by the store.
    pub fn to_new_order(&self) -> Result<NewOrder, DomainError> {
        NewOrder::from_snapshot(
            self.idempotency_key,
            self.owner_id.clone(),
            &self.snapshot,
            self.capture.reference.clone(),
            self.captured_at,
        )
    }
}

/// Summary of a session's latest checkout.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckoutStatus {
    pub state: CheckoutState,
    pub idempotency_key: Option<IdempotencyKey>,
    /// The order recorded by the latest completed attempt.
    pub order_id: Option<OrderId>,
    /// Reference of a captured payment still awaiting its order.
    pub pending_reference: Option<String>,
    pub last_error: Option<String>,
}
