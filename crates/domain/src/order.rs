//! Immutable order records.

use chrono::{DateTime, Utc};
use common::{IdempotencyKey, OrderId};
use serde::{Deserialize, Serialize};

use crate::{CartSnapshot, DomainError, LineItem, Money, OwnerId};

/// An order that has been paid for but not yet written to storage.
///
/// The total is always computed here from the items; there is no way to hand
/// in a total from elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    idempotency_key: IdempotencyKey,
    owner_id: OwnerId,
    items: Vec<LineItem>,
    total: Money,
    payment_reference: String,
    created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Builds the order for a captured checkout from the cart snapshot it charged.
    pub fn from_snapshot(
        idempotency_key: IdempotencyKey,
        owner_id: OwnerId,
        snapshot: &CartSnapshot,
        payment_reference: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if snapshot.is_empty() {
            return Err(DomainError::EmptyOrder);
        }

        Ok(Self {
            idempotency_key,
            owner_id,
            items: snapshot.items().to_vec(),
            total: snapshot.total(),
            payment_reference: payment_reference.into(),
            created_at,
        })
    }

    pub fn idempotency_key(&self) -> IdempotencyKey {
        self.idempotency_key
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn payment_reference(&self) -> &str {
        &self.payment_reference
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Assigns the storage ID.
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            idempotency_key: self.idempotency_key,
            owner_id: self.owner_id,
            items: self.items,
            total: self.total,
            payment_reference: self.payment_reference,
            created_at: self.created_at,
        }
    }

    /// Returns true if a stored order records this same checkout.
    ///
    /// Timestamps are ignored: a retried commit builds its `NewOrder` later
    /// than the first attempt did.
    pub fn matches(&self, order: &Order) -> bool {
        self.idempotency_key == order.idempotency_key
            && self.owner_id == order.owner_id
            && self.total == order.total
            && self.items == order.items
    }
}

/// A committed order.
///
/// Never mutated after creation. Items are detached copies of the cart rows,
/// so the order outlives later cart and catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    idempotency_key: IdempotencyKey,
    owner_id: OwnerId,
    items: Vec<LineItem>,
    total: Money,
    payment_reference: String,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Rebuilds an order read back from storage.
    pub fn restore(
        id: OrderId,
        idempotency_key: IdempotencyKey,
        owner_id: OwnerId,
        items: Vec<LineItem>,
        total: Money,
        payment_reference: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            idempotency_key,
            owner_id,
            items,
            total,
            payment_reference,
            created_at,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn idempotency_key(&self) -> IdempotencyKey {
        self.idempotency_key
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn payment_reference(&self) -> &str {
        &self.payment_reference
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Number of units ordered.
    pub fn item_count(&self) -> u64 {
        crate::item_count(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cart, Category, Product};

    fn snapshot() -> CartSnapshot {
        let mut cart = Cart::new();
        let widget = Product::new("SKU-1", "Widget", Money::from_units(10), Category::Digital)
            .unwrap();
        cart.add(&widget, 2);
        cart.snapshot()
    }

    #[test]
    fn test_total_computed_from_items() {
        let order = NewOrder::from_snapshot(
            IdempotencyKey::new(),
            OwnerId::new("uid-1"),
            &snapshot(),
            "PAY-0001",
            Utc::now(),
        )
        .unwrap();

        assert_eq!(order.total(), Money::from_cents(2000));
        assert_eq!(order.items().len(), 1);
    }

    #[test]
    fn test_empty_snapshot_rejected() {
        let result = NewOrder::from_snapshot(
            IdempotencyKey::new(),
            OwnerId::new("uid-1"),
            &CartSnapshot::default(),
            "PAY-0001",
            Utc::now(),
        );
        assert_eq!(result, Err(DomainError::EmptyOrder));
    }

    #[test]
    fn test_into_order_preserves_fields() {
        let key = IdempotencyKey::new();
        let new_order =
            NewOrder::from_snapshot(key, OwnerId::new("uid-1"), &snapshot(), "PAY-7", Utc::now())
                .unwrap();
        let id = OrderId::new();
        let order = new_order.clone().into_order(id);

        assert_eq!(order.id(), id);
        assert_eq!(order.idempotency_key(), key);
        assert_eq!(order.payment_reference(), "PAY-7");
        assert_eq!(order.item_count(), 2);
        assert!(new_order.matches(&order));
    }

    #[test]
    fn test_matches_ignores_timestamp_but_not_content() {
        let key = IdempotencyKey::new();
        let owner = OwnerId::new("uid-1");
        let first = NewOrder::from_snapshot(key, owner.clone(), &snapshot(), "PAY-1", Utc::now())
            .unwrap();
        let stored = first.into_order(OrderId::new());

        let retry = NewOrder::from_snapshot(
            key,
            owner,
            &snapshot(),
            "PAY-1",
            Utc::now() + chrono::Duration::seconds(5),
        )
        .unwrap();
        assert!(retry.matches(&stored));

        let other_owner =
            NewOrder::from_snapshot(key, OwnerId::new("uid-2"), &snapshot(), "PAY-1", Utc::now())
                .unwrap();
        assert!(!other_owner.matches(&stored));
    }
}
