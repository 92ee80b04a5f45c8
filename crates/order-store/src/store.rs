use std::collections::HashSet;

use async_trait::async_trait;
use domain::{NewOrder, Order, OwnerId, cart_total};

use crate::{IdempotencyKey, OrderId, OrderQuery, OrderStoreError, Result, SeekKey, SortKey};

/// What a conditional insert did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The order was written by this call.
    Created(Order),
    /// An order with the same idempotency key was already stored; nothing
    /// was written and the stored order is returned.
    Existing(Order),
}

impl CreateOutcome {
    pub fn order(&self) -> &Order {
        match self {
            CreateOutcome::Created(order) | CreateOutcome::Existing(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            CreateOutcome::Created(order) | CreateOutcome::Existing(order) => order,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }

    /// Outcome label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateOutcome::Created(_) => "created",
            CreateOutcome::Existing(_) => "existing",
        }
    }
}

/// Core trait for order storage.
///
/// The order collection is append-only: orders are created once and never
/// updated or deleted through this trait. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes an order unless one with the same idempotency key exists.
    ///
    /// A repeated call with the same key returns
    /// [`CreateOutcome::Existing`] carrying the stored order. If the stored
    /// order records a different checkout, fails with `KeyConflict`.
    async fn create(&self, order: NewOrder) -> Result<CreateOutcome>;

    /// Retrieves an order by ID.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Retrieves the order written under an idempotency key.
    async fn find_by_key(&self, key: IdempotencyKey) -> Result<Option<Order>>;

    /// Retrieves orders matching a query, in the query's sort order.
    async fn query(&self, query: OrderQuery) -> Result<Vec<Order>>;
}

/// Extension trait providing convenience methods for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Creates an order and returns the stored record, whether new or existing.
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        Ok(self.create(order).await?.into_order())
    }

    /// One page of an owner's orders, listed after `after` if given.
    async fn query_by_owner(
        &self,
        owner_id: &OwnerId,
        sort: SortKey,
        after: Option<SeekKey>,
        page_size: usize,
    ) -> Result<Vec<Order>> {
        let mut query = OrderQuery::for_owner(owner_id.clone())
            .sort(sort)
            .limit(page_size);
        query.after = after;
        self.query(query).await
    }

    /// Every stored order across all owners.
    async fn all_orders(&self, sort: SortKey) -> Result<Vec<Order>> {
        self.query(OrderQuery::new().sort(sort)).await
    }

    /// Checks if an order exists for an idempotency key.
    async fn contains_key(&self, key: IdempotencyKey) -> Result<bool> {
        Ok(self.find_by_key(key).await?.is_some())
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}

/// Validates an order before it is written.
///
/// `NewOrder` already computes its own total, but stores may receive orders
/// deserialized from elsewhere, so the invariants are checked again here.
pub fn validate_new_order(order: &NewOrder) -> std::result::Result<(), OrderStoreError> {
    if order.items().is_empty() {
        return Err(OrderStoreError::InvalidOrder(
            "order has no items".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for item in order.items() {
        if item.quantity() == 0 {
            return Err(OrderStoreError::InvalidOrder(format!(
                "item {} has zero quantity",
                item.product_id()
            )));
        }
        if item.unit_price().is_negative() {
            return Err(OrderStoreError::InvalidOrder(format!(
                "item {} has a negative price",
                item.product_id()
            )));
        }
        if !seen.insert(item.product_id()) {
            return Err(OrderStoreError::InvalidOrder(format!(
                "item {} appears more than once",
                item.product_id()
            )));
        }
    }

    let expected = cart_total(order.items());
    if order.total() != expected {
        return Err(OrderStoreError::InvalidOrder(format!(
            "total {} does not match items ({expected})",
            order.total()
        )));
    }

    Ok(())
}
