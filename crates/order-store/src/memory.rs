use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use domain::{NewOrder, Order};
use tokio::sync::RwLock;

use crate::{
    IdempotencyKey, OrderId, OrderQuery, OrderStoreError, Result, SeekKey,
    store::{CreateOutcome, OrderStore, validate_new_order},
};

/// Injected failure for the next `create` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Fail without writing anything.
    BeforeWrite,
    /// Write the order, then report failure as if the acknowledgement was lost.
    AfterWrite,
}

#[derive(Debug, Default)]
struct State {
    orders: Vec<Order>,
    by_key: HashMap<IdempotencyKey, usize>,
    pending_failures: VecDeque<FailureMode>,
}

/// In-memory order store implementation for testing.
///
/// This implementation keeps all orders in memory and provides the same
/// interface as the PostgreSQL implementation. Failures can be queued with
/// [`InMemoryOrderStore::fail_next_create`].
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Queues a failure for the next `create` call. Calls queue in order.
    pub async fn fail_next_create(&self, mode: FailureMode) {
        self.state.write().await.pending_failures.push_back(mode);
    }

    /// Clears all orders and queued failures.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.orders.clear();
        state.by_key.clear();
        state.pending_failures.clear();
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<CreateOutcome> {
        validate_new_order(&order)?;

        let key = order.idempotency_key();
        let mut state = self.state.write().await;
        let failure = state.pending_failures.pop_front();

        if failure == Some(FailureMode::BeforeWrite) {
            tracing::warn!(%key, "Injected order store failure before write");
            return Err(OrderStoreError::Unavailable(
                "injected failure before write".to_string(),
            ));
        }

        let existing_index = state.by_key.get(&key).copied();
        let outcome = match existing_index {
            Some(index) => {
                let existing = state.orders[index].clone();
                if !order.matches(&existing) {
                    return Err(OrderStoreError::KeyConflict { key });
                }
                CreateOutcome::Existing(existing)
            }
            None => {
                let stored = order.into_order(OrderId::new());
                let index = state.orders.len();
                state.orders.push(stored.clone());
                state.by_key.insert(key, index);
                CreateOutcome::Created(stored)
            }
        };

        if failure == Some(FailureMode::AfterWrite) {
            tracing::warn!(%key, "Injected order store failure after write");
            return Err(OrderStoreError::Unavailable(
                "write not acknowledged".to_string(),
            ));
        }

        metrics::counter!("order_store_writes_total", "outcome" => outcome.as_str()).increment(1);
        Ok(outcome)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.id() == id).cloned())
    }

    async fn find_by_key(&self, key: IdempotencyKey) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.by_key.get(&key).map(|&index| state.orders[index].clone()))
    }

    async fn query(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .iter()
            .filter(|o| query.admits(o))
            .cloned()
            .collect();

        orders.sort_by(|a, b| SeekKey::of(a).cmp_in(&SeekKey::of(b), query.sort));

        if let Some(limit) = query.limit {
            orders.truncate(limit);
        }

        Ok(orders)
    }
}
