//! Keyset-paginated reads over committed orders.

use common::OrderId;
use domain::{Order, OwnerId};
use order_store::{OrderStore, OrderStoreExt, SortKey};
use serde::Serialize;

use crate::{Cursor, Result};

/// Upper bound on page size unless configured otherwise.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 50;

/// One page of an owner's order history.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    /// Position after the last order of this page.
    #[serde(serialize_with = "serialize_cursor")]
    pub cursor: Option<Cursor>,
    /// True iff the page came back full, so a next page may exist.
    pub has_more: bool,
}

fn serialize_cursor<S: serde::Serializer>(
    cursor: &Option<Cursor>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match cursor {
        Some(cursor) => serializer.collect_str(cursor),
        None => serializer.serialize_none(),
    }
}

/// Read path over the order collection.
///
/// Stateless between calls: continuation state lives in the [`Cursor`] the
/// caller passes back.
#[derive(Clone)]
pub struct OrderHistoryReader<S: OrderStore> {
    store: S,
    max_page_size: usize,
}

impl<S: OrderStore> OrderHistoryReader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Sets the page size ceiling. Zero is treated as one.
    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// Fetches up to `page_size` of the owner's orders, descending by `sort`.
    ///
    /// A cursor minted under a different sort key is discarded and the first
    /// page is returned.
    #[tracing::instrument(skip(self, owner_id, cursor), fields(owner_id = %owner_id))]
    pub async fn page(
        &self,
        owner_id: &OwnerId,
        sort: SortKey,
        cursor: Option<&Cursor>,
        page_size: usize,
    ) -> Result<OrderPage> {
        let page_size = page_size.clamp(1, self.max_page_size);

        let after = match cursor {
            Some(c) if c.sort_key() == sort => Some(c.position()),
            Some(c) => {
                tracing::debug!(
                    cursor_sort = %c.sort_key(),
                    "Discarding cursor from another ordering"
                );
                None
            }
            None => None,
        };

        let orders = self
            .store
            .query_by_owner(owner_id, sort, after, page_size)
            .await?;

        let has_more = orders.len() == page_size;
        let cursor = orders.last().map(|o| Cursor::after(sort, o));

        metrics::counter!("history_pages_total", "sort" => sort.as_str()).increment(1);
        tracing::debug!(returned = orders.len(), has_more, "History page read");

        Ok(OrderPage {
            orders,
            cursor,
            has_more,
        })
    }

    /// Every order across all owners. Role checks are the caller's concern.
    #[tracing::instrument(skip(self))]
    pub async fn all_orders(&self, sort: SortKey) -> Result<Vec<Order>> {
        Ok(self.store.all_orders(sort).await?)
    }

    /// One order, visible only to its owner.
    pub async fn order(&self, owner_id: &OwnerId, order_id: OrderId) -> Result<Option<Order>> {
        let order = self.store.get(order_id).await?;
        Ok(order.filter(|o| o.owner_id() == owner_id))
    }
}
