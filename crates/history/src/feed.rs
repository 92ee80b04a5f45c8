//! Accumulating "load more" view over one owner's history.

use domain::{Order, OwnerId};
use order_store::{OrderStore, SortKey};

use crate::{Cursor, OrderHistoryReader, Result};

/// The history of one owner, loaded a page at a time and accumulated.
///
/// Each call to [`OrderHistoryFeed::load_more`] continues from where the
/// previous page stopped. Changing the sort key drops everything loaded so
/// far and starts a new cursor series.
pub struct OrderHistoryFeed<S: OrderStore> {
    reader: OrderHistoryReader<S>,
    owner_id: OwnerId,
    sort: SortKey,
    page_size: usize,
    orders: Vec<Order>,
    cursor: Option<Cursor>,
    has_more: bool,
}

impl<S: OrderStore> OrderHistoryFeed<S> {
    pub fn new(reader: OrderHistoryReader<S>, owner_id: OwnerId, page_size: usize) -> Self {
        Self {
            reader,
            owner_id,
            sort: SortKey::default(),
            page_size,
            orders: Vec::new(),
            cursor: None,
            has_more: true,
        }
    }

    /// Loads the next page and returns the newly appended orders.
    ///
    /// Once a short page has been seen, returns an empty slice without
    /// reading again.
    pub async fn load_more(&mut self) -> Result<&[Order]> {
        if !self.has_more {
            return Ok(&[]);
        }

        let page = self
            .reader
            .page(&self.owner_id, self.sort, self.cursor.as_ref(), self.page_size)
            .await?;

        let start = self.orders.len();
        self.has_more = page.has_more;
        if page.cursor.is_some() {
            self.cursor = page.cursor;
        }
        self.orders.extend(page.orders);

        Ok(&self.orders[start..])
    }

    /// Switches ordering and clears loaded orders. No-op if unchanged.
    pub fn set_sort_key(&mut self, sort: SortKey) {
        if sort != self.sort {
            self.sort = sort;
            self.reset();
        }
    }

    /// Forgets loaded orders so the next load starts from the first page.
    pub fn reset(&mut self) {
        self.orders.clear();
        self.cursor = None;
        self.has_more = true;
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }
}
