//! The line item store.

use serde::{Deserialize, Serialize};

use super::totals;
use crate::{LineItem, Money, Product, ProductId};

/// The mutable, pre-checkout collection of line items for one session.
///
/// Rows are keyed by product ID: adding a product that is already present
/// merges into the existing row. Quantities never drop below 1; a row only
/// disappears through [`Cart::remove`] or [`Cart::clear`]. None of the
/// operations fail. Unknown product IDs and out-of-range quantities are
/// normalized, since they come from benign UI races.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    /// Rows in insertion order.
    items: Vec<LineItem>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` units of a product, merging with an existing row.
    pub fn add(&mut self, product: &Product, quantity: i64) {
        match self.position(&product.id) {
            Some(index) => self.items[index].increase(quantity),
            None => self.items.push(LineItem::from_product(product, quantity)),
        }
    }

    /// Replaces the quantity of an existing row, floored at 1.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: i64) {
        if let Some(index) = self.position(product_id) {
            self.items[index].set_quantity(quantity);
        }
    }

    /// Steps the quantity of an existing row by `delta`, floored at 1.
    pub fn adjust_quantity(&mut self, product_id: &ProductId, delta: i64) {
        if let Some(index) = self.position(product_id) {
            self.items[index].adjust(delta);
        }
    }

    /// Removes a row. Absent rows are ignored.
    pub fn remove(&mut self, product_id: &ProductId) {
        self.items.retain(|item| item.product_id() != product_id);
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Takes the units recorded in `snapshot` out of the cart.
    ///
    /// Rows added after the snapshot, and units added to a row since, stay.
    /// A row whose quantity does not exceed the snapshot's is removed.
    pub fn remove_snapshot(&mut self, snapshot: &CartSnapshot) {
        for ordered in snapshot.items() {
            let Some(index) = self.position(ordered.product_id()) else {
                continue;
            };
            match self.items[index].quantity().checked_sub(ordered.quantity()) {
                Some(remaining) if remaining > 0 => {
                    self.items[index].set_quantity(i64::from(remaining));
                }
                _ => {
                    self.items.remove(index);
                }
            }
        }
    }

    /// Returns an immutable copy of the current rows.
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
        }
    }

    /// Returns the row for a product, if present.
    pub fn get(&self, product_id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.product_id() == product_id)
    }

    /// Returns all rows in insertion order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct products.
    pub fn distinct_count(&self) -> usize {
        self.items.len()
    }

    /// Number of units across all rows.
    pub fn item_count(&self) -> u64 {
        totals::item_count(&self.items)
    }

    pub fn total(&self) -> Money {
        totals::cart_total(&self.items)
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product_id() == product_id)
    }
}

/// A frozen view of a cart's rows.
///
/// Checkout works from a snapshot so that the amount charged and the order
/// recorded describe exactly the same rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    items: Vec<LineItem>,
}

impl CartSnapshot {
    /// Builds a snapshot from rows, merging duplicate product IDs.
    pub fn from_items(items: impl IntoIterator<Item = LineItem>) -> Self {
        let mut merged: Vec<LineItem> = Vec::new();
        for item in items {
            match merged
                .iter_mut()
                .find(|existing| existing.product_id() == item.product_id())
            {
                Some(existing) => existing.increase(i64::from(item.quantity())),
                None => merged.push(item),
            }
        }
        Self { items: merged }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Server-side total of the snapshot.
    pub fn total(&self) -> Money {
        totals::cart_total(&self.items)
    }

    pub fn item_count(&self) -> u64 {
        totals::item_count(&self.items)
    }
}
