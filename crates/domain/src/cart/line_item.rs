//! A single product row in a cart or order.

use serde::{Deserialize, Serialize};

use crate::{Money, Product, ProductId};

/// One product and its quantity.
///
/// `name` and `unit_price` are copied from the catalog when the row is
/// created and never re-read, so price changes do not reach an open cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    product_id: ProductId,
    name: String,
    unit_price: Money,
    quantity: u32,
}

impl LineItem {
    /// Creates a line item; quantities below 1 become 1.
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            quantity: clamp_quantity(quantity),
        }
    }

    /// Snapshots a catalog product.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        Self::new(
            product.id.clone(),
            product.name.clone(),
            product.unit_price,
            quantity,
        )
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unrounded `unit_price * quantity`.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    pub(crate) fn increase(&mut self, by: i64) {
        self.quantity = self.quantity.saturating_add(clamp_quantity(by));
    }

    pub(crate) fn set_quantity(&mut self, quantity: i64) {
        self.quantity = clamp_quantity(quantity);
    }

    pub(crate) fn adjust(&mut self, delta: i64) {
        self.quantity = clamp_quantity(i64::from(self.quantity).saturating_add(delta));
    }
}

/// Floors a requested quantity at 1 and caps it at `u32::MAX`.
pub(crate) fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.max(1)).unwrap_or(u32::MAX)
}
