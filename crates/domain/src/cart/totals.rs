//! Aggregate totals derived from a set of line items.
//!
//! These are pure functions over a snapshot. Line subtotals are summed at full
//! precision and the two-decimal rounding is applied once, to the final sum.

use crate::{LineItem, Money};

/// Displayed subtotal for one row: `round2(unit_price * quantity)`.
pub fn line_total(item: &LineItem) -> Money {
    item.subtotal().round2()
}

/// Cart total: `round2(sum of unit_price * quantity)`.
///
/// Summed from unrounded line subtotals, so it can differ by a cent from the
/// sum of the displayed [`line_total`] values.
pub fn cart_total(items: &[LineItem]) -> Money {
    items.iter().map(LineItem::subtotal).sum::<Money>().round2()
}

/// Number of units across all rows (badge count), not the number of rows.
pub fn item_count(items: &[LineItem]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity())).sum()
}
