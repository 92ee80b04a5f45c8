//! Per-session cart: the line item store and its derived totals.

mod line_item;
mod store;
mod totals;

pub use line_item::LineItem;
pub use store::{Cart, CartSnapshot};
pub use totals::{cart_total, item_count, line_total};
