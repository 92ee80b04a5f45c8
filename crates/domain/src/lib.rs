//! Domain layer for the storefront checkout core.
//!
//! This crate provides:
//! - [`Money`] decimal amounts and the two-decimal rounding rule
//! - [`Product`] catalog snapshots and the [`Catalog`] collaborator trait
//! - [`Cart`], the per-session line item store, and its aggregate totals
//! - [`NewOrder`] and [`Order`], the immutable record of a checkout

pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod order;
pub mod product;
pub mod value_objects;

pub use cart::{Cart, CartSnapshot, LineItem, cart_total, item_count, line_total};
pub use catalog::{Catalog, InMemoryCatalog};
pub use error::DomainError;
pub use money::Money;
pub use order::{NewOrder, Order};
pub use product::{Category, Condition, Product};
pub use value_objects::{OwnerId, ProductId};
