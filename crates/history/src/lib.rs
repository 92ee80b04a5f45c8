//! Order history read path.
//!
//! This crate provides the read side over committed orders:
//! - [`OrderHistoryReader`] for keyset-paginated pages of one owner's orders
//! - [`Cursor`], the opaque continuation token handed to clients
//! - [`OrderHistoryFeed`], the accumulated "load more" view of a history
//! - admin listing across all owners

pub mod cursor;
pub mod error;
pub mod feed;
pub mod reader;

pub use cursor::Cursor;
pub use error::{HistoryError, Result};
pub use feed::OrderHistoryFeed;
pub use order_store::SortKey;
pub use reader::{DEFAULT_MAX_PAGE_SIZE, OrderHistoryReader, OrderPage};
