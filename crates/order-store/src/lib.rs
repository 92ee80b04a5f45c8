pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{IdempotencyKey, OrderId};
pub use error::{OrderStoreError, Result};
pub use memory::{FailureMode, InMemoryOrderStore};
pub use postgres::PostgresOrderStore;
pub use query::{OrderQuery, SeekKey, SortKey};
pub use store::{CreateOutcome, OrderStore, OrderStoreExt, validate_new_order};
