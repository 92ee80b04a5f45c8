use async_trait::async_trait;
use domain::{LineItem, Money, NewOrder, Order, OwnerId};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    IdempotencyKey, OrderId, OrderQuery, OrderStoreError, Result, SortKey,
    store::{CreateOutcome, OrderStore, validate_new_order},
};

const ORDER_COLUMNS: &str =
    "id, idempotency_key, owner_id, items, total, payment_reference, created_at";

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let items_json: serde_json::Value = row.try_get("items")?;
        let items: Vec<LineItem> = serde_json::from_value(items_json)?;

        Ok(Order::restore(
            OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            IdempotencyKey::from_uuid(row.try_get::<Uuid, _>("idempotency_key")?),
            OwnerId::new(row.try_get::<String, _>("owner_id")?),
            items,
            Money::new(row.try_get::<Decimal, _>("total")?),
            row.try_get("payment_reference")?,
            row.try_get("created_at")?,
        ))
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create(&self, order: NewOrder) -> Result<CreateOutcome> {
        validate_new_order(&order)?;

        let key = order.idempotency_key();
        let items_json = serde_json::to_value(order.items())?;

        // The unique key makes the insert conditional; a losing racer gets no row back.
        let inserted: Option<PgRow> = sqlx::query(&format!(
            r#"
            INSERT INTO orders ({ORDER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT ON CONSTRAINT unique_idempotency_key DO NOTHING
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(OrderId::new().as_uuid())
        .bind(key.as_uuid())
        .bind(order.owner_id().as_str())
        .bind(items_json)
        .bind(order.total().amount())
        .bind(order.payment_reference())
        .bind(order.created_at())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("non_negative_total")
            {
                return OrderStoreError::InvalidOrder(db_err.message().to_string());
            }
            OrderStoreError::Database(e)
        })?;

        if let Some(row) = inserted {
            let stored = Self::row_to_order(row)?;
            tracing::debug!(order_id = %stored.id(), %key, "Order inserted");
            metrics::counter!("order_store_writes_total", "outcome" => "created").increment(1);
            return Ok(CreateOutcome::Created(stored));
        }

        let existing = self.find_by_key(key).await?.ok_or_else(|| {
            OrderStoreError::Unavailable(format!("order for key {key} conflicted but is not visible"))
        })?;

        if !order.matches(&existing) {
            return Err(OrderStoreError::KeyConflict { key });
        }

        tracing::debug!(order_id = %existing.id(), %key, "Order already stored for key");
        metrics::counter!("order_store_writes_total", "outcome" => "existing").increment(1);
        Ok(CreateOutcome::Existing(existing))
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_by_key(&self, key: IdempotencyKey) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE idempotency_key = $1"
        ))
        .bind(key.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn query(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.owner_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND owner_id = ${param_count}"));
        }
        if query.after.is_some() {
            match query.sort {
                SortKey::Recency => {
                    sql.push_str(&format!(
                        " AND (created_at, id) < (${}, ${})",
                        param_count + 1,
                        param_count + 2
                    ));
                    param_count += 2;
                }
                SortKey::TotalDescending => {
                    sql.push_str(&format!(
                        " AND (total, created_at, id) < (${}, ${}, ${})",
                        param_count + 1,
                        param_count + 2,
                        param_count + 3
                    ));
                    param_count += 3;
                }
            }
        }

        match query.sort {
            SortKey::Recency => sql.push_str(" ORDER BY created_at DESC, id DESC"),
            SortKey::TotalDescending => {
                sql.push_str(" ORDER BY total DESC, created_at DESC, id DESC")
            }
        }

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }

        // Build and execute query with parameters
        let mut sqlx_query = sqlx::query(&sql);

        if let Some(ref owner_id) = query.owner_id {
            sqlx_query = sqlx_query.bind(owner_id.as_str());
        }
        if let Some(after) = query.after {
            if query.sort == SortKey::TotalDescending {
                sqlx_query = sqlx_query.bind(after.total.amount());
            }
            sqlx_query = sqlx_query
                .bind(after.created_at)
                .bind(after.order_id.as_uuid());
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }
}
