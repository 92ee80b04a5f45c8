use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use domain::{Money, Order, OwnerId};
use serde::{Deserialize, Serialize};

use crate::{OrderId, OrderStoreError};

/// Ordering for order listings. Both orderings are descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Newest first.
    #[default]
    Recency,
    /// Largest total first.
    TotalDescending,
}

impl SortKey {
    /// Returns the wire name of the sort key.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Recency => "recency",
            SortKey::TotalDescending => "total",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = OrderStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recency" | "recent" => Ok(SortKey::Recency),
            "total" | "total_descending" => Ok(SortKey::TotalDescending),
            other => Err(OrderStoreError::InvalidOrder(format!(
                "unknown sort key '{other}'"
            ))),
        }
    }
}

/// The position of an order within a listing, used for keyset pagination.
///
/// Ties on the primary sort column fall back to creation time and then order
/// ID, so every order has a distinct position under either ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeekKey {
    pub created_at: DateTime<Utc>,
    pub total: Money,
    pub order_id: OrderId,
}

impl SeekKey {
    /// Returns the position of an order.
    pub fn of(order: &Order) -> Self {
        Self {
            created_at: order.created_at(),
            total: order.total(),
            order_id: order.id(),
        }
    }

    /// Compares listing positions: `Less` means `self` is listed before `other`.
    pub fn cmp_in(&self, other: &SeekKey, sort: SortKey) -> Ordering {
        let by_recency = other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| other.order_id.cmp(&self.order_id));

        match sort {
            SortKey::Recency => by_recency,
            SortKey::TotalDescending => other.total.cmp(&self.total).then(by_recency),
        }
    }
}

/// Builder for order listing queries.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Only orders owned by this shopper; `None` lists every owner.
    pub owner_id: Option<OwnerId>,

    pub sort: SortKey,

    /// Only orders listed strictly after this position.
    pub after: Option<SeekKey>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,
}

impl OrderQuery {
    /// Creates a query over every order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query scoped to one owner.
    pub fn for_owner(owner_id: OwnerId) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Default::default()
        }
    }

    pub fn sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn after(mut self, position: SeekKey) -> Self {
        self.after = Some(position);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the order passes the owner and position filters.
    pub fn admits(&self, order: &Order) -> bool {
        if let Some(ref owner) = self.owner_id
            && order.owner_id() != owner
        {
            return false;
        }
        if let Some(after) = self.after
            && SeekKey::of(order).cmp_in(&after, self.sort) != Ordering::Greater
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key(secs: i64, total_cents: i64) -> SeekKey {
        SeekKey {
            created_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            total: Money::from_cents(total_cents),
            order_id: OrderId::new(),
        }
    }

    #[test]
    fn recency_lists_newest_first() {
        let older = key(0, 5000);
        let newer = key(10, 100);
        assert_eq!(newer.cmp_in(&older, SortKey::Recency), Ordering::Less);
        assert_eq!(older.cmp_in(&newer, SortKey::Recency), Ordering::Greater);
    }

    #[test]
    fn total_lists_largest_first_then_newest() {
        let big = key(0, 5000);
        let small = key(10, 100);
        assert_eq!(big.cmp_in(&small, SortKey::TotalDescending), Ordering::Less);

        let tie_old = key(0, 100);
        let tie_new = key(5, 100);
        assert_eq!(
            tie_new.cmp_in(&tie_old, SortKey::TotalDescending),
            Ordering::Less
        );
    }

    #[test]
    fn positions_are_distinct_on_full_tie() {
        let a = key(0, 100);
        let mut b = a;
        b.order_id = OrderId::new();
        assert_ne!(a.cmp_in(&b, SortKey::Recency), Ordering::Equal);
        assert_ne!(a.cmp_in(&b, SortKey::TotalDescending), Ordering::Equal);
    }

    #[test]
    fn sort_key_parsing() {
        assert_eq!("recent".parse::<SortKey>().unwrap(), SortKey::Recency);
        assert_eq!("total".parse::<SortKey>().unwrap(), SortKey::TotalDescending);
        assert!("price".parse::<SortKey>().is_err());
        assert_eq!(SortKey::TotalDescending.to_string(), "total");
    }

    #[test]
    fn query_builder_chain() {
        let owner = OwnerId::new("uid-1");
        let position = key(0, 100);
        let query = OrderQuery::for_owner(owner.clone())
            .sort(SortKey::TotalDescending)
            .after(position)
            .limit(5);

        assert_eq!(query.owner_id, Some(owner));
        assert_eq!(query.sort, SortKey::TotalDescending);
        assert_eq!(query.after, Some(position));
        assert_eq!(query.limit, Some(5));
    }
}
