//! Opaque continuation cursors.

use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use common::OrderId;
use domain::{Money, Order};
use order_store::{SeekKey, SortKey};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::HistoryError;

/// Marks the last order of a page and the ordering it was listed under.
///
/// A cursor is only meaningful for the sort key that minted it. Rendered as a
/// URL-safe string:
///
/// - recency: `r_<secs>_<nanos>_<order id>`
/// - total: `t_<total>_<secs>_<nanos>_<order id>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    sort: SortKey,
    position: SeekKey,
}

impl Cursor {
    /// Cursor positioned after `order` in the `sort` listing.
    pub fn after(sort: SortKey, order: &Order) -> Self {
        Self {
            sort,
            position: SeekKey::of(order),
        }
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort
    }

    pub fn position(&self) -> SeekKey {
        self.position
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let SeekKey {
            created_at,
            total,
            order_id,
        } = self.position;
        let secs = created_at.timestamp();
        let nanos = created_at.timestamp_subsec_nanos();

        match self.sort {
            SortKey::Recency => write!(f, "r_{secs}_{nanos}_{order_id}"),
            SortKey::TotalDescending => {
                write!(f, "t_{}_{secs}_{nanos}_{order_id}", total.amount())
            }
        }
    }
}

impl FromStr for Cursor {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HistoryError::InvalidCursor(s.to_string());
        let parts: Vec<&str> = s.split('_').collect();

        let (sort, total, rest) = match parts.as_slice() {
            ["r", rest @ ..] => (SortKey::Recency, Money::zero(), rest),
            ["t", total, rest @ ..] => {
                let total = Decimal::from_str(total).map_err(|_| invalid())?;
                (SortKey::TotalDescending, Money::new(total), rest)
            }
            _ => return Err(invalid()),
        };

        let [secs, nanos, id] = rest else {
            return Err(invalid());
        };
        let secs: i64 = secs.parse().map_err(|_| invalid())?;
        let nanos: u32 = nanos.parse().map_err(|_| invalid())?;
        let created_at = DateTime::from_timestamp(secs, nanos).ok_or_else(invalid)?;
        let order_id = OrderId::from_uuid(Uuid::parse_str(id).map_err(|_| invalid())?);

        Ok(Self {
            sort,
            position: SeekKey {
                created_at,
                total,
                order_id,
            },
        })
    }
}
