//! Per-user search history. Rows are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Product;

/// Number of entries returned when the caller does not ask for a limit.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// One stored lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryItem {
  pub id:         i64,
  pub user_id:    i64,
  pub product_id: i64,
  pub created_at: DateTime<Utc>,
}

/// A history row joined with the product it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
  pub product:    Product,
  pub created_at: DateTime<Utc>,
}
