//! The allergen and product catalogs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named substance a user may be sensitive to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allergen {
  pub id:          i64,
  pub name:        String,
  pub description: Option<String>,
  pub icon:        Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAllergen {
  pub name:        String,
  pub description: Option<String>,
  pub icon:        Option<String>,
}

/// A packaged food product, keyed for lookup by its regulatory
/// registration number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id:                  i64,
  pub name:                String,
  pub manufacturer:        String,
  pub registration_number: String,
  pub ingredients:         String,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
  pub name:                String,
  pub manufacturer:        String,
  pub registration_number: String,
  pub ingredients:         String,
}
