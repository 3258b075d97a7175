//! Allergen-match analysis: the one piece of domain logic.
//!
//! Matching is exact-id set intersection between the user's allergen profile
//! and the product's allergen list. Ingredient text plays no part in it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
  catalog::{Allergen, Product},
  store::AllergenStore,
};

/// The verdict returned for one product lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
  pub product:            Product,
  pub product_allergens:  Vec<Allergen>,
  /// Product allergens that are also in the user's profile.
  pub matching_allergens: Vec<Allergen>,
  /// Linked alternatives containing none of the user's allergens.
  pub alternatives:       Vec<Product>,
}

impl Analysis {
  pub fn is_safe(&self) -> bool { self.matching_allergens.is_empty() }
}

/// Product allergens whose id also appears in `user_allergens`, in product
/// order.
pub fn matching_allergens(
  product_allergens: &[Allergen],
  user_allergens: &[Allergen],
) -> Vec<Allergen> {
  let user_ids: HashSet<i64> = user_allergens.iter().map(|a| a.id).collect();
  product_allergens
    .iter()
    .filter(|a| user_ids.contains(&a.id))
    .cloned()
    .collect()
}

/// Run the full analysis of `product_id` for `user_id`.
///
/// Returns `Ok(None)` when the product does not exist. Otherwise the lookup
/// is appended to the user's search history whatever the verdict.
pub async fn analyze<S: AllergenStore>(
  store: &S,
  user_id: i64,
  product_id: i64,
) -> Result<Option<Analysis>, S::Error> {
  let Some(product) = store.get_product(product_id).await? else {
    return Ok(None);
  };

  let product_allergens = store.get_product_allergens(product_id).await?;
  let user_allergens = store.get_user_allergens(user_id).await?;
  let matching = matching_allergens(&product_allergens, &user_allergens);

  let excluded = user_allergens.iter().map(|a| a.id).collect();
  let alternatives = store.get_alternative_products(product_id, excluded).await?;

  store.add_to_search_history(user_id, product_id).await?;

  tracing::debug!(
    user_id,
    product_id,
    matches = matching.len(),
    alternatives = alternatives.len(),
    "analysed product"
  );

  Ok(Some(Analysis {
    product,
    product_allergens,
    matching_allergens: matching,
    alternatives,
  }))
}
