//! Starter catalog: an administrator account, the common allergens, and a
//! handful of registered products with their allergen links.
//!
//! Seeding is idempotent. The catalog is written only when the allergen table
//! is empty, and the administrator only when no account has its username.

use crate::{
  catalog::{NewAllergen, NewProduct},
  store::AllergenStore,
  user::NewUser,
};

pub const ADMIN_USERNAME: &str = "admin";

const ALLERGENS: &[(&str, &str, &str)] = &[
  ("Peanuts", "peanut", "Common legume allergen that can cause severe reactions"),
  ("Tree Nuts", "treenut", "Includes almonds, walnuts, cashews, pistachios and pecans"),
  ("Milk", "milk", "Dairy products containing lactose or milk proteins"),
  ("Eggs", "egg", "Found in many processed foods and baked goods"),
  ("Fish", "fish", "Different fish species can trigger allergic reactions"),
  ("Shellfish", "shellfish", "Includes shrimp, crab, lobster and other crustaceans"),
  ("Soy", "soy", "Common in many processed foods and vegetarian products"),
  ("Wheat", "wheat", "Contains gluten which affects people with celiac disease"),
  ("Sesame", "sesame", "Seeds and oils that can trigger reactions"),
  ("Gluten", "gluten", "Protein found in wheat, barley, and rye"),
];

struct SeedProduct {
  name:                &'static str,
  manufacturer:        &'static str,
  registration_number: &'static str,
  ingredients:         &'static str,
  allergens:           &'static [&'static str],
}

const PRODUCTS: &[SeedProduct] = &[
  SeedProduct {
    name:                "Nutrilon Premium Baby Formula",
    manufacturer:        "Nutricia",
    registration_number: "A1-0123",
    ingredients:         "Skimmed milk, vegetable oils, lactose, demineralized whey, whey protein \
                          concentrate, fish oil, calcium, vitamin mixtures",
    allergens:           &["Milk"],
  },
  SeedProduct {
    name:                "Cowbell Milk Powder",
    manufacturer:        "Cowbell",
    registration_number: "A1-0456",
    ingredients:         "Full cream milk powder, vitamins A & D, calcium, iron, zinc",
    allergens:           &["Milk"],
  },
  SeedProduct {
    name:                "Golden Penny Spaghetti",
    manufacturer:        "Flour Mills of Nigeria",
    registration_number: "A1-0789",
    ingredients:         "Durum wheat semolina, water",
    allergens:           &["Wheat", "Gluten"],
  },
  SeedProduct {
    name:                "Indomie Instant Noodles",
    manufacturer:        "Dufil Prima Foods",
    registration_number: "A1-1011",
    ingredients:         "Wheat flour, vegetable oil, salt, starch, chicken flavor, soy sauce, MSG, \
                          spices",
    allergens:           &["Soy", "Wheat", "Gluten"],
  },
  SeedProduct {
    name:                "Hollandia Yoghurt",
    manufacturer:        "CHI Limited",
    registration_number: "A1-1213",
    ingredients:         "Milk, sugar, strawberry flavor, live lactic acid culture, fruit extract",
    allergens:           &["Milk"],
  },
];

/// What a seeding run actually wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
  pub admin_created: bool,
  pub allergens:     usize,
  pub products:      usize,
  pub links:         usize,
}

/// Seed the store. `admin_password` is the plaintext password for the
/// administrator account.
pub async fn seed_catalog<S: AllergenStore>(
  store: &S,
  admin_password: &str,
) -> Result<SeedReport, S::Error> {
  let mut report = SeedReport::default();

  if store.get_user_by_username(ADMIN_USERNAME).await?.is_none() {
    store
      .create_user(NewUser {
        username:  ADMIN_USERNAME.to_owned(),
        password:  admin_password.to_owned(),
        email:     "admin@example.com".to_owned(),
        full_name: "System Administrator".to_owned(),
        is_admin:  true,
      })
      .await?;
    report.admin_created = true;
  }

  if !store.list_allergens().await?.is_empty() {
    tracing::info!("allergen catalog already present; skipping catalog seed");
    return Ok(report);
  }

  let mut allergen_ids = Vec::with_capacity(ALLERGENS.len());
  for (name, icon, description) in ALLERGENS {
    let allergen = store
      .create_allergen(NewAllergen {
        name:        (*name).to_owned(),
        description: Some((*description).to_owned()),
        icon:        Some((*icon).to_owned()),
      })
      .await?;
    allergen_ids.push((*name, allergen.id));
    report.allergens += 1;
  }

  for seed in PRODUCTS {
    let product = store
      .create_product(NewProduct {
        name:                seed.name.to_owned(),
        manufacturer:        seed.manufacturer.to_owned(),
        registration_number: seed.registration_number.to_owned(),
        ingredients:         seed.ingredients.to_owned(),
      })
      .await?;
    report.products += 1;

    let ids: Vec<i64> = seed
      .allergens
      .iter()
      .filter_map(|wanted| {
        allergen_ids
          .iter()
          .find(|(name, _)| name == wanted)
          .map(|(_, id)| *id)
      })
      .collect();
    report.links += ids.len();
    store.add_product_allergens(product.id, ids).await?;
  }

  tracing::info!(
    allergens = report.allergens,
    products = report.products,
    links = report.links,
    "seeded catalog"
  );
  Ok(report)
}
