//! Plain-text renderers, one per page.

use std::fmt::Write as _;

use allergen_core::{
  analysis::Analysis,
  catalog::{Allergen, Product},
  highlight::{Fragment, highlight_ingredients},
  history::SearchHistoryEntry,
  user::User,
};

use crate::router::SettingsSection;

const RULE: &str = "────────────────────────────────────────";

fn header(out: &mut String, title: &str) {
  let _ = writeln!(out, "{title}\n{RULE}");
}

fn allergen_label(a: &Allergen) -> String {
  match a.icon.as_deref() {
    Some(icon) if !icon.is_empty() => format!("{icon} {}", a.name),
    _ => a.name.clone(),
  }
}

// ─── Public pages ────────────────────────────────────────────────────────────

pub fn onboarding() -> String {
  let mut out = String::new();
  header(&mut out, "Allergen Alert");
  out.push_str(
    "Scan a product's registration number and find out at once whether it\n\
     contains anything you are allergic to.\n\n\
     Get started:   allergen register\n\
     Have account:  allergen login <username>\n",
  );
  out
}

pub fn welcome() -> String {
  let mut out = String::new();
  header(&mut out, "Welcome");
  out.push_str(
    "1. Create an account and choose the allergens you react to.\n\
     2. Look up products by registration number or by name.\n\
     3. Check the highlighted ingredients and the safer alternatives.\n",
  );
  out
}

pub fn login() -> String { "Log in with:  allergen login <username>\n".into() }

pub fn register() -> String {
  "Create an account with:  allergen register <username> <email> <full name>\n".into()
}

pub fn registration_complete(user: Option<&User>) -> String {
  let mut out = String::new();
  header(&mut out, "Registration complete");
  if let Some(user) = user {
    let _ = writeln!(out, "Welcome aboard, {}.", user.full_name);
  }
  out.push_str("Next, pick your allergens:  allergen allergens add <id>...\n");
  out
}

pub fn not_found(location: &str) -> String { format!("Nothing lives at {location}.\n") }

// ─── Member pages ────────────────────────────────────────────────────────────

pub fn home(user: &User, recent: &[SearchHistoryEntry]) -> String {
  let mut out = String::new();
  header(&mut out, &format!("Hello, {}", user.full_name));
  out.push_str("Look up a product:  allergen lookup <registration number>\n\n");
  out.push_str(&history_list("Recent searches", recent));
  out
}

/// Render ingredients with every linked allergen in brackets. Allergens the
/// user reacts to are marked `[!like this!]`.
pub fn highlighted_ingredients(ingredients: &str, allergens: &[Allergen], matches: &[Allergen]) -> String {
  highlight_ingredients(ingredients, allergens)
    .into_iter()
    .map(|fragment| match fragment {
      Fragment::Text { text } => text,
      Fragment::Allergen { text, allergen_id } if matches.iter().any(|m| m.id == allergen_id) => {
        format!("[!{text}!]")
      }
      Fragment::Allergen { text, .. } => format!("[{text}]"),
    })
    .collect()
}

pub fn product(analysis: &Analysis) -> String {
  let p = &analysis.product;
  let mut out = String::new();
  header(&mut out, &p.name);
  let _ = writeln!(out, "Manufacturer:  {}", p.manufacturer);
  let _ = writeln!(out, "Registration:  {}\n", p.registration_number);

  if analysis.is_safe() {
    out.push_str("SAFE: contains none of your allergens.\n\n");
  } else {
    let names: Vec<_> = analysis.matching_allergens.iter().map(allergen_label).collect();
    let _ = writeln!(out, "WARNING: contains {}.\n", names.join(", "));
  }

  let _ = writeln!(
    out,
    "Ingredients:\n  {}\n",
    highlighted_ingredients(&p.ingredients, &analysis.product_allergens, &analysis.matching_allergens)
  );

  if !analysis.product_allergens.is_empty() {
    let names: Vec<_> = analysis.product_allergens.iter().map(allergen_label).collect();
    let _ = writeln!(out, "Allergens:  {}\n", names.join(", "));
  }

  if !analysis.is_safe() {
    if analysis.alternatives.is_empty() {
      out.push_str("No safer alternatives on record.\n");
    } else {
      out.push_str("Safer alternatives:\n");
      for alt in &analysis.alternatives {
        let _ = writeln!(out, "  {} ({})  {}", alt.name, alt.manufacturer, alt.registration_number);
      }
    }
  }
  out
}

pub fn search_results(query: &str, products: &[Product]) -> String {
  if products.is_empty() {
    return format!("No products match \"{query}\".\n");
  }
  let mut out = String::new();
  for p in products {
    let _ = writeln!(out, "{:<10} {} ({})", p.registration_number, p.name, p.manufacturer);
  }
  out
}

pub fn profile(user: &User, allergens: &[Allergen]) -> String {
  let mut out = String::new();
  header(&mut out, &user.full_name);
  let _ = writeln!(out, "Username:  {}", user.username);
  let _ = writeln!(out, "Email:     {}", user.email);
  let _ = writeln!(out, "Joined:    {}\n", user.created_at.format("%Y-%m-%d"));
  if allergens.is_empty() {
    out.push_str("No allergens selected.\n");
  } else {
    out.push_str("My allergens:\n");
    for a in allergens {
      let _ = writeln!(out, "  {}", allergen_label(a));
    }
  }
  out
}

pub fn edit_profile(user: &User) -> String {
  format!(
    "Full name:  {}\nEmail:      {}\n\nChange with:  allergen profile edit [--full-name NAME] [--email EMAIL]\n",
    user.full_name, user.email
  )
}

/// Every catalog allergen, ticked when the user has selected it.
pub fn manage_allergens(catalog: &[Allergen], selected: &[Allergen]) -> String {
  let mut out = String::new();
  header(&mut out, "My allergens");
  for a in catalog {
    let mark = if selected.iter().any(|s| s.id == a.id) { "x" } else { " " };
    let _ = writeln!(out, "[{mark}] {:>3}  {}", a.id, allergen_label(a));
    if let Some(desc) = a.description.as_deref().filter(|d| !d.is_empty()) {
      let _ = writeln!(out, "           {desc}");
    }
  }
  out
}

pub fn settings() -> String {
  let mut out = String::new();
  header(&mut out, "Settings");
  for section in [SettingsSection::General, SettingsSection::Accounts, SettingsSection::History] {
    let _ = writeln!(out, "  /settings/{section}");
  }
  out
}

pub fn settings_general() -> String { "Nothing to configure yet.\n".into() }

pub fn settings_accounts(user: &User) -> String {
  format!("Signed in as {} <{}>.\nSign out with:  allergen logout\n", user.username, user.email)
}

pub fn history_list(title: &str, entries: &[SearchHistoryEntry]) -> String {
  let mut out = String::new();
  header(&mut out, title);
  if entries.is_empty() {
    out.push_str("No searches yet.\n");
  }
  for e in entries {
    let _ = writeln!(
      out,
      "{}  {:<10} {}",
      e.created_at.format("%Y-%m-%d %H:%M"),
      e.product.registration_number,
      e.product.name
    );
  }
  out
}

pub fn education() -> String {
  let mut out = String::new();
  header(&mut out, "Learn about food allergies");
  out.push_str(
    "A food allergy is an immune reaction to a protein in food. Even a trace\n\
     can trigger symptoms, so always read the full ingredient list.\n\n\
     Watch for \"may contain\" statements and shared-facility warnings.\n\
     Keep prescribed emergency medication with you.\n\n\
     More reading:  /education/resources\n",
  );
  out
}

pub fn education_resources() -> String {
  let mut out = String::new();
  header(&mut out, "Resources");
  out.push_str(
    "  Food Allergy Research & Education   https://www.foodallergy.org\n\
     \x20 Allergy UK                          https://www.allergyuk.org\n\
     \x20 World Allergy Organization          https://www.worldallergy.org\n",
  );
  out
}

// ─── Admin ───────────────────────────────────────────────────────────────────

pub fn admin(users: &[User], products: &[Product], allergens: &[Allergen]) -> String {
  let mut out = String::new();
  header(&mut out, "Admin dashboard");

  let _ = writeln!(out, "Users ({})", users.len());
  for u in users {
    let role = if u.is_admin { "admin" } else { "member" };
    let _ = writeln!(out, "  {:>3}  {:<16} {:<6} {}", u.id, u.username, role, u.email);
  }

  let _ = writeln!(out, "\nProducts ({})", products.len());
  for p in products {
    let _ = writeln!(out, "  {:>3}  {:<10} {}", p.id, p.registration_number, p.name);
  }

  let _ = writeln!(out, "\nAllergens ({})", allergens.len());
  for a in allergens {
    let _ = writeln!(out, "  {:>3}  {}", a.id, allergen_label(a));
  }
  out
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn allergen(id: i64, name: &str) -> Allergen {
    let now = Utc::now();
    Allergen { id, name: name.into(), description: None, icon: None, created_at: now, updated_at: now }
  }

  fn product(id: i64, name: &str, ingredients: &str) -> Product {
    let now = Utc::now();
    Product {
      id,
      name: name.into(),
      manufacturer: "Acme".into(),
      registration_number: format!("A1-{id:04}"),
      ingredients: ingredients.into(),
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn matches_are_marked_apart_from_other_allergens() {
    let milk = allergen(3, "Milk");
    let soy = allergen(7, "Soy");
    let text = highlighted_ingredients(
      "Sugar, milk powder, soy lecithin",
      &[milk.clone(), soy],
      &[milk],
    );
    assert_eq!(text, "Sugar, [!milk!] powder, [soy] lecithin");
  }

  #[test]
  fn unlinked_mentions_stay_plain() {
    let text = highlighted_ingredients("Contains peanuts", &[allergen(7, "Soy")], &[]);
    assert_eq!(text, "Contains peanuts");
  }

  #[test]
  fn unsafe_product_lists_alternatives() {
    let milk = allergen(3, "Milk");
    let analysis = Analysis {
      product:            product(1, "Cowbell", "Whole milk, sugar"),
      product_allergens:  vec![milk.clone()],
      matching_allergens: vec![milk],
      alternatives:       vec![product(2, "Oat Drink", "Oats, water")],
    };
    let page = super::product(&analysis);
    assert!(page.contains("WARNING: contains Milk."));
    assert!(page.contains("Whole [!milk!], sugar"));
    assert!(page.contains("Oat Drink (Acme)  A1-0002"));
  }

  #[test]
  fn safe_product_skips_alternatives() {
    let analysis = Analysis {
      product:            product(1, "Rice", "Rice"),
      product_allergens:  vec![],
      matching_allergens: vec![],
      alternatives:       vec![product(2, "Other", "x")],
    };
    let page = super::product(&analysis);
    assert!(page.contains("SAFE"));
    assert!(!page.contains("Other"));
  }

  #[test]
  fn manage_allergens_ticks_selection() {
    let catalog = [allergen(1, "Peanuts"), allergen(2, "Tree Nuts")];
    let page = manage_allergens(&catalog, &catalog[1..]);
    assert!(page.contains("[ ]   1  Peanuts"));
    assert!(page.contains("[x]   2  Tree Nuts"));
  }
}
