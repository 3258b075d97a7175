//! Ingredient highlighting for display.
//!
//! Splits a free-text ingredient list into plain and allergen fragments using
//! a case-insensitive whole-word match on each allergen name. This is purely
//! presentational: it never feeds the match computation in
//! [`analysis`](crate::analysis).

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::catalog::Allergen;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fragment {
  Text { text: String },
  /// `text` is the ingredient text as written, not the allergen's name.
  Allergen { text: String, allergen_id: i64 },
}

fn word_pattern(name: &str) -> Option<Regex> {
  RegexBuilder::new(&format!(r"\b{}\b", regex::escape(name)))
    .case_insensitive(true)
    .build()
    .ok()
}

/// Split `ingredients` into fragments, marking every whole-word occurrence
/// of an allergen name. Overlapping hits resolve to the earliest, then the
/// longest.
pub fn highlight_ingredients(ingredients: &str, allergens: &[Allergen]) -> Vec<Fragment> {
  let mut hits: Vec<(usize, usize, i64)> = Vec::new();
  for allergen in allergens {
    let name = allergen.name.trim();
    if name.is_empty() {
      continue;
    }
    let Some(pattern) = word_pattern(name) else {
      continue;
    };
    hits.extend(
      pattern
        .find_iter(ingredients)
        .map(|m| (m.start(), m.end(), allergen.id)),
    );
  }
  hits.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

  let mut fragments = Vec::new();
  let mut cursor = 0;
  for (start, end, allergen_id) in hits {
    if start < cursor {
      continue;
    }
    if start > cursor {
      fragments.push(Fragment::Text { text: ingredients[cursor..start].to_owned() });
    }
    fragments.push(Fragment::Allergen {
      text: ingredients[start..end].to_owned(),
      allergen_id,
    });
    cursor = end;
  }
  if cursor < ingredients.len() {
    fragments.push(Fragment::Text { text: ingredients[cursor..].to_owned() });
  }
  fragments
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn allergen(id: i64, name: &str) -> Allergen {
    let now = Utc::now();
    Allergen {
      id,
      name: name.into(),
      description: None,
      icon: None,
      created_at: now,
      updated_at: now,
    }
  }

  fn marked(fragments: &[Fragment]) -> Vec<(&str, i64)> {
    fragments
      .iter()
      .filter_map(|f| match f {
        Fragment::Allergen { text, allergen_id } => Some((text.as_str(), *allergen_id)),
        Fragment::Text { .. } => None,
      })
      .collect()
  }

  #[test]
  fn marks_whole_words_case_insensitively() {
    let text = "Full cream milk powder, vitamins A & D, MILK solids";
    let fragments = highlight_ingredients(text, &[allergen(3, "Milk")]);
    assert_eq!(marked(&fragments), vec![("milk", 3), ("MILK", 3)]);
  }

  #[test]
  fn does_not_mark_partial_words() {
    let text = "Buttermilk, wheatgrass";
    let fragments = highlight_ingredients(text, &[allergen(3, "Milk"), allergen(8, "Wheat")]);
    assert!(marked(&fragments).is_empty());
    assert_eq!(fragments, vec![Fragment::Text { text: text.into() }]);
  }

  #[test]
  fn fragments_reassemble_to_the_original_text() {
    let text = "Wheat flour, vegetable oil, soy sauce, salt";
    let fragments = highlight_ingredients(text, &[allergen(7, "Soy"), allergen(8, "Wheat")]);
    let rebuilt: String = fragments
      .iter()
      .map(|f| match f {
        Fragment::Text { text } | Fragment::Allergen { text, .. } => text.as_str(),
      })
      .collect();
    assert_eq!(rebuilt, text);
    assert_eq!(marked(&fragments), vec![("Wheat", 8), ("soy", 7)]);
  }

  #[test]
  fn longest_overlapping_name_wins() {
    let text = "contains tree nuts";
    let fragments =
      highlight_ingredients(text, &[allergen(5, "Nuts"), allergen(2, "Tree Nuts")]);
    assert_eq!(marked(&fragments), vec![("tree nuts", 2)]);
  }

  #[test]
  fn regex_metacharacters_in_names_are_literal() {
    let dotted = [allergen(12, "a.b")];
    assert!(marked(&highlight_ingredients("axb", &dotted)).is_empty());
    assert_eq!(marked(&highlight_ingredients("a.b", &dotted)), vec![("a.b", 12)]);
  }

  #[test]
  fn no_allergens_yields_single_text_fragment() {
    let fragments = highlight_ingredients("Durum wheat semolina, water", &[]);
    assert_eq!(fragments.len(), 1);
    assert!(highlight_ingredients("", &[]).is_empty());
  }
}
