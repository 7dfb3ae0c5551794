//! User-to-user relationship inference.
//!
//! Given the relation labels two users gave a shared ancestor, guess how
//! the users themselves relate. This is heuristic text matching over
//! free-form labels, not a genealogical calculus — approximate by design,
//! and only ever surfaced as a hint for human review.

/// Which generation a relation label points at, as far as keyword matching
/// can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Generation {
  Parent,
  Grandparent,
  GreatGrandparent,
}

/// Classify a (lowercased) relation label. `great-grand` is checked before
/// `grand` before the parent keywords, so "grandfather" reads as
/// grandparent-generation rather than matching its "father" suffix.
fn generation(relation: &str) -> Option<Generation> {
  if relation.contains("great-grand") {
    Some(Generation::GreatGrandparent)
  } else if relation.contains("grand") {
    Some(Generation::Grandparent)
  } else if ["parent", "father", "mother"]
    .iter()
    .any(|k| relation.contains(k))
  {
    Some(Generation::Parent)
  } else {
    None
  }
}

/// Best-guess label for how two users relate, from the relations they each
/// stated for the same ancestor. Rules, in order:
///
/// 1. identical labels, parent generation ⇒ "siblings"
/// 2. identical labels, grandparent generation ⇒ "cousins"
/// 3. identical labels, great-grandparent generation ⇒ "second cousins"
/// 4. one parent, one grandparent (either order) ⇒ "parent-child"
/// 5. anything else ⇒ "related"
pub fn infer_user_relationship(
  relation_a: &str,
  relation_b: &str,
) -> &'static str {
  let a = relation_a.trim().to_lowercase();
  let b = relation_b.trim().to_lowercase();

  let gen_a = generation(&a);
  let gen_b = generation(&b);

  if a == b {
    match gen_a {
      Some(Generation::Parent) => return "siblings",
      Some(Generation::Grandparent) => return "cousins",
      Some(Generation::GreatGrandparent) => return "second cousins",
      None => {}
    }
  }

  if matches!(
    (gen_a, gen_b),
    (Some(Generation::Parent), Some(Generation::Grandparent))
      | (Some(Generation::Grandparent), Some(Generation::Parent))
  ) {
    return "parent-child";
  }

  "related"
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn same_parent_relation_means_siblings() {
    assert_eq!(infer_user_relationship("father", "father"), "siblings");
    assert_eq!(infer_user_relationship("Mother", "mother"), "siblings");
  }

  #[test]
  fn same_grandparent_relation_means_cousins() {
    assert_eq!(
      infer_user_relationship("grandfather", "grandfather"),
      "cousins"
    );
  }

  #[test]
  fn same_great_grandparent_relation_means_second_cousins() {
    assert_eq!(
      infer_user_relationship("great-grandmother", "great-grandmother"),
      "second cousins"
    );
  }

  #[test]
  fn parent_and_grandparent_means_parent_child() {
    assert_eq!(
      infer_user_relationship("father", "grandfather"),
      "parent-child"
    );
    // Either order.
    assert_eq!(
      infer_user_relationship("grandmother", "mother"),
      "parent-child"
    );
  }

  #[test]
  fn unclassifiable_relations_fall_back_to_related() {
    assert_eq!(infer_user_relationship("uncle", "aunt"), "related");
    assert_eq!(infer_user_relationship("father", "mother"), "related");
    assert_eq!(infer_user_relationship("uncle", "uncle"), "related");
  }

  #[test]
  fn great_grandparent_and_parent_is_only_related() {
    // Two generations apart is outside the single-hop rule.
    assert_eq!(
      infer_user_relationship("great-grandfather", "father"),
      "related"
    );
  }
}
