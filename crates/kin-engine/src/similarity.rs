//! Fuzzy string similarity for names and places.

/// Similarity score in [0, 1] between two strings.
///
/// Both inputs are lowercased and trimmed, then the score is the maximum of
/// Jaro-Winkler (tuned for short personal names) and a normalised
/// edit-distance ratio (general sequence alignment). Either algorithm
/// winning is enough — deliberately permissive, favouring recall; the
/// matcher's thresholds and human confirmation supply the precision.
pub fn similarity(a: &str, b: &str) -> f64 {
  let a = a.trim().to_lowercase();
  let b = b.trim().to_lowercase();

  let jaro = strsim::jaro_winkler(&a, &b);
  let seq = strsim::normalized_levenshtein(&a, &b);

  jaro.max(seq)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_strings_score_one() {
    assert_eq!(similarity("Bjorn Hansen", "Bjorn Hansen"), 1.0);
  }

  #[test]
  fn symmetric() {
    for (a, b) in [
      ("Bjorn Hansen", "Bjorn Hanson"),
      ("Norway", "Sweden"),
      ("", "anything"),
      ("Astrid", "astrid  "),
    ] {
      assert_eq!(similarity(a, b), similarity(b, a), "({a:?}, {b:?})");
    }
  }

  #[test]
  fn case_and_whitespace_insensitive() {
    assert_eq!(similarity("  BJORN ", "bjorn"), 1.0);
  }

  #[test]
  fn near_identical_names_clear_the_match_gate() {
    assert!(similarity("Bjorn Hansen", "Bjorn Hanson") >= 0.85);
  }

  #[test]
  fn unrelated_names_do_not() {
    assert!(similarity("Bjorn Hansen", "Maria Lopez") < 0.85);
  }
}
