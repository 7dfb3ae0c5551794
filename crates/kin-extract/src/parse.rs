//! Tag scanner and attribute parser.
//!
//! Pipeline:
//!   raw &str
//!     └─ scan_tags()           → Vec<TagSpan>
//!          └─ parse_attributes() → key/value pairs
//!               └─ build_record()  → accumulate into Extraction
//!                    └─ strip spans → cleaned_text

use kin_core::extraction::{
  Extraction, FactRecord, PersonRecord, SkippedTag, TagKind, UserDataRecord,
};

// ─── Tag spans ───────────────────────────────────────────────────────────────

/// One recognised `[TYPE:body]` occurrence, with byte offsets into the
/// source text covering the whole bracketed span.
struct TagSpan<'a> {
  kind:  TagKind,
  body:  &'a str,
  start: usize,
  end:   usize,
}

fn kind_for_prefix(rest: &str) -> Option<(TagKind, usize)> {
  for (prefix, kind) in [
    ("PERSON:", TagKind::Person),
    ("FACT:", TagKind::Fact),
    ("DATA:", TagKind::Data),
  ] {
    if rest.starts_with(prefix) {
      return Some((kind, prefix.len()));
    }
  }
  None
}

/// Find every `[TYPE:body]` span. The body runs to the next `]` and must be
/// non-empty; a bracket that opens no recognised tag, or a tag that never
/// closes, is left alone (it is prose, not markup).
fn scan_tags(text: &str) -> Vec<TagSpan<'_>> {
  let mut spans = Vec::new();
  let mut search_from = 0usize;

  while let Some(open_rel) = text[search_from..].find('[') {
    let open = search_from + open_rel;
    let after_bracket = &text[open + 1..];

    let Some((kind, prefix_len)) = kind_for_prefix(after_bracket) else {
      search_from = open + 1;
      continue;
    };

    let body_start = open + 1 + prefix_len;
    let Some(close_rel) = text[body_start..].find(']') else {
      // Unterminated tag; treat the rest of the text as prose.
      break;
    };
    let close = body_start + close_rel;

    if close == body_start {
      // `[DATA:]` — empty body, not a tag.
      search_from = open + 1;
      continue;
    }

    spans.push(TagSpan {
      kind,
      body: &text[body_start..close],
      start: open,
      end: close + 1,
    });
    search_from = close + 1;
  }

  spans
}

// ─── Attribute parsing ───────────────────────────────────────────────────────

/// Parse a comma-separated `key=value` list. Items are trimmed; values may
/// contain `=` (split on the first only). Any item without `=` makes the
/// whole list malformed.
fn parse_attributes(body: &str) -> Option<Vec<(String, String)>> {
  let mut attrs = Vec::new();
  for item in body.split(',') {
    let (key, value) = item.trim().split_once('=')?;
    attrs.push((key.to_string(), value.to_string()));
  }
  Some(attrs)
}

/// Value for `key`; a repeated key keeps its last occurrence. Empty values
/// count as absent, matching the required-attribute checks below.
fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
  attrs
    .iter()
    .rev()
    .find(|(k, _)| k == key)
    .map(|(_, v)| v.as_str())
    .filter(|v| !v.is_empty())
}

// ─── Extraction ──────────────────────────────────────────────────────────────

/// Scan `text` for PERSON / FACT / DATA tags.
///
/// Returns the cleaned display text plus the parsed records in source
/// order. Skipped tags (malformed attribute list, missing required
/// attribute) are reported in [`Extraction::skipped`] and logged at `warn`;
/// their markup is stripped all the same.
pub fn extract_tags(text: &str) -> Extraction {
  let spans = scan_tags(text);
  let mut extraction = Extraction::default();

  for span in &spans {
    match build_record(span, &mut extraction) {
      Ok(()) => {}
      Err(reason) => {
        tracing::warn!(body = span.body, %reason, "skipping malformed tag");
        extraction.skipped.push(SkippedTag {
          kind:   span.kind,
          body:   span.body.to_string(),
          reason: reason.to_string(),
        });
      }
    }
  }

  // Strip every recognised span, parseable or not.
  let mut cleaned = String::with_capacity(text.len());
  let mut cursor = 0usize;
  for span in &spans {
    cleaned.push_str(&text[cursor..span.start]);
    cursor = span.end;
  }
  cleaned.push_str(&text[cursor..]);
  extraction.cleaned_text = cleaned.trim().to_string();

  extraction
}

fn build_record(
  span: &TagSpan<'_>,
  out: &mut Extraction,
) -> Result<(), &'static str> {
  let attrs =
    parse_attributes(span.body).ok_or("malformed key=value attribute list")?;

  match span.kind {
    TagKind::Data => {
      let key = attr(&attrs, "key").ok_or("DATA tag missing key")?;
      let value = attr(&attrs, "value").ok_or("DATA tag missing value")?;
      out.user_data.push(UserDataRecord {
        key:   key.to_string(),
        value: value.to_string(),
      });
    }

    TagKind::Person => {
      let unique_id = attr(&attrs, "id").ok_or("PERSON tag missing id")?;
      out.persons.push(PersonRecord {
        unique_id:  unique_id.to_string(),
        attributes: attrs
          .iter()
          .filter(|(k, _)| k != "id")
          .cloned()
          .collect(),
      });
    }

    TagKind::Fact => {
      let person_id =
        attr(&attrs, "person_id").ok_or("FACT tag missing person_id")?;
      let key = attr(&attrs, "key").ok_or("FACT tag missing key")?;
      let value = attr(&attrs, "value").ok_or("FACT tag missing value")?;
      out.facts.push(FactRecord {
        person_id: person_id.to_string(),
        key:       key.to_string(),
        value:     value.to_string(),
      });
    }
  }

  Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  // ── DATA ────────────────────────────────────────────────────────────────

  #[test]
  fn data_tag_extracted_and_stripped() {
    let text = "Well met! [DATA:key=first_name, value=Astrid] And your \
                family name?";
    let e = extract_tags(text);

    assert_eq!(e.user_data.len(), 1);
    assert_eq!(e.user_data[0].key, "first_name");
    assert_eq!(e.user_data[0].value, "Astrid");
    assert!(!e.cleaned_text.contains("[DATA:"));
    assert_eq!(e.cleaned_text, "Well met!  And your family name?");
  }

  #[test]
  fn data_missing_value_is_skipped_but_stripped() {
    let e = extract_tags("Hmm. [DATA:key=first_name]");
    assert!(e.user_data.is_empty());
    assert_eq!(e.skipped.len(), 1);
    assert_eq!(e.skipped[0].kind, TagKind::Data);
    assert_eq!(e.cleaned_text, "Hmm.");
  }

  // ── PERSON ──────────────────────────────────────────────────────────────

  #[test]
  fn person_tag_pops_id_and_keeps_attributes() {
    let e = extract_tags(
      "[PERSON:id=bjorn_grandfather, name=Bjorn, relation=grandfather]",
    );
    assert_eq!(e.persons.len(), 1);
    let p = &e.persons[0];
    assert_eq!(p.unique_id, "bjorn_grandfather");
    assert_eq!(p.attribute("name"), Some("Bjorn"));
    assert_eq!(p.attribute("relation"), Some("grandfather"));
    assert_eq!(p.attribute("id"), None);
    assert!(e.cleaned_text.is_empty());
  }

  #[test]
  fn person_without_id_is_skipped() {
    let e = extract_tags("[PERSON:name=Bjorn, relation=grandfather]");
    assert!(e.persons.is_empty());
    assert_eq!(e.skipped.len(), 1);
    assert_eq!(e.skipped[0].reason, "PERSON tag missing id");
  }

  // ── FACT ────────────────────────────────────────────────────────────────

  #[test]
  fn fact_tag_extracted() {
    let e = extract_tags(
      "A hardy land! [FACT:person_id=bjorn_grandfather, key=origin, \
       value=Norway] What did he do there?",
    );
    assert_eq!(e.facts.len(), 1);
    assert_eq!(e.facts[0].person_id, "bjorn_grandfather");
    assert_eq!(e.facts[0].key, "origin");
    assert_eq!(e.facts[0].value, "Norway");
    assert_eq!(e.cleaned_text, "A hardy land!  What did he do there?");
  }

  #[test]
  fn fact_value_may_contain_equals() {
    let e = extract_tags("[FACT:person_id=p1, key=motto, value=strength=honor]");
    assert_eq!(e.facts[0].value, "strength=honor");
  }

  // ── Malformed and non-tag brackets ──────────────────────────────────────

  #[test]
  fn item_without_equals_skips_whole_tag_but_strips_it() {
    let e = extract_tags("Ah. [FACT:person_id=p1, nonsense, key=a, value=b] So.");
    assert!(e.facts.is_empty());
    assert_eq!(e.skipped.len(), 1);
    assert_eq!(e.skipped[0].reason, "malformed key=value attribute list");
    assert_eq!(e.cleaned_text, "Ah.  So.");
  }

  #[test]
  fn one_bad_tag_does_not_abort_the_others() {
    let e = extract_tags(
      "[PERSON:id=p1, name=Bjorn] [FACT:broken] \
       [DATA:key=last_name, value=Hansen]",
    );
    assert_eq!(e.persons.len(), 1);
    assert_eq!(e.user_data.len(), 1);
    assert_eq!(e.skipped.len(), 1);
    assert!(e.cleaned_text.is_empty());
  }

  #[test]
  fn unknown_bracket_text_is_left_alone() {
    let e = extract_tags("The saga says [citation needed] he sailed west.");
    assert!(e.is_empty());
    assert_eq!(
      e.cleaned_text,
      "The saga says [citation needed] he sailed west."
    );
  }

  #[test]
  fn empty_body_is_not_a_tag() {
    let e = extract_tags("Odd one: [DATA:] there.");
    assert!(e.is_empty());
    assert!(e.skipped.is_empty());
    assert_eq!(e.cleaned_text, "Odd one: [DATA:] there.");
  }

  #[test]
  fn unterminated_tag_is_left_alone() {
    let e = extract_tags("Trailing [PERSON:id=p1, name=Bj");
    assert!(e.persons.is_empty());
    assert_eq!(e.cleaned_text, "Trailing [PERSON:id=p1, name=Bj");
  }

  // ── Ordering and repetition ─────────────────────────────────────────────

  #[test]
  fn records_preserve_source_order() {
    let e = extract_tags(
      "[PERSON:id=a, name=A] mid [PERSON:id=b, name=B] \
       [FACT:person_id=a, key=k1, value=v1] \
       [FACT:person_id=b, key=k2, value=v2]",
    );
    let ids: Vec<_> = e.persons.iter().map(|p| p.unique_id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
    let keys: Vec<_> = e.facts.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, ["k1", "k2"]);
  }

  #[test]
  fn repeated_key_keeps_last_occurrence() {
    let e = extract_tags("[DATA:key=first_name, value=Ast, value=Astrid]");
    assert_eq!(e.user_data[0].value, "Astrid");
  }

  #[test]
  fn tags_interleaved_with_prose() {
    let text = "Hail! [DATA:key=first_name, value=Leif] A strong name. \
                [PERSON:id=erik_father, name=Erik, relation=father] Tell me \
                of Erik.";
    let e = extract_tags(text);
    assert_eq!(e.user_data.len(), 1);
    assert_eq!(e.persons.len(), 1);
    assert_eq!(e.cleaned_text, "Hail!  A strong name.  Tell me of Erik.");
  }
}
