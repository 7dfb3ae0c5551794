//! Tag extractor for generated interview text.
//!
//! The interviewer model embeds structured markup in its replies:
//!
//! ```text
//! [PERSON:id=bjorn_grandfather, name=Bjorn, relation=grandfather]
//! [FACT:person_id=bjorn_grandfather, key=origin, value=Norway]
//! [DATA:key=first_name, value=Astrid]
//! ```
//!
//! [`extract_tags`] scans a message for these tags, strips them from the
//! text shown to the user, and returns the parsed records in source order.
//! A malformed tag is skipped individually — recorded in
//! [`Extraction::skipped`](kin_core::extraction::Extraction) and logged,
//! never fatal — and its markup is still stripped. This function does not
//! fail: whatever the model produced, the user gets clean text back.

mod parse;

pub use parse::extract_tags;
