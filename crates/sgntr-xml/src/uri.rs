#![forbid(unsafe_code)]

//! Same-document URI references.
//!
//! Only the two forms a XAdES envelope signature uses are understood:
//! `""` (whole document or a directly bound node) and `#id`.

/// Parse a same-document reference (e.g., `#foo` → `foo`).
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    uri.strip_prefix('#').filter(|id| !id.is_empty())
}
