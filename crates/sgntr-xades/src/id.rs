#![forbid(unsafe_code)]

//! Identifier generation for signature nodes.

use uuid::Uuid;

/// A fresh identifier: `_` followed by a random UUIDv4.
///
/// The leading underscore keeps the value a valid XML `ID` even when the
/// UUID starts with a digit.
pub fn new_id() -> String {
    format!("_{}", Uuid::new_v4())
}

/// A fresh identifier for a `xades:SignedProperties` element.
pub fn signed_properties_id() -> String {
    format!("{}-signedprops", new_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_shape() {
        let id = new_id();
        assert!(id.starts_with('_'));
        assert!(Uuid::parse_str(&id[1..]).is_ok());
        assert_ne!(id, new_id());
    }

    #[test]
    fn test_signed_properties_id() {
        let id = signed_properties_id();
        assert!(id.starts_with('_'));
        assert!(id.ends_with("-signedprops"));
    }
}
