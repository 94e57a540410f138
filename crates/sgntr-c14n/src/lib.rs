#![forbid(unsafe_code)]

//! XML canonicalization for sgntr.
//!
//! Only Exclusive Canonical XML 1.0 without comments is implemented; it is
//! the single transform and `CanonicalizationMethod` the signer writes and
//! the verifier accepts.

pub mod escape;
pub mod exclusive;
pub mod render;

use sgntr_core::{algorithm, Error};
use sgntr_xml::NodeSet;

/// Fail unless `uri` names exclusive C14N without comments.
pub fn check_algorithm(uri: &str) -> Result<(), Error> {
    if uri == algorithm::EXC_C14N {
        Ok(())
    } else {
        Err(Error::UnsupportedAlgorithm(format!(
            "canonicalization method {uri}"
        )))
    }
}

/// Canonicalize a parsed document, or the subset `node_set` selects.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    exclusive::canonicalize(doc, node_set)
}

/// Canonicalize the subtree rooted at `node`, comments excluded.
pub fn canonicalize_subtree(node: roxmltree::Node<'_, '_>) -> Result<Vec<u8>, Error> {
    let set = NodeSet::tree_without_comments(node);
    exclusive::canonicalize(node.document(), Some(&set))
}

/// Parse `xml` and canonicalize the whole document.
pub fn canonicalize_str(xml: &str) -> Result<Vec<u8>, Error> {
    let doc = roxmltree::Document::parse_with_options(xml, sgntr_xml::parsing_options())
        .map_err(|e| Error::XmlParse(e.to_string()))?;
    exclusive::canonicalize(&doc, None)
}
