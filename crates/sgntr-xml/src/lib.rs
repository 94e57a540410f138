#![forbid(unsafe_code)]

//! XML document abstraction for sgntr.
//!
//! Wraps `roxmltree` for reading, adds the envelope node lookups and the
//! `NodeSet` canonicalization needs, strips indentation from incoming
//! text and wraps `quick-xml` for writing the signature fragment.

pub mod document;
pub mod locate;
pub mod nodeset;
pub mod normalize;
pub mod uri;
pub mod writer;

pub use document::{IdMap, XmlDocument};
pub use nodeset::NodeSet;
pub use writer::XmlWriter;

/// Return roxmltree parsing options used throughout the crate.
///
/// DTDs are rejected: payment envelopes never carry one, and refusing
/// them keeps entity definitions out of signed content.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: false,
        ..roxmltree::ParsingOptions::default()
    }
}
