#![forbid(unsafe_code)]

//! `ds:Reference`: what a digest covers and how the target is found.
//!
//! Every reference carries a single exclusive C14N transform and a SHA-256
//! digest. The target is addressed one of three ways:
//!
//! - [`ReferenceTarget::ById`]: `URI="#id"`, resolved through `Id`/`ID`/`id`
//!   attributes when the digest is computed.
//! - [`ReferenceTarget::WholeDocument`]: `URI=""`, the document without
//!   comments.
//! - [`ReferenceTarget::DirectNode`]: bound to a node of a parsed document.
//!   Also written as `URI=""`; the payload reference uses this.

use base64::Engine;
use sgntr_core::{algorithm, ns, Error};
use sgntr_crypto::digest::{digest, digests_equal};
use sgntr_xml::locate::{find_child_elements, required_child_element};
use sgntr_xml::uri::parse_same_document_ref;
use sgntr_xml::{IdMap, NodeSet, XmlWriter};

use crate::qname::ds;

/// How a reference finds the data it digests.
#[derive(Debug, Clone)]
pub enum ReferenceTarget<'a, 'input> {
    ById(String),
    WholeDocument,
    DirectNode(roxmltree::Node<'a, 'input>),
}

/// A single `ds:Reference` of a `ds:SignedInfo`.
#[derive(Debug, Clone)]
pub struct Reference<'a, 'input> {
    pub target: ReferenceTarget<'a, 'input>,
    /// Optional `Type` attribute.
    pub ref_type: Option<String>,
    /// Digest recorded in (or to be written to) `ds:DigestValue`.
    pub digest_value: Option<Vec<u8>>,
}

impl<'a, 'input> Reference<'a, 'input> {
    fn new(target: ReferenceTarget<'a, 'input>) -> Self {
        Self {
            target,
            ref_type: None,
            digest_value: None,
        }
    }

    /// Reference the element whose ID attribute equals `id`.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new(ReferenceTarget::ById(id.into()))
    }

    /// Reference the whole document, comments excluded.
    pub fn whole_document() -> Self {
        Self::new(ReferenceTarget::WholeDocument)
    }

    /// Reference `node` directly, without any ID lookup.
    pub fn direct_node(node: roxmltree::Node<'a, 'input>) -> Self {
        Self::new(ReferenceTarget::DirectNode(node))
    }

    pub fn with_type(mut self, ref_type: impl Into<String>) -> Self {
        self.ref_type = Some(ref_type.into());
        self
    }

    pub fn with_digest_value(mut self, digest_value: Vec<u8>) -> Self {
        self.digest_value = Some(digest_value);
        self
    }

    /// The `URI` attribute value this reference is written with.
    pub fn uri(&self) -> String {
        match &self.target {
            ReferenceTarget::ById(id) => format!("#{id}"),
            ReferenceTarget::WholeDocument | ReferenceTarget::DirectNode(_) => String::new(),
        }
    }

    /// Human readable name of the target, used in error messages.
    pub fn describe(&self) -> String {
        match &self.target {
            ReferenceTarget::ById(id) => format!("#{id}"),
            ReferenceTarget::WholeDocument => "URI=\"\" (whole document)".into(),
            ReferenceTarget::DirectNode(node) => {
                format!("URI=\"\" (<{}>)", node.tag_name().name())
            }
        }
    }

    /// Canonicalize the target in `doc` and digest it.
    ///
    /// A `DirectNode` target is digested as bound; `doc` and `ids` are
    /// only consulted for the other two modes.
    pub fn compute_digest(
        &self,
        doc: &roxmltree::Document<'_>,
        ids: &IdMap,
    ) -> Result<Vec<u8>, Error> {
        let canonical = match &self.target {
            ReferenceTarget::ById(id) => {
                let node = ids.resolve(doc, id)?;
                sgntr_c14n::canonicalize_subtree(node)?
            }
            ReferenceTarget::WholeDocument => {
                let set = NodeSet::all_without_comments(doc);
                sgntr_c14n::canonicalize(doc, Some(&set))?
            }
            ReferenceTarget::DirectNode(node) => sgntr_c14n::canonicalize_subtree(*node)?,
        };
        tracing::trace!(
            reference = %self.describe(),
            canonical = %String::from_utf8_lossy(&canonical),
            "pre-digest data"
        );
        digest(algorithm::SHA256, &canonical)
    }

    /// Compute the digest and store it as this reference's value.
    pub fn with_computed_digest(
        mut self,
        doc: &roxmltree::Document<'_>,
        ids: &IdMap,
    ) -> Result<Self, Error> {
        let value = self.compute_digest(doc, ids)?;
        tracing::debug!(
            reference = %self.describe(),
            digest = %encode_base64(&value),
            "reference digest computed"
        );
        self.digest_value = Some(value);
        Ok(self)
    }

    /// Recompute the digest and compare it with the recorded value.
    pub fn verify_digest(&self, doc: &roxmltree::Document<'_>, ids: &IdMap) -> Result<(), Error> {
        let expected = self.digest_value.as_deref().ok_or_else(|| {
            Error::MissingElement(format!("DigestValue for {}", self.describe()))
        })?;
        let computed = self.compute_digest(doc, ids)?;
        if digests_equal(&computed, expected) {
            tracing::debug!(reference = %self.describe(), "reference digest matches");
            Ok(())
        } else {
            Err(Error::DigestMismatch(self.describe()))
        }
    }

    /// Write this reference as a `ds:Reference` element.
    pub fn write(&self, w: &mut XmlWriter) -> Result<(), Error> {
        let digest_value = self.digest_value.as_deref().ok_or_else(|| {
            Error::XmlWrite(format!("no digest computed for {}", self.describe()))
        })?;
        let uri = self.uri();
        let mut attrs = vec![(ns::attr::URI, uri.as_str())];
        if let Some(ref_type) = &self.ref_type {
            attrs.push((ns::attr::TYPE, ref_type.as_str()));
        }

        w.start_element(&ds(ns::node::REFERENCE), &attrs)?;
        w.start_element(&ds(ns::node::TRANSFORMS), &[])?;
        w.empty_element(
            &ds(ns::node::TRANSFORM),
            &[(ns::attr::ALGORITHM, algorithm::EXC_C14N)],
        )?;
        w.end_element(&ds(ns::node::TRANSFORMS))?;
        w.empty_element(
            &ds(ns::node::DIGEST_METHOD),
            &[(ns::attr::ALGORITHM, algorithm::SHA256)],
        )?;
        w.text_element(&ds(ns::node::DIGEST_VALUE), &[], &encode_base64(digest_value))?;
        w.end_element(&ds(ns::node::REFERENCE))
    }

    /// Read a `ds:Reference` element.
    ///
    /// `URI=""` reads back as [`ReferenceTarget::WholeDocument`]; callers
    /// that know the reference stands for a specific node rebind it.
    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Result<Self, Error> {
        let uri = node
            .attribute(ns::attr::URI)
            .ok_or_else(|| Error::MissingAttribute("URI on Reference".into()))?;
        let target = if uri.is_empty() {
            ReferenceTarget::WholeDocument
        } else if let Some(id) = parse_same_document_ref(uri) {
            ReferenceTarget::ById(id.to_owned())
        } else {
            return Err(Error::InvalidUri(format!("unsupported reference URI: {uri}")));
        };

        let transforms = required_child_element(node, ns::DSIG, ns::node::TRANSFORMS)?;
        let transform_nodes = find_child_elements(transforms, ns::DSIG, ns::node::TRANSFORM);
        let [transform] = transform_nodes.as_slice() else {
            return Err(Error::XmlStructure(format!(
                "reference {uri:?} has {} transforms, expected one",
                transform_nodes.len()
            )));
        };
        sgntr_c14n::check_algorithm(algorithm_of(*transform)?)?;

        let digest_method = required_child_element(node, ns::DSIG, ns::node::DIGEST_METHOD)?;
        sgntr_crypto::digest::from_uri(algorithm_of(digest_method)?)?;

        let digest_value = required_child_element(node, ns::DSIG, ns::node::DIGEST_VALUE)?;
        let digest_value = decode_base64(digest_value.text().unwrap_or(""), "DigestValue")?;

        Ok(Self {
            target,
            ref_type: node.attribute(ns::attr::TYPE).map(str::to_owned),
            digest_value: Some(digest_value),
        })
    }
}

/// The `Algorithm` attribute of `node`.
pub(crate) fn algorithm_of<'a>(node: roxmltree::Node<'a, '_>) -> Result<&'a str, Error> {
    node.attribute(ns::attr::ALGORITHM).ok_or_else(|| {
        Error::MissingAttribute(format!("Algorithm on {}", node.tag_name().name()))
    })
}

pub(crate) fn encode_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode base64 element content, ignoring embedded whitespace.
pub(crate) fn decode_base64(text: &str, what: &str) -> Result<Vec<u8>, Error> {
    let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(clean)
        .map_err(|e| Error::Base64(format!("{what}: {e}")))
}
