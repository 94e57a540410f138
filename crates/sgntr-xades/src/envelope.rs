#![forbid(unsafe_code)]

//! The three envelope nodes a signature is tied to.

use sgntr_core::{ns, Error};
use sgntr_xml::locate::find_required;

/// `DataPDU` root, the `Sgntr` element holding the signature, and the
/// business `Document`.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a, 'input> {
    pub root: roxmltree::Node<'a, 'input>,
    pub signature_holder: roxmltree::Node<'a, 'input>,
    pub payload: roxmltree::Node<'a, 'input>,
}

impl<'a, 'input> Envelope<'a, 'input> {
    /// Find the envelope nodes in `doc`.
    ///
    /// The root element must be `DataPDU`; `Sgntr` and `Document` are
    /// searched at any depth. Namespaces are ignored. Anything missing is
    /// [`Error::Structure`].
    pub fn locate(doc: &'a roxmltree::Document<'input>) -> Result<Self, Error> {
        let root = doc.root_element();
        if root.tag_name().name() != ns::node::DATA_PDU {
            return Err(Error::Structure(format!(
                "root element is <{}>, expected <{}>",
                root.tag_name().name(),
                ns::node::DATA_PDU
            )));
        }
        Ok(Self {
            root,
            signature_holder: find_required(doc, ns::node::SGNTR)?,
            payload: find_required(doc, ns::node::DOCUMENT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate() {
        let doc = roxmltree::Document::parse(
            "<DataPDU><Body><AppHdr><Sgntr/></AppHdr><Document>ok</Document></Body></DataPDU>",
        )
        .unwrap();
        let env = Envelope::locate(&doc).unwrap();
        assert_eq!(env.root, doc.root_element());
        assert!(env.signature_holder.has_tag_name("Sgntr"));
        assert_eq!(env.payload.text(), Some("ok"));
    }

    #[test]
    fn test_wrong_root() {
        let doc = roxmltree::Document::parse("<Envelope><Sgntr/><Document/></Envelope>").unwrap();
        let err = Envelope::locate(&doc).unwrap_err();
        assert!(matches!(err, Error::Structure(_)));
        assert!(err.to_string().contains("Envelope"));
    }

    #[test]
    fn test_missing_nodes() {
        for xml in [
            "<DataPDU><Document/></DataPDU>",
            "<DataPDU><AppHdr><Sgntr/></AppHdr></DataPDU>",
        ] {
            let doc = roxmltree::Document::parse(xml).unwrap();
            assert!(matches!(Envelope::locate(&doc), Err(Error::Structure(_))));
        }
    }
}
