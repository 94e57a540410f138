#![forbid(unsafe_code)]

//! The `ds:Signature` element and its parts.
//!
//! Written layout:
//!
//! ```text
//! ds:Signature Id
//!   ds:SignedInfo
//!     ds:CanonicalizationMethod, ds:SignatureMethod, ds:Reference*
//!   ds:SignatureValue
//!   ds:KeyInfo Id
//!     ds:X509Data/ds:X509IssuerSerial
//!   ds:Object
//!     xades:QualifyingProperties
//! ```

use sgntr_core::{algorithm, ns, Error};
use sgntr_crypto::RsaSha256;
use sgntr_keys::Credential;
use sgntr_xml::locate::{find_child_elements, required_child_element};
use sgntr_xml::XmlWriter;

use crate::id::new_id;
use crate::properties::QualifyingProperties;
use crate::qname::{ds, xmlns};
use crate::reference::{algorithm_of, decode_base64, encode_base64, Reference};

/// `ds:KeyInfo` naming the signing certificate by issuer and serial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub id: String,
    pub issuer_name: String,
    /// Decimal serial number.
    pub serial_number: String,
}

impl KeyInfo {
    /// KeyInfo for `credential`'s certificate with a fresh `Id`.
    pub fn for_credential(credential: &Credential) -> Self {
        Self {
            id: new_id(),
            issuer_name: credential.issuer_name(),
            serial_number: credential.serial_number(),
        }
    }

    /// Whether this KeyInfo names `credential`'s certificate.
    pub fn matches(&self, credential: &Credential) -> bool {
        self.issuer_name == credential.issuer_name()
            && self.serial_number == credential.serial_number()
    }

    pub fn write(&self, w: &mut XmlWriter) -> Result<(), Error> {
        let key_info = ds(ns::node::KEY_INFO);
        let x509_data = ds(ns::node::X509_DATA);
        let issuer_serial = ds(ns::node::X509_ISSUER_SERIAL);

        w.start_element(&key_info, &[(ns::attr::ID, self.id.as_str())])?;
        w.start_element(&x509_data, &[])?;
        w.start_element(&issuer_serial, &[])?;
        w.text_element(&ds(ns::node::X509_ISSUER_NAME), &[], &self.issuer_name)?;
        w.text_element(&ds(ns::node::X509_SERIAL_NUMBER), &[], &self.serial_number)?;
        w.end_element(&issuer_serial)?;
        w.end_element(&x509_data)?;
        w.end_element(&key_info)
    }

    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Result<Self, Error> {
        let id = node
            .attribute(ns::attr::ID)
            .ok_or_else(|| Error::MissingAttribute("Id on KeyInfo".into()))?;
        let x509_data = required_child_element(node, ns::DSIG, ns::node::X509_DATA)?;
        let issuer_serial =
            required_child_element(x509_data, ns::DSIG, ns::node::X509_ISSUER_SERIAL)?;
        let issuer = required_child_element(issuer_serial, ns::DSIG, ns::node::X509_ISSUER_NAME)?;
        let serial =
            required_child_element(issuer_serial, ns::DSIG, ns::node::X509_SERIAL_NUMBER)?;
        Ok(Self {
            id: id.to_owned(),
            issuer_name: issuer.text().unwrap_or("").trim().to_owned(),
            serial_number: serial.text().unwrap_or("").trim().to_owned(),
        })
    }
}

/// `ds:SignedInfo`: exclusive C14N, RSA-SHA256 and the references.
#[derive(Debug, Clone)]
pub struct SignedInfo<'a, 'input> {
    pub references: Vec<Reference<'a, 'input>>,
}

impl<'a, 'input> SignedInfo<'a, 'input> {
    pub fn new(references: Vec<Reference<'a, 'input>>) -> Self {
        Self { references }
    }

    /// Write `ds:SignedInfo`. With `declare_ns` the element carries its own
    /// `xmlns:ds` so it can stand alone.
    pub fn write(&self, w: &mut XmlWriter, declare_ns: bool) -> Result<(), Error> {
        let signed_info = ds(ns::node::SIGNED_INFO);
        let xmlns_ds = xmlns(ns::DSIG_PREFIX);
        if declare_ns {
            w.start_element(&signed_info, &[(xmlns_ds.as_str(), ns::DSIG)])?;
        } else {
            w.start_element(&signed_info, &[])?;
        }
        w.empty_element(
            &ds(ns::node::CANONICALIZATION_METHOD),
            &[(ns::attr::ALGORITHM, algorithm::EXC_C14N)],
        )?;
        w.empty_element(
            &ds(ns::node::SIGNATURE_METHOD),
            &[(ns::attr::ALGORITHM, algorithm::RSA_SHA256)],
        )?;
        for reference in &self.references {
            reference.write(w)?;
        }
        w.end_element(&signed_info)
    }

    /// Canonical form of this SignedInfo, as covered by the signature value.
    ///
    /// Exclusive C14N only renders `xmlns:ds` on the apex, so this equals
    /// the canonical form of the same SignedInfo inside a document.
    pub fn canonicalize(&self) -> Result<Vec<u8>, Error> {
        let mut w = XmlWriter::new();
        self.write(&mut w, true)?;
        let canonical = sgntr_c14n::canonicalize_str(&w.into_string()?)?;
        tracing::trace!(
            canonical = %String::from_utf8_lossy(&canonical),
            "pre-signature data"
        );
        Ok(canonical)
    }

    /// Sign the canonical form with `key`.
    pub fn sign(&self, key: &rsa::RsaPrivateKey) -> Result<Vec<u8>, Error> {
        RsaSha256.sign(key, &self.canonicalize()?)
    }

    /// Read `ds:SignedInfo`, rejecting any algorithm other than exclusive
    /// C14N and RSA-SHA256.
    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Result<Self, Error> {
        let c14n = required_child_element(node, ns::DSIG, ns::node::CANONICALIZATION_METHOD)?;
        sgntr_c14n::check_algorithm(algorithm_of(c14n)?)?;
        let method = required_child_element(node, ns::DSIG, ns::node::SIGNATURE_METHOD)?;
        RsaSha256::from_uri(algorithm_of(method)?)?;

        let references = find_child_elements(node, ns::DSIG, ns::node::REFERENCE)
            .into_iter()
            .map(Reference::from_node)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { references })
    }
}

/// A complete XAdES-BES `ds:Signature`.
#[derive(Debug, Clone)]
pub struct Signature<'a, 'input> {
    pub id: String,
    pub signed_info: SignedInfo<'a, 'input>,
    pub signature_value: Vec<u8>,
    pub key_info: KeyInfo,
    pub qualifying_properties: QualifyingProperties,
}

impl<'a, 'input> Signature<'a, 'input> {
    /// Sign `signed_info` with `key` and assemble the signature.
    pub fn create(
        id: String,
        signed_info: SignedInfo<'a, 'input>,
        key_info: KeyInfo,
        qualifying_properties: QualifyingProperties,
        key: &rsa::RsaPrivateKey,
    ) -> Result<Self, Error> {
        let signature_value = signed_info.sign(key)?;
        Ok(Self {
            id,
            signed_info,
            signature_value,
            key_info,
            qualifying_properties,
        })
    }

    pub fn write(&self, w: &mut XmlWriter) -> Result<(), Error> {
        let signature = ds(ns::node::SIGNATURE);
        let object = ds(ns::node::OBJECT);
        let xmlns_ds = xmlns(ns::DSIG_PREFIX);

        w.start_element(
            &signature,
            &[(xmlns_ds.as_str(), ns::DSIG), (ns::attr::ID, self.id.as_str())],
        )?;
        self.signed_info.write(w, false)?;
        w.text_element(
            &ds(ns::node::SIGNATURE_VALUE),
            &[],
            &encode_base64(&self.signature_value),
        )?;
        self.key_info.write(w)?;
        w.start_element(&object, &[])?;
        self.qualifying_properties.write(w)?;
        w.end_element(&object)?;
        w.end_element(&signature)
    }

    pub fn to_xml(&self) -> Result<String, Error> {
        let mut w = XmlWriter::new();
        self.write(&mut w)?;
        w.into_string()
    }

    /// Read a `ds:Signature` element.
    ///
    /// References come back as read; a `URI=""` reference is
    /// [`crate::ReferenceTarget::WholeDocument`] until the caller rebinds it.
    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Result<Self, Error> {
        if node.tag_name().namespace() != Some(ns::DSIG)
            || node.tag_name().name() != ns::node::SIGNATURE
        {
            return Err(Error::MissingElement(format!(
                "ds:Signature, found <{}>",
                node.tag_name().name()
            )));
        }
        let id = node
            .attribute(ns::attr::ID)
            .ok_or_else(|| Error::MissingAttribute("Id on Signature".into()))?;
        let signed_info =
            SignedInfo::from_node(required_child_element(node, ns::DSIG, ns::node::SIGNED_INFO)?)?;
        let value = required_child_element(node, ns::DSIG, ns::node::SIGNATURE_VALUE)?;
        let key_info =
            KeyInfo::from_node(required_child_element(node, ns::DSIG, ns::node::KEY_INFO)?)?;
        let object = required_child_element(node, ns::DSIG, ns::node::OBJECT)?;
        let qualifying_properties = QualifyingProperties::from_node(required_child_element(
            object,
            ns::XADES,
            ns::node::QUALIFYING_PROPERTIES,
        )?)?;

        Ok(Self {
            id: id.to_owned(),
            signed_info,
            signature_value: decode_base64(value.text().unwrap_or(""), "SignatureValue")?,
            key_info,
            qualifying_properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::path::Path;

    fn signer() -> Credential {
        let keys = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../test-data/keys");
        sgntr_keys::loader::load_credential_files(
            &keys.join("signer-cert.pem"),
            Some(&keys.join("signer-key.pem")),
        )
        .unwrap()
    }

    #[test]
    fn test_key_info_for_credential() {
        let cred = signer();
        let key_info = KeyInfo::for_credential(&cred);
        assert_eq!(key_info.serial_number, "28772997619311");
        assert!(key_info.issuer_name.contains("CN=Sgntr Test Root CA"));
        assert!(key_info.matches(&cred));

        let other = KeyInfo {
            serial_number: "1".into(),
            ..key_info.clone()
        };
        assert!(!other.matches(&cred));
    }

    #[test]
    fn test_key_info_round_trip() {
        let key_info = KeyInfo {
            id: "_k".into(),
            issuer_name: "CN=A & B,O=Test".into(),
            serial_number: "42".into(),
        };
        let mut w = XmlWriter::new();
        w.start_element("ds:Signature", &[("xmlns:ds", ns::DSIG)]).unwrap();
        key_info.write(&mut w).unwrap();
        w.end_element("ds:Signature").unwrap();
        let xml = w.into_string().unwrap();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let node = doc.descendants().find(|n| n.has_tag_name(ns::node::KEY_INFO)).unwrap();
        assert_eq!(KeyInfo::from_node(node).unwrap(), key_info);
    }

    #[test]
    fn test_signed_info_canonical_form_is_standalone() {
        let si = SignedInfo::new(vec![Reference::whole_document().with_digest_value(vec![0; 32])]);
        let canonical = String::from_utf8(si.canonicalize().unwrap()).unwrap();
        assert!(canonical.starts_with(&format!(r#"<ds:SignedInfo xmlns:ds="{}">"#, ns::DSIG)));
        // Empty elements are expanded.
        assert!(canonical.contains("></ds:CanonicalizationMethod>"));
    }

    #[test]
    fn test_signature_round_trip() {
        let cred = signer();
        let time = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
        let signed_info =
            SignedInfo::new(vec![Reference::whole_document().with_digest_value(vec![7; 32])]);
        let signature = Signature::create(
            "_sig".into(),
            signed_info,
            KeyInfo::for_credential(&cred),
            QualifyingProperties::build(time, "_sig"),
            cred.private_key().unwrap(),
        )
        .unwrap();
        let xml = signature.to_xml().unwrap();

        let doc = roxmltree::Document::parse(&xml).unwrap();
        let parsed = Signature::from_node(doc.root_element()).unwrap();
        assert_eq!(parsed.id, "_sig");
        assert_eq!(parsed.signature_value, signature.signature_value);
        assert_eq!(parsed.key_info, signature.key_info);
        assert_eq!(parsed.qualifying_properties, signature.qualifying_properties);
        assert_eq!(parsed.signed_info.references.len(), 1);

        // The embedded SignedInfo canonicalizes to what was signed.
        let si_node = doc
            .root_element()
            .first_element_child()
            .unwrap();
        assert_eq!(
            sgntr_c14n::canonicalize_subtree(si_node).unwrap(),
            signature.signed_info.canonicalize().unwrap()
        );
        assert!(RsaSha256
            .verify(
                cred.public_key(),
                &signature.signed_info.canonicalize().unwrap(),
                &parsed.signature_value
            )
            .unwrap());
    }

    #[test]
    fn test_from_node_rejects_other_signature_method() {
        let xml = format!(
            r#"<ds:SignedInfo xmlns:ds="{}"><ds:CanonicalizationMethod Algorithm="{}"/><ds:SignatureMethod Algorithm="http://www.w3.org/2000/09/xmldsig#rsa-sha1"/></ds:SignedInfo>"#,
            ns::DSIG,
            algorithm::EXC_C14N
        );
        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert!(matches!(
            SignedInfo::from_node(doc.root_element()),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_from_node_requires_ds_signature() {
        let doc = roxmltree::Document::parse("<Signature Id=\"x\"/>").unwrap();
        assert!(matches!(
            Signature::from_node(doc.root_element()),
            Err(Error::MissingElement(_))
        ));
    }
}
