#![forbid(unsafe_code)]

//! XAdES-BES signature creation.
//!
//! The signature is stored inside the envelope it covers and must also
//! cover its own `KeyInfo` and `SignedProperties`, which do not exist until
//! a signature has been inserted. Signing therefore runs twice:
//!
//! 1. Provisional: insert a signature with the final `KeyInfo` and
//!    qualifying properties and a single whole-document reference.
//! 2. Final: re-parse, digest `KeyInfo`, `SignedProperties` and the
//!    payload in place, re-sign and replace the provisional signature.
//!
//! Only the `KeyInfo` and qualifying properties survive from pass one.

use sgntr_core::{ns, Error};
use sgntr_keys::Credential;
use sgntr_xml::{IdMap, XmlDocument};

use crate::context::XadesContext;
use crate::envelope::Envelope;
use crate::id::new_id;
use crate::properties::QualifyingProperties;
use crate::reference::Reference;
use crate::signature::{KeyInfo, Signature, SignedInfo};

/// The envelope after the first pass.
#[derive(Debug, Clone)]
pub struct ProvisionalSignature {
    pub document: XmlDocument,
    pub signature_id: String,
    pub key_info: KeyInfo,
    pub qualifying_properties: QualifyingProperties,
}

/// Sign a DataPDU envelope and return the signed envelope text.
///
/// Indentation between elements is removed first so that the digests do
/// not depend on how the envelope was formatted. Any existing content of
/// `Sgntr` is replaced; everything else is returned as normalized.
pub fn sign(
    ctx: &XadesContext,
    unsigned_xml: &str,
    credential: &Credential,
) -> Result<String, Error> {
    let document = XmlDocument::parse_normalized(unsigned_xml)?;
    {
        let tree = document.parse_doc()?;
        Envelope::locate(&tree)?;
    }
    let key = credential.private_key()?;

    let provisional = provisional_pass(ctx, &document, credential, key)?;
    final_pass(provisional, key)
}

/// First pass: a signature over the whole document, used only so that
/// `KeyInfo` and `SignedProperties` exist in the tree.
pub fn provisional_pass(
    ctx: &XadesContext,
    document: &XmlDocument,
    credential: &Credential,
    key: &rsa::RsaPrivateKey,
) -> Result<ProvisionalSignature, Error> {
    let tree = document.parse_doc()?;
    let envelope = Envelope::locate(&tree)?;
    let ids = IdMap::build(&tree);

    let signature_id = new_id();
    let key_info = KeyInfo::for_credential(credential);
    let qualifying_properties = QualifyingProperties::build(ctx.signing_time(), &signature_id);

    let signed_info =
        SignedInfo::new(vec![Reference::whole_document().with_computed_digest(&tree, &ids)?]);
    let signature = Signature::create(
        signature_id.clone(),
        signed_info,
        key_info,
        qualifying_properties,
        key,
    )?;
    let text = document.replace_children(envelope.signature_holder, &signature.to_xml()?)?;
    tracing::debug!(signature_id = %signature_id, "provisional signature inserted");

    Ok(ProvisionalSignature {
        document: XmlDocument::parse(text)?,
        signature_id,
        key_info: signature.key_info,
        qualifying_properties: signature.qualifying_properties,
    })
}

/// Second pass: digest `KeyInfo`, `SignedProperties` and the payload as
/// they sit in the envelope and replace the provisional signature.
pub fn final_pass(
    provisional: ProvisionalSignature,
    key: &rsa::RsaPrivateKey,
) -> Result<String, Error> {
    let ProvisionalSignature {
        document,
        signature_id,
        key_info,
        qualifying_properties,
    } = provisional;

    let tree = document.parse_doc()?;
    let envelope = Envelope::locate(&tree)?;
    let ids = IdMap::build(&tree);

    let references = [
        Reference::by_id(key_info.id.as_str()),
        Reference::by_id(qualifying_properties.signed_properties.id.as_str())
            .with_type(ns::SIGNED_PROPERTIES_TYPE),
        Reference::direct_node(envelope.payload),
    ]
    .into_iter()
    .map(|r| r.with_computed_digest(&tree, &ids))
    .collect::<Result<Vec<_>, _>>()?;

    let signature = Signature::create(
        signature_id,
        SignedInfo::new(references),
        key_info,
        qualifying_properties,
        key,
    )?;
    let signed = document.replace_children(envelope.signature_holder, &signature.to_xml()?)?;
    tracing::debug!(signature_id = %signature.id, "final signature inserted");
    Ok(signed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sgntr_core::algorithm;
    use std::path::Path;

    const MINIMAL: &str = "<DataPDU><AppHdr><Sgntr/></AppHdr><Document>ok</Document></DataPDU>";

    fn signer() -> Credential {
        let keys = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../test-data/keys");
        sgntr_keys::loader::load_credential_files(
            &keys.join("signer-cert.pem"),
            Some(&keys.join("signer-key.pem")),
        )
        .unwrap()
    }

    fn ctx() -> XadesContext {
        XadesContext {
            signing_time: Some(Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap()),
            ..XadesContext::default()
        }
    }

    fn signature_of(xml: &str) -> Signature<'static, 'static> {
        let doc = roxmltree::Document::parse(xml).unwrap();
        let sgntr = doc.descendants().find(|n| n.has_tag_name("Sgntr")).unwrap();
        Signature::from_node(sgntr.first_element_child().unwrap()).unwrap()
    }

    #[test]
    fn test_provisional_pass_has_one_whole_document_reference() {
        let cred = signer();
        let document = XmlDocument::parse(MINIMAL.into()).unwrap();
        let provisional =
            provisional_pass(&ctx(), &document, &cred, cred.private_key().unwrap()).unwrap();

        let signature = signature_of(provisional.document.text());
        assert_eq!(signature.id, provisional.signature_id);
        assert_eq!(signature.signed_info.references.len(), 1);
        assert_eq!(signature.signed_info.references[0].uri(), "");
        assert_eq!(signature.key_info, provisional.key_info);
        assert_eq!(
            signature.qualifying_properties.target,
            format!("#{}", provisional.signature_id)
        );
    }

    #[test]
    fn test_final_pass_references() {
        let cred = signer();
        let signed = sign(&ctx(), MINIMAL, &cred).unwrap();
        let signature = signature_of(&signed);

        let refs = &signature.signed_info.references;
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].uri(), format!("#{}", signature.key_info.id));
        assert_eq!(
            refs[1].uri(),
            format!("#{}", signature.qualifying_properties.signed_properties.id)
        );
        assert_eq!(refs[1].ref_type.as_deref(), Some(ns::SIGNED_PROPERTIES_TYPE));
        assert_eq!(refs[2].uri(), "");
        assert!(refs[2].ref_type.is_none());

        // Third digest is over the payload alone.
        let expected = sgntr_crypto::digest::digest(algorithm::SHA256, b"<Document>ok</Document>")
            .unwrap();
        assert_eq!(refs[2].digest_value.as_deref(), Some(expected.as_slice()));
    }

    #[test]
    fn test_outside_sgntr_unchanged() {
        let cred = signer();
        let unsigned = "<?xml version=\"1.0\"?>\n<DataPDU><AppHdr><Sgntr>stale</Sgntr></AppHdr><!--c--><Document a='1'>ok</Document></DataPDU>";
        let signed = sign(&ctx(), unsigned, &cred).unwrap();
        assert!(signed.starts_with("<?xml version=\"1.0\"?>\n<DataPDU><AppHdr><Sgntr><ds:Signature "));
        assert!(signed.ends_with("</Sgntr></AppHdr><!--c--><Document a='1'>ok</Document></DataPDU>"));
        assert!(!signed.contains("stale"));
    }

    #[test]
    fn test_indentation_removed_before_signing() {
        let cred = signer();
        let indented = "<DataPDU>\n  <AppHdr>\n    <Sgntr/>\n  </AppHdr>\n  <Document>\n    <v>1</v>\n  </Document>\n</DataPDU>\n";
        let compact = "<DataPDU><AppHdr><Sgntr/></AppHdr><Document><v>1</v></Document></DataPDU>";

        let from_indented = sign(&ctx(), indented, &cred).unwrap();
        let from_compact = sign(&ctx(), compact, &cred).unwrap();
        assert!(from_indented.ends_with("</Sgntr></AppHdr><Document><v>1</v></Document></DataPDU>"));

        let a = signature_of(&from_indented);
        let b = signature_of(&from_compact);
        assert_eq!(
            a.signed_info.references[2].digest_value,
            b.signed_info.references[2].digest_value
        );
        let expected =
            sgntr_crypto::digest::digest(algorithm::SHA256, b"<Document><v>1</v></Document>")
                .unwrap();
        assert_eq!(
            a.signed_info.references[2].digest_value.as_deref(),
            Some(expected.as_slice())
        );
    }

    #[test]
    fn test_missing_private_key() {
        let keys = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../test-data/keys");
        let cert_only =
            sgntr_keys::loader::load_credential_files(&keys.join("signer-cert.pem"), None).unwrap();
        assert!(matches!(
            sign(&ctx(), MINIMAL, &cert_only),
            Err(Error::Credential(_))
        ));
    }

    #[test]
    fn test_structure_checked_before_credential() {
        let keys = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../test-data/keys");
        let cert_only =
            sgntr_keys::loader::load_credential_files(&keys.join("signer-cert.pem"), None).unwrap();
        assert!(matches!(
            sign(&ctx(), "<DataPDU><Document/></DataPDU>", &cert_only),
            Err(Error::Structure(_))
        ));
    }
}
