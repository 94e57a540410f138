#![forbid(unsafe_code)]

//! XAdES-BES signature verification.
//!
//! Processing order:
//! 1. Locate `DataPDU`, `Sgntr` and `Document`
//! 2. Require exactly three references in `SignedInfo`
//! 3. Parse the `ds:Signature` held by `Sgntr`
//! 4. Rebind the third reference to the live `Document`
//! 5. Check reference targets and recompute every digest
//! 6. Verify `SignatureValue` over the canonical `SignedInfo`
//! 7. Optionally validate the certificate chain

use sgntr_core::{ns, Error};
use sgntr_crypto::RsaSha256;
use sgntr_keys::x509::validate_cert_chain;
use sgntr_keys::Credential;
use sgntr_xml::locate::{find_child_elements, required_child_element};
use sgntr_xml::IdMap;

use crate::context::XadesContext;
use crate::envelope::Envelope;
use crate::reference::{Reference, ReferenceTarget};
use crate::signature::Signature;

const REFERENCE_COUNT: usize = 3;

/// Verify the signature of a signed DataPDU envelope against `credential`.
///
/// With `full_chain_check` the credential's certificate must also chain to
/// one of `ctx.trusted_certs`.
pub fn verify(
    ctx: &XadesContext,
    signed_xml: &str,
    credential: &Credential,
    full_chain_check: bool,
) -> Result<(), Error> {
    let doc = roxmltree::Document::parse_with_options(signed_xml, sgntr_xml::parsing_options())
        .map_err(|e| Error::XmlParse(e.to_string()))?;
    let envelope = Envelope::locate(&doc)?;

    let sig_node = envelope
        .signature_holder
        .first_element_child()
        .ok_or_else(|| Error::MissingElement("ds:Signature in Sgntr".into()))?;
    let signed_info = required_child_element(sig_node, ns::DSIG, ns::node::SIGNED_INFO)?;

    // Counted before the references are parsed.
    let found = find_child_elements(signed_info, ns::DSIG, ns::node::REFERENCE).len();
    if found != REFERENCE_COUNT {
        return Err(Error::ReferenceCount { found });
    }
    let mut signature = Signature::from_node(sig_node)?;

    let references = &mut signature.signed_info.references;

    // The payload reference is written as URI="", which would select the
    // whole document. Bind it to the payload and keep the recorded digest.
    let payload_digest = references
        .pop()
        .and_then(|r| r.digest_value)
        .ok_or_else(|| Error::MissingElement("DigestValue of payload reference".into()))?;
    references.push(Reference::direct_node(envelope.payload).with_digest_value(payload_digest));

    check_reference_targets(&signature)?;

    let ids = IdMap::build(&doc);
    for reference in &signature.signed_info.references {
        reference.verify_digest(&doc, &ids)?;
    }

    let canonical = sgntr_c14n::canonicalize_subtree(signed_info)?;
    tracing::trace!(
        canonical = %String::from_utf8_lossy(&canonical),
        "pre-signature data"
    );
    let valid = RsaSha256
        .verify(credential.public_key(), &canonical, &signature.signature_value)
        .map_err(|e| Error::SignatureInvalid(e.to_string()))?;
    if !valid {
        return Err(Error::SignatureInvalid(
            "SignatureValue does not match SignedInfo".into(),
        ));
    }

    if !signature.key_info.matches(credential) {
        tracing::warn!(
            key_info_issuer = %signature.key_info.issuer_name,
            key_info_serial = %signature.key_info.serial_number,
            cert_issuer = %credential.issuer_name(),
            cert_serial = %credential.serial_number(),
            "KeyInfo does not name the verifying certificate"
        );
    }

    if full_chain_check {
        validate_cert_chain(credential.certificate_der(), &[], &ctx.chain_config())?;
        tracing::debug!(subject = %credential.subject_name(), "certificate chain valid");
    }

    tracing::debug!(signature_id = %signature.id, "signature valid");
    Ok(())
}

/// The first reference must point at this signature's `KeyInfo` and the
/// second at its `SignedProperties`, typed as such.
fn check_reference_targets(signature: &Signature<'_, '_>) -> Result<(), Error> {
    let refs = &signature.signed_info.references;
    let signed_properties_id = &signature.qualifying_properties.signed_properties.id;

    if !targets_id(&refs[0], &signature.key_info.id) {
        return Err(Error::XmlStructure(format!(
            "first reference {} does not point at KeyInfo #{}",
            refs[0].describe(),
            signature.key_info.id
        )));
    }
    if !targets_id(&refs[1], signed_properties_id)
        || refs[1].ref_type.as_deref() != Some(ns::SIGNED_PROPERTIES_TYPE)
    {
        return Err(Error::XmlStructure(format!(
            "second reference {} is not a SignedProperties reference to #{signed_properties_id}",
            refs[1].describe()
        )));
    }
    Ok(())
}

fn targets_id(reference: &Reference<'_, '_>, id: &str) -> bool {
    matches!(&reference.target, ReferenceTarget::ById(target) if target == id)
}
