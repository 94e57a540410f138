#![forbid(unsafe_code)]

//! Certificate and key loading from PEM, DER or PKCS#12.

use crate::key::Credential;
use sgntr_core::Error;
use std::path::Path;

const PEM_PREFIX: &[u8] = b"-----BEGIN";

/// Load an X.509 certificate, PEM or DER, and return its DER encoding.
pub fn load_certificate(data: &[u8]) -> Result<Vec<u8>, Error> {
    if !data.trim_ascii_start().starts_with(PEM_PREFIX) {
        return Ok(data.to_vec());
    }
    let pem_str = std::str::from_utf8(data)
        .map_err(|e| Error::Credential(format!("invalid PEM encoding: {e}")))?;

    // Trim surrounding whitespace; some PEM files have extra newlines
    let (label, der_bytes) = pem_rfc7468::decode_vec(pem_str.trim().as_bytes())
        .map_err(|e| Error::Credential(format!("failed to decode certificate PEM: {e}")))?;

    if label != "CERTIFICATE" {
        return Err(Error::Credential(format!(
            "expected CERTIFICATE PEM label, got: {label}"
        )));
    }
    Ok(der_bytes)
}

/// Load every certificate from a PEM bundle, or a single DER certificate.
pub fn load_certificates(data: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
    if !data.trim_ascii_start().starts_with(PEM_PREFIX) {
        return Ok(vec![data.to_vec()]);
    }
    let pem_str = std::str::from_utf8(data)
        .map_err(|e| Error::Credential(format!("invalid PEM encoding: {e}")))?;

    const END: &str = "-----END CERTIFICATE-----";
    let mut certs = Vec::new();
    let mut rest = pem_str;
    while let Some(pos) = rest.find(END) {
        let block = &rest[..pos + END.len()];
        certs.push(load_certificate(block.trim().as_bytes())?);
        rest = &rest[pos + END.len()..];
    }
    if certs.is_empty() {
        return Err(Error::Credential("no certificate found in PEM data".into()));
    }
    Ok(certs)
}

/// Load an RSA private key.
///
/// Accepts PKCS#8 or PKCS#1, PEM or DER. Any other key type is a
/// [`Error::Credential`].
pub fn load_rsa_private_key(data: &[u8]) -> Result<rsa::RsaPrivateKey, Error> {
    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;

    if data.trim_ascii_start().starts_with(PEM_PREFIX) {
        let pem_str = std::str::from_utf8(data)
            .map_err(|e| Error::Credential(format!("invalid PEM encoding: {e}")))?;
        let pem_str = pem_str.trim();

        // Try PKCS#8 first
        if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_pem(pem_str) {
            return Ok(pk);
        }
        return rsa::RsaPrivateKey::from_pkcs1_pem(pem_str)
            .map_err(|e| Error::Credential(format!("not an RSA private key PEM: {e}")));
    }

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(data) {
        return Ok(pk);
    }
    rsa::RsaPrivateKey::from_pkcs1_der(data)
        .map_err(|e| Error::Credential(format!("not an RSA private key DER: {e}")))
}

/// Build a credential from certificate bytes and optional private key bytes.
pub fn load_credential(cert_data: &[u8], key_data: Option<&[u8]>) -> Result<Credential, Error> {
    let credential = Credential::from_certificate_der(load_certificate(cert_data)?)?;
    match key_data {
        Some(key_data) => credential.with_private_key(load_rsa_private_key(key_data)?),
        None => Ok(credential),
    }
}

/// Build a signing credential from a password-protected PKCS#12 bundle.
///
/// The first private key is used, paired with the bundled certificate that
/// carries its public key. CA certificates in the bundle are ignored.
pub fn load_pkcs12_credential(data: &[u8], password: &str) -> Result<Credential, Error> {
    use pkcs8::DecodePrivateKey;

    let contents = sgntr_pkcs12::parse_pkcs12(data, password)?;
    let key_der = contents
        .private_keys
        .first()
        .ok_or_else(|| Error::Credential("PKCS#12 file contains no private key".into()))?;
    let private = rsa::RsaPrivateKey::from_pkcs8_der(key_der)
        .map_err(|e| Error::Credential(format!("PKCS#12 key is not an RSA key: {e}")))?;
    let public = private.to_public_key();

    let credential = contents
        .certificates
        .into_iter()
        .filter_map(|der| Credential::from_certificate_der(der).ok())
        .find(|c| *c.public_key() == public)
        .ok_or_else(|| {
            Error::Credential("PKCS#12 file has no certificate for its private key".into())
        })?;
    tracing::debug!(
        subject = %credential.subject_name(),
        serial = %credential.serial_number(),
        "PKCS#12 credential loaded"
    );
    credential.with_private_key(private)
}

/// Build a credential from a certificate file and optional private key file.
pub fn load_credential_files(cert_path: &Path, key_path: Option<&Path>) -> Result<Credential, Error> {
    let cert_data = std::fs::read(cert_path)?;
    let key_data = key_path.map(std::fs::read).transpose()?;
    tracing::debug!(
        cert = %cert_path.display(),
        with_key = key_data.is_some(),
        "loading credential"
    );
    load_credential(&cert_data, key_data.as_deref())
}
