#![forbid(unsafe_code)]

//! X.509 certificate chain validation.
//!
//! Builds a path from a leaf certificate through optional intermediates to
//! a trusted root, checking validity periods and RSA certificate
//! signatures. Revocation is not checked.

use der::{Decode, Encode};
use sgntr_core::Error;
use x509_cert::Certificate;

const MAX_CHAIN_DEPTH: usize = 10;

const SHA256_RSA: &str = "1.2.840.113549.1.1.11";
const SHA384_RSA: &str = "1.2.840.113549.1.1.12";
const SHA512_RSA: &str = "1.2.840.113549.1.1.13";

/// Configuration for X.509 certificate chain validation.
#[derive(Debug, Clone, Copy)]
pub struct CertValidationConfig<'a> {
    /// Trusted CA certificates (DER-encoded).
    pub trusted_certs: &'a [Vec<u8>],
    /// Untrusted intermediate certificates (DER-encoded).
    pub untrusted_certs: &'a [Vec<u8>],
    /// Override verification time (format: "YYYY-MM-DD+HH:MM:SS").
    pub verification_time: Option<&'a str>,
    /// Skip time validity checks.
    pub skip_time_checks: bool,
}

/// Validate a certificate chain from a leaf cert to a trusted root.
///
/// `additional_certs` are extra candidates for intermediates on top of
/// `config.untrusted_certs`. Every failure is [`Error::ChainValidation`].
pub fn validate_cert_chain(
    leaf_der: &[u8],
    additional_certs: &[Vec<u8>],
    config: &CertValidationConfig<'_>,
) -> Result<(), Error> {
    let leaf = Certificate::from_der(leaf_der)
        .map_err(|e| Error::ChainValidation(format!("failed to parse leaf certificate: {e}")))?;

    let available: Vec<(Certificate, &[u8])> = additional_certs
        .iter()
        .chain(config.untrusted_certs)
        .filter(|der| der.as_slice() != leaf_der)
        .filter_map(|der| Certificate::from_der(der).ok().map(|c| (c, der.as_slice())))
        .collect();

    let trusted: Vec<(Certificate, &[u8])> = config
        .trusted_certs
        .iter()
        .filter_map(|der| Certificate::from_der(der).ok().map(|c| (c, der.as_slice())))
        .collect();

    if trusted.is_empty() {
        return Err(Error::ChainValidation(
            "no trusted certificates available".into(),
        ));
    }

    let verif_time = if config.skip_time_checks {
        None
    } else {
        Some(resolve_verification_time(config.verification_time)?)
    };

    if let Some(t) = &verif_time {
        check_cert_time_validity(&leaf, t)?;
    }

    build_and_verify_chain(&leaf, leaf_der, &available, &trusted, verif_time.as_ref())?;
    tracing::debug!(
        subject = %leaf.tbs_certificate.subject,
        "certificate chain validated"
    );
    Ok(())
}

/// Parse a verification time string into a `der::DateTime`.
/// Format: "YYYY-MM-DD+HH:MM:SS" (a `T` separator is accepted too).
pub fn parse_verification_time(s: &str) -> Result<der::DateTime, Error> {
    let s = s.trim();
    let invalid = || Error::ChainValidation(format!("invalid verification time format: {s}"));

    if s.len() != 19 || !s.is_ascii() {
        return Err(invalid());
    }
    if !matches!(&s[10..11], "+" | "T") {
        return Err(invalid());
    }

    let field = |range: std::ops::Range<usize>| s[range].parse::<u16>().map_err(|_| invalid());
    let year = field(0..4)?;
    let month = field(5..7)? as u8;
    let day = field(8..10)? as u8;
    let hour = field(11..13)? as u8;
    let min = field(14..16)? as u8;
    let sec = field(17..19)? as u8;

    der::DateTime::new(year, month, day, hour, min, sec)
        .map_err(|e| Error::ChainValidation(format!("invalid verification time: {e}")))
}

/// Get the current time as a `der::DateTime`, or use the override.
fn resolve_verification_time(override_time: Option<&str>) -> Result<der::DateTime, Error> {
    if let Some(time_str) = override_time {
        return parse_verification_time(time_str);
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| Error::ChainValidation(format!("system time error: {e}")))?;

    der::DateTime::from_unix_duration(now)
        .map_err(|e| Error::ChainValidation(format!("time conversion error: {e}")))
}

/// Check if a certificate is valid at the given time.
fn check_cert_time_validity(cert: &Certificate, verif_time: &der::DateTime) -> Result<(), Error> {
    let validity = &cert.tbs_certificate.validity;
    let not_before = validity.not_before.to_date_time();
    let not_after = validity.not_after.to_date_time();

    if *verif_time < not_before {
        return Err(Error::ChainValidation(format!(
            "certificate {} is not yet valid (notBefore: {not_before})",
            cert.tbs_certificate.subject
        )));
    }
    if *verif_time > not_after {
        return Err(Error::ChainValidation(format!(
            "certificate {} has expired (notAfter: {not_after})",
            cert.tbs_certificate.subject
        )));
    }
    Ok(())
}

fn name_der(name: &x509_cert::name::Name) -> Vec<u8> {
    name.to_der().unwrap_or_default()
}

/// Walk from the leaf to a trusted root, verifying each signature.
fn build_and_verify_chain(
    leaf: &Certificate,
    leaf_der: &[u8],
    available: &[(Certificate, &[u8])],
    trusted: &[(Certificate, &[u8])],
    verif_time: Option<&der::DateTime>,
) -> Result<(), Error> {
    // Leaf itself is a trusted (self-signed) certificate.
    if let Some((tc, _)) = trusted.iter().find(|(_, der)| *der == leaf_der) {
        return verify_cert_signature(leaf, &tc.tbs_certificate.subject_public_key_info);
    }

    let mut current = leaf.clone();
    let mut visited: Vec<&[u8]> = vec![leaf_der];

    for _ in 0..MAX_CHAIN_DEPTH {
        let issuer_der = name_der(&current.tbs_certificate.issuer);

        let trusted_issuer = trusted.iter().find(|(tc, _)| {
            name_der(&tc.tbs_certificate.subject) == issuer_der
                && verify_cert_signature(&current, &tc.tbs_certificate.subject_public_key_info)
                    .is_ok()
        });
        if let Some((tc, _)) = trusted_issuer {
            if let Some(t) = verif_time {
                check_cert_time_validity(tc, t)?;
            }
            return Ok(());
        }

        if name_der(&current.tbs_certificate.subject) == issuer_der {
            return Err(Error::ChainValidation(
                "self-signed certificate not in trusted store".into(),
            ));
        }

        let intermediate = available.iter().find(|(ic, ic_der)| {
            !visited.contains(ic_der)
                && name_der(&ic.tbs_certificate.subject) == issuer_der
                && verify_cert_signature(&current, &ic.tbs_certificate.subject_public_key_info)
                    .is_ok()
        });
        let Some((ic, ic_der)) = intermediate else {
            return Err(Error::ChainValidation(format!(
                "cannot find issuer certificate for {} (incomplete chain)",
                current.tbs_certificate.subject
            )));
        };
        if let Some(t) = verif_time {
            check_cert_time_validity(ic, t)?;
        }
        visited.push(ic_der);
        current = ic.clone();
    }

    Err(Error::ChainValidation("certificate chain too long".into()))
}

/// Verify a certificate's signature using the issuer's SPKI.
fn verify_cert_signature(
    cert: &Certificate,
    issuer_spki: &spki::SubjectPublicKeyInfoOwned,
) -> Result<(), Error> {
    let tbs_der = cert
        .tbs_certificate
        .to_der()
        .map_err(|e| Error::ChainValidation(format!("failed to encode TBS: {e}")))?;
    let sig_bytes = cert
        .signature
        .as_bytes()
        .ok_or_else(|| Error::ChainValidation("no signature bytes".into()))?;
    let spki_der = issuer_spki
        .to_der()
        .map_err(|e| Error::ChainValidation(format!("failed to encode issuer SPKI: {e}")))?;

    let oid_str = cert.signature_algorithm.oid.to_string();
    match oid_str.as_str() {
        SHA256_RSA => verify_rsa_signature::<sha2::Sha256>(&spki_der, &tbs_der, sig_bytes),
        SHA384_RSA => verify_rsa_signature::<sha2::Sha384>(&spki_der, &tbs_der, sig_bytes),
        SHA512_RSA => verify_rsa_signature::<sha2::Sha512>(&spki_der, &tbs_der, sig_bytes),
        _ => Err(Error::ChainValidation(format!(
            "unsupported certificate signature algorithm: {oid_str}"
        ))),
    }
}

/// Verify an RSA PKCS#1 v1.5 signature.
fn verify_rsa_signature<D>(
    issuer_spki_der: &[u8],
    tbs_der: &[u8],
    signature: &[u8],
) -> Result<(), Error>
where
    D: digest::Digest + digest::const_oid::AssociatedOid,
    rsa::pkcs1v15::VerifyingKey<D>: signature::Verifier<rsa::pkcs1v15::Signature>,
{
    use signature::Verifier;
    use spki::DecodePublicKey;

    let public_key = rsa::RsaPublicKey::from_public_key_der(issuer_spki_der)
        .map_err(|e| Error::ChainValidation(format!("issuer key is not RSA: {e}")))?;
    let verifying_key = rsa::pkcs1v15::VerifyingKey::<D>::new(public_key);
    let sig = rsa::pkcs1v15::Signature::try_from(signature)
        .map_err(|e| Error::ChainValidation(format!("invalid RSA signature: {e}")))?;

    verifying_key.verify(tbs_der, &sig).map_err(|e| {
        Error::ChainValidation(format!("certificate signature verification failed: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_certificate;

    const IN_VALIDITY: Option<&str> = Some("2030-06-01+12:00:00");

    fn cert(name: &str) -> Vec<u8> {
        let pem = std::fs::read(format!("../../test-data/keys/{name}")).unwrap();
        load_certificate(&pem).unwrap()
    }

    fn config<'a>(trusted: &'a [Vec<u8>], untrusted: &'a [Vec<u8>]) -> CertValidationConfig<'a> {
        CertValidationConfig {
            trusted_certs: trusted,
            untrusted_certs: untrusted,
            verification_time: IN_VALIDITY,
            skip_time_checks: false,
        }
    }

    #[test]
    fn test_leaf_issued_by_trusted_root() {
        let trusted = vec![cert("ca-cert.pem")];
        validate_cert_chain(&cert("signer-cert.pem"), &[], &config(&trusted, &[])).unwrap();
    }

    #[test]
    fn test_trusted_self_signed_leaf() {
        let trusted = vec![cert("other-cert.pem")];
        validate_cert_chain(&cert("other-cert.pem"), &[], &config(&trusted, &[])).unwrap();
    }

    #[test]
    fn test_root_supplied_only_as_untrusted() {
        let untrusted = vec![cert("ca-cert.pem")];
        let trusted = vec![cert("other-cert.pem")];
        let err = validate_cert_chain(&cert("signer-cert.pem"), &[], &config(&trusted, &untrusted))
            .unwrap_err();
        assert!(matches!(err, Error::ChainValidation(_)));
    }

    #[test]
    fn test_no_trusted_certificates() {
        let err = validate_cert_chain(&cert("signer-cert.pem"), &[], &config(&[], &[])).unwrap_err();
        assert!(err.to_string().contains("no trusted certificates"));
    }

    #[test]
    fn test_expired_at_verification_time() {
        let trusted = vec![cert("ca-cert.pem")];
        let cfg = CertValidationConfig {
            verification_time: Some("2099-01-01+00:00:00"),
            ..config(&trusted, &[])
        };
        let err = validate_cert_chain(&cert("signer-cert.pem"), &[], &cfg).unwrap_err();
        assert!(err.to_string().contains("expired"));

        let cfg = CertValidationConfig {
            skip_time_checks: true,
            ..cfg
        };
        validate_cert_chain(&cert("signer-cert.pem"), &[], &cfg).unwrap();
    }

    #[test]
    fn test_parse_verification_time() {
        let t = parse_verification_time("2030-06-01+12:34:56").unwrap();
        assert_eq!((t.year(), t.month(), t.day()), (2030, 6, 1));
        assert_eq!((t.hour(), t.minutes(), t.seconds()), (12, 34, 56));
        assert!(parse_verification_time("2030-06-01T12:34:56").is_ok());
        assert!(parse_verification_time("2030-06-01").is_err());
        assert!(parse_verification_time("2030-13-01+00:00:00").is_err());
    }
}
