#![forbid(unsafe_code)]

//! The signing/verification credential.

use der::Decode;
use sgntr_core::Error;
use x509_cert::Certificate;

/// An X.509 certificate with its RSA public key and an optional private key.
///
/// Constructed only through [`Credential::from_certificate_der`], which
/// rejects certificates that do not carry an RSA key, and
/// [`Credential::with_private_key`], which rejects a private key that does
/// not belong to the certificate.
#[derive(Clone)]
pub struct Credential {
    certificate_der: Vec<u8>,
    certificate: Certificate,
    public: rsa::RsaPublicKey,
    private: Option<rsa::RsaPrivateKey>,
}

impl Credential {
    /// Build a verification-only credential from a DER certificate.
    pub fn from_certificate_der(certificate_der: Vec<u8>) -> Result<Self, Error> {
        use der::Encode;
        use spki::DecodePublicKey;

        let certificate = Certificate::from_der(&certificate_der)
            .map_err(|e| Error::Credential(format!("failed to parse X.509 certificate: {e}")))?;
        let spki_der = certificate
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| Error::Credential(format!("failed to encode SPKI: {e}")))?;
        let public = rsa::RsaPublicKey::from_public_key_der(&spki_der).map_err(|_| {
            Error::Credential(format!(
                "certificate key is not RSA (algorithm {})",
                certificate.tbs_certificate.subject_public_key_info.algorithm.oid
            ))
        })?;

        Ok(Self {
            certificate_der,
            certificate,
            public,
            private: None,
        })
    }

    /// Attach the private key. It must match the certificate's public key.
    pub fn with_private_key(mut self, private: rsa::RsaPrivateKey) -> Result<Self, Error> {
        if private.to_public_key() != self.public {
            return Err(Error::Credential(
                "private key does not match the certificate".into(),
            ));
        }
        self.private = Some(private);
        Ok(self)
    }

    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn public_key(&self) -> &rsa::RsaPublicKey {
        &self.public
    }

    /// The RSA private key, or [`Error::Credential`] for a
    /// verification-only credential.
    pub fn private_key(&self) -> Result<&rsa::RsaPrivateKey, Error> {
        self.private
            .as_ref()
            .ok_or_else(|| Error::Credential("credential has no RSA private key".into()))
    }

    pub fn has_private_key(&self) -> bool {
        self.private.is_some()
    }

    /// Issuer distinguished name in RFC 4514 form.
    pub fn issuer_name(&self) -> String {
        self.certificate.tbs_certificate.issuer.to_string()
    }

    /// Subject distinguished name in RFC 4514 form.
    pub fn subject_name(&self) -> String {
        self.certificate.tbs_certificate.subject.to_string()
    }

    /// Serial number as an unsigned decimal string, as `X509SerialNumber`
    /// requires.
    pub fn serial_number(&self) -> String {
        format_serial_decimal(self.certificate.tbs_certificate.serial_number.as_bytes())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("subject", &self.subject_name())
            .field("issuer", &self.issuer_name())
            .field("serial", &self.serial_number())
            .field("private_key", &self.private.is_some())
            .finish()
    }
}

/// Format big-endian serial bytes as a decimal string.
pub fn format_serial_decimal(bytes: &[u8]) -> String {
    rsa::BigUint::from_bytes_be(bytes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader;

    fn signer_cert_der() -> Vec<u8> {
        let pem = std::fs::read("../../test-data/keys/signer-cert.pem").unwrap();
        loader::load_certificate(&pem).unwrap()
    }

    #[test]
    fn test_format_serial_decimal() {
        assert_eq!(format_serial_decimal(&[]), "0");
        assert_eq!(format_serial_decimal(&[0x00, 0xff]), "255");
        assert_eq!(
            format_serial_decimal(&[0x1A, 0x2B, 0x3C, 0x4D, 0x5E, 0x6F]),
            "28772997619311"
        );
    }

    #[test]
    fn test_certificate_identity() {
        let cred = Credential::from_certificate_der(signer_cert_der()).unwrap();
        assert_eq!(cred.serial_number(), "28772997619311");
        assert!(cred.issuer_name().contains("CN=Sgntr Test Root CA"));
        assert!(cred.subject_name().contains("CN=Payment Signer"));
        assert!(!cred.has_private_key());
        assert!(matches!(cred.private_key(), Err(Error::Credential(_))));
    }

    #[test]
    fn test_matching_private_key() {
        let key = std::fs::read("../../test-data/keys/signer-key.pem").unwrap();
        let key = loader::load_rsa_private_key(&key).unwrap();
        let cred = Credential::from_certificate_der(signer_cert_der())
            .unwrap()
            .with_private_key(key)
            .unwrap();
        assert!(cred.private_key().is_ok());
    }

    #[test]
    fn test_mismatched_private_key() {
        let key = std::fs::read("../../test-data/keys/other-key.pem").unwrap();
        let key = loader::load_rsa_private_key(&key).unwrap();
        let result = Credential::from_certificate_der(signer_cert_der())
            .unwrap()
            .with_private_key(key);
        assert!(matches!(result, Err(Error::Credential(_))));
    }

    #[test]
    fn test_ec_certificate_rejected() {
        let pem = std::fs::read("../../test-data/keys/ec-cert.pem").unwrap();
        let der = loader::load_certificate(&pem).unwrap();
        let err = Credential::from_certificate_der(der).unwrap_err();
        assert!(matches!(err, Error::Credential(_)));
        assert!(err.to_string().contains("not RSA"));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let cred = Credential::from_certificate_der(signer_cert_der()).unwrap();
        let dbg = format!("{cred:?}");
        assert!(dbg.contains("28772997619311"));
        assert!(dbg.contains("private_key: false"));
    }
}
