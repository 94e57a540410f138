#![forbid(unsafe_code)]

//! RSA PKCS#1 v1.5 signatures over SHA-256.

use sgntr_core::{algorithm, Error};
use signature::SignatureEncoding;

/// The `http://www.w3.org/2001/04/xmldsig-more#rsa-sha256` algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaSha256;

impl RsaSha256 {
    /// Look the algorithm up by its URI.
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        if uri == algorithm::RSA_SHA256 {
            Ok(Self)
        } else {
            Err(Error::UnsupportedAlgorithm(format!(
                "signature algorithm: {uri}"
            )))
        }
    }

    pub fn uri(&self) -> &'static str {
        algorithm::RSA_SHA256
    }

    /// Sign `data`, hashing it with SHA-256 first.
    pub fn sign(&self, private_key: &rsa::RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        use signature::Signer;
        let sk = rsa::pkcs1v15::SigningKey::<sha2::Sha256>::new(private_key.clone());
        let sig = sk
            .try_sign(data)
            .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))?;
        Ok(sig.to_vec())
    }

    /// Check `sig_bytes` over `data`. A well-formed signature that does not
    /// match yields `Ok(false)`.
    pub fn verify(
        &self,
        public_key: &rsa::RsaPublicKey,
        data: &[u8],
        sig_bytes: &[u8],
    ) -> Result<bool, Error> {
        use signature::Verifier;
        let sig = rsa::pkcs1v15::Signature::try_from(sig_bytes)
            .map_err(|e| Error::Crypto(format!("invalid RSA signature: {e}")))?;
        let vk = rsa::pkcs1v15::VerifyingKey::<sha2::Sha256>::new(public_key.clone());
        Ok(vk.verify(data, &sig).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkcs8::DecodePrivateKey;

    fn test_key() -> rsa::RsaPrivateKey {
        let pem = std::fs::read_to_string(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../test-data/keys/signer-key.pem"
        ))
        .unwrap();
        rsa::RsaPrivateKey::from_pkcs8_pem(&pem).unwrap()
    }

    #[test]
    fn test_sign_verify() {
        let key = test_key();
        let alg = RsaSha256::from_uri(algorithm::RSA_SHA256).unwrap();
        let sig = alg.sign(&key, b"<ds:SignedInfo/>").unwrap();
        assert!(alg.verify(&key.to_public_key(), b"<ds:SignedInfo/>", &sig).unwrap());
        assert!(!alg.verify(&key.to_public_key(), b"<ds:SignedInfo />", &sig).unwrap());
    }

    #[test]
    fn test_deterministic() {
        let key = test_key();
        let a = RsaSha256.sign(&key, b"data").unwrap();
        let b = RsaSha256.sign(&key, b"data").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_other_algorithms_rejected() {
        assert!(matches!(
            RsaSha256::from_uri("http://www.w3.org/2000/09/xmldsig#rsa-sha1"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }
}
