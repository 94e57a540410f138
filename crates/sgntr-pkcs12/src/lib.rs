#![forbid(unsafe_code)]

//! PKCS#12 (.p12/.pfx) reader for sgntr.
//!
//! Signing certificates are usually handed out as a password-protected
//! PFX. This crate checks the integrity MAC and decrypts the bags written
//! by OpenSSL 3.x (PBES2: PBKDF2 + AES-256-CBC) and by older tools
//! (pbeWithSHAAnd3-KeyTripleDES-CBC).

mod kdf;
mod parse;

/// Keys and certificates found in a PFX.
#[derive(Debug, Default)]
pub struct Pkcs12Contents {
    /// PKCS#8 DER private keys, in bag order.
    pub private_keys: Vec<Vec<u8>>,
    /// DER X.509 certificates, in bag order.
    pub certificates: Vec<Vec<u8>>,
}

/// Parse a PFX and decrypt it with `password`.
///
/// A wrong password is reported as [`sgntr_core::Error::Credential`].
pub fn parse_pkcs12(data: &[u8], password: &str) -> Result<Pkcs12Contents, sgntr_core::Error> {
    parse::parse_pfx(data, password)
}
