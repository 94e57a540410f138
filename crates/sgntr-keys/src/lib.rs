#![forbid(unsafe_code)]

//! Signing credentials for sgntr.
//!
//! A [`Credential`] pairs an X.509 certificate with its RSA public key and,
//! on the signing side, the matching RSA private key. Loaders accept PEM
//! or DER input and password-protected PKCS#12 bundles; [`x509::validate_cert_chain`] checks a certificate
//! against trusted roots.

pub mod key;
pub mod loader;
pub mod x509;

pub use key::Credential;
pub use x509::CertValidationConfig;
