#![forbid(unsafe_code)]

//! Cryptographic primitives for sgntr.
//!
//! One digest (SHA-256) and one signature algorithm (RSA PKCS#1 v1.5 with
//! SHA-256). Both are looked up by their XML algorithm URI so that a
//! document naming anything else is rejected up front.

pub mod digest;
pub mod sign;

pub use digest::DigestAlgorithm;
pub use sign::RsaSha256;
