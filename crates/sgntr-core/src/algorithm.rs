#![forbid(unsafe_code)]

//! Algorithm URI constants.
//!
//! The signer is fixed to one algorithm per slot; these are the strings
//! that appear in the `Algorithm` attributes it writes and accepts.

// ── Canonicalization ─────────────────────────────────────────────────

pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

// ── Digest ───────────────────────────────────────────────────────────

pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

// ── Signature ────────────────────────────────────────────────────────

pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
