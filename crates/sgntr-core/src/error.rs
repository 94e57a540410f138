#![forbid(unsafe_code)]

/// Errors produced while signing or verifying a DataPDU envelope.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A mandatory envelope node (`DataPDU`, `Sgntr`, `Document`) is missing.
    #[error("envelope structure error: {0}")]
    Structure(String),

    /// The certificate or key cannot be used for RSA signing/verification.
    #[error("credential error: {0}")]
    Credential(String),

    /// The signed document does not carry exactly three references.
    #[error("expected 3 references in SignedInfo, found {found}")]
    ReferenceCount { found: usize },

    #[error("digest mismatch for reference: {0}")]
    DigestMismatch(String),

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("certificate chain validation failed: {0}")]
    ChainValidation(String),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("XML write error: {0}")]
    XmlWrite(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("invalid URI reference: {0}")]
    InvalidUri(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_count_message() {
        let err = Error::ReferenceCount { found: 4 };
        assert_eq!(err.to_string(), "expected 3 references in SignedInfo, found 4");
    }

    #[test]
    fn test_io_error_converts() {
        fn open() -> Result<Vec<u8>> {
            Ok(std::fs::read("/nonexistent/sgntr/envelope.xml")?)
        }
        assert!(matches!(open(), Err(Error::Io(_))));
    }
}
