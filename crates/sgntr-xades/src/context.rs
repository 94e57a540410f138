#![forbid(unsafe_code)]

//! XAdES context: trust anchors and time settings for sign/verify.

use chrono::{DateTime, Utc};
use sgntr_keys::CertValidationConfig;

/// Settings shared by [`crate::sign`] and [`crate::verify`].
#[derive(Debug, Clone, Default)]
pub struct XadesContext {
    /// Trusted CA certificates (DER-encoded) for chain validation.
    pub trusted_certs: Vec<Vec<u8>>,
    /// Untrusted intermediate certificates (DER-encoded).
    pub untrusted_certs: Vec<Vec<u8>>,
    /// Override the chain validation time (format: "YYYY-MM-DD+HH:MM:SS").
    pub verification_time: Option<String>,
    /// Skip certificate validity period checks.
    pub skip_time_checks: bool,
    /// Fixed `SigningTime` instead of the current time.
    pub signing_time: Option<DateTime<Utc>>,
}

impl XadesContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trusted CA certificate (DER).
    pub fn add_trusted_cert(&mut self, der: Vec<u8>) {
        self.trusted_certs.push(der);
    }

    /// Add an untrusted intermediate certificate (DER).
    pub fn add_untrusted_cert(&mut self, der: Vec<u8>) {
        self.untrusted_certs.push(der);
    }

    /// The time to stamp into `SigningTime`.
    pub fn signing_time(&self) -> DateTime<Utc> {
        self.signing_time.unwrap_or_else(Utc::now)
    }

    /// Chain validation settings borrowed from this context.
    pub fn chain_config(&self) -> CertValidationConfig<'_> {
        CertValidationConfig {
            trusted_certs: &self.trusted_certs,
            untrusted_certs: &self.untrusted_certs,
            verification_time: self.verification_time.as_deref(),
            skip_time_checks: self.skip_time_checks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_signing_time_override() {
        let fixed = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
        let ctx = XadesContext {
            signing_time: Some(fixed),
            ..XadesContext::default()
        };
        assert_eq!(ctx.signing_time(), fixed);
    }

    #[test]
    fn test_chain_config_borrows_settings() {
        let mut ctx = XadesContext::new();
        ctx.add_trusted_cert(vec![1, 2, 3]);
        ctx.add_untrusted_cert(vec![4]);
        ctx.verification_time = Some("2030-06-01+12:00:00".into());
        let config = ctx.chain_config();
        assert_eq!(config.trusted_certs.len(), 1);
        assert_eq!(config.untrusted_certs, &[vec![4u8]]);
        assert_eq!(config.verification_time, Some("2030-06-01+12:00:00"));
        assert!(!config.skip_time_checks);
    }
}
