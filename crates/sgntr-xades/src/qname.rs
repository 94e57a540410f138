#![forbid(unsafe_code)]

//! Prefixed element names as written by the signer.

use sgntr_core::ns;

pub(crate) fn ds(local_name: &str) -> String {
    format!("{}:{local_name}", ns::DSIG_PREFIX)
}

pub(crate) fn xades(local_name: &str) -> String {
    format!("{}:{local_name}", ns::XADES_PREFIX)
}

/// `xmlns:<prefix>` attribute name.
pub(crate) fn xmlns(prefix: &str) -> String {
    format!("xmlns:{prefix}")
}
