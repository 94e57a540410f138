#![forbid(unsafe_code)]

pub use sgntr_core as core;
pub use sgntr_xml as xml;
pub use sgntr_c14n as c14n;
pub use sgntr_crypto as crypto;
pub use sgntr_pkcs12 as pkcs12;
pub use sgntr_keys as keys;
pub use sgntr_xades as xades;

pub use sgntr_core::{Error, Result};
pub use sgntr_keys::Credential;
pub use sgntr_xades::{sign, verify, XadesContext};
