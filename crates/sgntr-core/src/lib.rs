#![forbid(unsafe_code)]

//! Core types for the sgntr XAdES envelope signer.
//!
//! Holds the error taxonomy, the algorithm URIs the signer is hard-wired
//! to, and the element/attribute names of the DSig, XAdES and envelope
//! vocabularies.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
