#![forbid(unsafe_code)]

//! XAdES-BES signatures for DataPDU envelopes.
//!
//! The signature lives inside `AppHdr/Sgntr` and covers three things: its
//! own `KeyInfo`, the XAdES `SignedProperties`, and the business
//! `Document`. Because the signature sits inside the envelope it signs,
//! [`sign`] works in two passes; [`verify`] rebuilds the payload reference
//! from the live document before checking digests.

pub mod context;
pub mod envelope;
pub mod id;
pub mod properties;
pub mod reference;
pub mod sign;
pub mod signature;
pub mod verify;

mod qname;

pub use context::XadesContext;
pub use envelope::Envelope;
pub use properties::{QualifyingProperties, SignedProperties};
pub use reference::{Reference, ReferenceTarget};
pub use sign::sign;
pub use signature::{KeyInfo, Signature, SignedInfo};
pub use verify::verify;
