#![forbid(unsafe_code)]

//! XAdES qualifying properties.
//!
//! Only the signed signature properties a BES signature needs are built:
//! `SigningTime`. The structure written is
//!
//! ```text
//! xades:QualifyingProperties Id Target
//!   xades:SignedProperties Id
//!     xades:SignedSignatureProperties
//!       xades:SigningTime
//! ```

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sgntr_core::{ns, Error};
use sgntr_xml::locate::required_child_element;
use sgntr_xml::XmlWriter;

use crate::id::{new_id, signed_properties_id};
use crate::qname::{xades, xmlns};

/// `xades:SignedProperties`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedProperties {
    pub id: String,
    pub signing_time: DateTime<Utc>,
}

/// `xades:QualifyingProperties`, placed in the signature's `ds:Object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifyingProperties {
    pub id: String,
    /// `#` followed by the `Id` of the `ds:Signature` these qualify.
    pub target: String,
    pub signed_properties: SignedProperties,
}

impl QualifyingProperties {
    /// Fresh properties for the signature with Id `signature_id`.
    ///
    /// The signing time is kept to whole seconds, which is what the
    /// serialized form carries.
    pub fn build(signing_time: DateTime<Utc>, signature_id: &str) -> Self {
        Self {
            id: new_id(),
            target: format!("#{signature_id}"),
            signed_properties: SignedProperties {
                id: signed_properties_id(),
                signing_time: signing_time.trunc_subsecs(0),
            },
        }
    }

    pub fn write(&self, w: &mut XmlWriter) -> Result<(), Error> {
        let qp = xades(ns::node::QUALIFYING_PROPERTIES);
        let sp = xades(ns::node::SIGNED_PROPERTIES);
        let ssp = xades(ns::node::SIGNED_SIGNATURE_PROPERTIES);
        let xmlns_xades = xmlns(ns::XADES_PREFIX);

        w.start_element(
            &qp,
            &[
                (xmlns_xades.as_str(), ns::XADES),
                (ns::attr::ID, self.id.as_str()),
                (ns::attr::TARGET, self.target.as_str()),
            ],
        )?;
        w.start_element(&sp, &[(ns::attr::ID, self.signed_properties.id.as_str())])?;
        w.start_element(&ssp, &[])?;
        w.text_element(
            &xades(ns::node::SIGNING_TIME),
            &[],
            &format_signing_time(&self.signed_properties.signing_time),
        )?;
        w.end_element(&ssp)?;
        w.end_element(&sp)?;
        w.end_element(&qp)
    }

    /// Serialize as a standalone fragment.
    pub fn to_xml(&self) -> Result<String, Error> {
        let mut w = XmlWriter::new();
        self.write(&mut w)?;
        w.into_string()
    }

    /// Read a `xades:QualifyingProperties` element.
    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Result<Self, Error> {
        let id = required_attribute(node, ns::attr::ID)?;
        let target = required_attribute(node, ns::attr::TARGET)?;
        let sp = required_child_element(node, ns::XADES, ns::node::SIGNED_PROPERTIES)?;
        let ssp = required_child_element(sp, ns::XADES, ns::node::SIGNED_SIGNATURE_PROPERTIES)?;
        let signing_time = required_child_element(ssp, ns::XADES, ns::node::SIGNING_TIME)?;

        Ok(Self {
            id,
            target,
            signed_properties: SignedProperties {
                id: required_attribute(sp, ns::attr::ID)?,
                signing_time: parse_signing_time(signing_time.text().unwrap_or(""))?,
            },
        })
    }
}

/// `2026-10-19T09:30:00Z`
pub fn format_signing_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an `xsd:dateTime` with an explicit offset.
pub fn parse_signing_time(text: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::XmlStructure(format!("invalid SigningTime {text:?}: {e}")))
}

fn required_attribute(node: roxmltree::Node<'_, '_>, name: &str) -> Result<String, Error> {
    node.attribute(name)
        .map(str::to_owned)
        .ok_or_else(|| Error::MissingAttribute(format!("{name} on {}", node.tag_name().name())))
}
