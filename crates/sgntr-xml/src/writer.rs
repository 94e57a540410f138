#![forbid(unsafe_code)]

//! XML writing utilities using quick-xml for signature fragment building.
//!
//! Output is compact: no declaration, no indentation, so the written
//! fragment carries no whitespace text nodes into what gets signed.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use sgntr_core::Error;

/// A simple XML writer wrapping `quick_xml::Writer`.
pub struct XmlWriter {
    writer: quick_xml::Writer<Vec<u8>>,
}

impl XmlWriter {
    /// Create a new XML writer.
    pub fn new() -> Self {
        Self {
            writer: quick_xml::Writer::new(Vec::new()),
        }
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), Error> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::XmlWrite(e.to_string()))
    }

    /// Start an element with the given name and attributes.
    pub fn start_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), Error> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.write(Event::Start(start))
    }

    /// Write an empty element (self-closing).
    pub fn empty_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), Error> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.write(Event::Empty(start))
    }

    /// End the current element.
    pub fn end_element(&mut self, name: &str) -> Result<(), Error> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    /// Write escaped text content.
    pub fn write_text(&mut self, text: &str) -> Result<(), Error> {
        self.write(Event::Text(BytesText::new(text)))
    }

    /// Write `<name attrs>text</name>`.
    pub fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<(), Error> {
        self.start_element(name, attrs)?;
        self.write_text(text)?;
        self.end_element(name)
    }

    /// Finish writing and return the XML as a string.
    pub fn into_string(self) -> Result<String, Error> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| Error::XmlWrite(format!("invalid UTF-8 output: {e}")))
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_elements_with_escaping() {
        let mut w = XmlWriter::new();
        w.start_element("ds:KeyInfo", &[("xmlns:ds", "urn:ds"), ("Id", "_k")])
            .unwrap();
        w.text_element("ds:X509IssuerName", &[], "CN=A&B, O=\"Q\"")
            .unwrap();
        w.empty_element("ds:Empty", &[("Algorithm", "urn:a<b")]).unwrap();
        w.end_element("ds:KeyInfo").unwrap();
        let out = w.into_string().unwrap();
        assert!(out.starts_with(r#"<ds:KeyInfo xmlns:ds="urn:ds" Id="_k">"#));
        assert!(out.contains("CN=A&amp;B"));
        assert!(out.contains(r#"Algorithm="urn:a&lt;b""#));
        assert!(out.ends_with("</ds:KeyInfo>"));

        // Reads back to the same values.
        let doc = roxmltree::Document::parse(&out).unwrap();
        let issuer = doc
            .descendants()
            .find(|n| n.has_tag_name("X509IssuerName"))
            .unwrap();
        assert_eq!(issuer.text(), Some("CN=A&B, O=\"Q\""));
    }
}
