#![forbid(unsafe_code)]

//! XML document wrapper over roxmltree with ID attribute lookup and
//! element content replacement.

use sgntr_core::{ns, Error};
use std::collections::{HashMap, HashSet};

/// An owned XML document.  Stores the text; parsing is done on demand.
///
/// To work with the parsed tree, call [`XmlDocument::parse_doc`] which
/// returns a temporary `roxmltree::Document` borrowing from the text.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    text: String,
}

impl XmlDocument {
    /// Parse and validate XML from a string, taking ownership.
    pub fn parse(text: String) -> Result<Self, Error> {
        roxmltree::Document::parse_with_options(&text, crate::parsing_options())
            .map_err(|e| Error::XmlParse(e.to_string()))?;
        Ok(Self { text })
    }

    /// Parse XML after removing indentation between elements.
    ///
    /// See [`crate::normalize::strip_indentation`].
    pub fn parse_normalized(text: &str) -> Result<Self, Error> {
        Self::parse(crate::normalize::strip_indentation(text)?)
    }

    /// Get the raw XML text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parse the document and return a temporary `roxmltree::Document`.
    pub fn parse_doc(&self) -> Result<roxmltree::Document<'_>, Error> {
        roxmltree::Document::parse_with_options(&self.text, crate::parsing_options())
            .map_err(|e| Error::XmlParse(e.to_string()))
    }

    /// Return the document text with every child of `element` replaced by
    /// `content`.
    ///
    /// `element` must come from [`XmlDocument::parse_doc`] on this
    /// document. The start and end tags are kept byte for byte; a
    /// self-closing tag is expanded into a start/end pair.
    pub fn replace_children(
        &self,
        element: roxmltree::Node<'_, '_>,
        content: &str,
    ) -> Result<String, Error> {
        let text = self.text.as_str();
        if !element.is_element() {
            return Err(Error::XmlStructure(
                "can only replace the children of an element".into(),
            ));
        }
        let range = element.range();
        let source = text
            .get(range.clone())
            .ok_or_else(|| Error::XmlStructure("element range outside document".into()))?;
        let tag_end = start_tag_end(source)?;
        let start_tag = &source[..=tag_end];

        let replacement = if let Some(open) = start_tag.strip_suffix("/>") {
            let open = open.trim_end();
            let qname = open[1..]
                .split(|c: char| c.is_ascii_whitespace())
                .next()
                .unwrap_or_default();
            format!("{open}>{content}</{qname}>")
        } else {
            let end_tag_start = source
                .rfind("</")
                .filter(|pos| *pos > tag_end)
                .ok_or_else(|| Error::XmlStructure("element has no end tag".into()))?;
            format!("{start_tag}{content}{}", &source[end_tag_start..])
        };

        let mut out = String::with_capacity(text.len() + content.len());
        out.push_str(&text[..range.start]);
        out.push_str(&replacement);
        out.push_str(&text[range.end..]);
        Ok(out)
    }
}

/// ID attribute values of one parsed document.
///
/// `Id`, `ID` and `id` are recognized. A value carried by more than one
/// element is remembered as ambiguous and cannot be resolved.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    ids: HashMap<String, roxmltree::NodeId>,
    duplicates: HashSet<String>,
}

impl IdMap {
    /// Build the ID → NodeId mapping for a parsed document.
    pub fn build(doc: &roxmltree::Document<'_>) -> Self {
        let mut map = Self::default();
        for node in doc.descendants().filter(|n| n.is_element()) {
            for attr_name in ns::attr::ID_ATTRS {
                if let Some(val) = node.attribute(attr_name) {
                    let previous = map.ids.insert(val.to_owned(), node.id());
                    if previous.is_some_and(|prev| prev != node.id()) {
                        map.duplicates.insert(val.to_owned());
                    }
                }
            }
        }
        map
    }

    /// Find the element carrying `id`.
    ///
    /// Missing IDs are [`Error::InvalidUri`]; ambiguous ones are
    /// [`Error::XmlStructure`].
    pub fn resolve<'a, 'input>(
        &self,
        doc: &'a roxmltree::Document<'input>,
        id: &str,
    ) -> Result<roxmltree::Node<'a, 'input>, Error> {
        if self.duplicates.contains(id) {
            return Err(Error::XmlStructure(format!("duplicate ID: {id}")));
        }
        self.ids
            .get(id)
            .and_then(|nid| doc.get_node(*nid))
            .ok_or_else(|| Error::InvalidUri(format!("ID not found: {id}")))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Byte offset of the `>` that closes the start tag at the beginning of
/// `source`, skipping any `>` inside quoted attribute values.
fn start_tag_end(source: &str) -> Result<usize, Error> {
    let mut quote: Option<char> = None;
    for (idx, ch) in source.char_indices() {
        match (quote, ch) {
            (None, '"' | '\'') => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Ok(idx),
            _ => {}
        }
    }
    Err(Error::XmlStructure("unterminated start tag".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replace(xml: &str, local_name: &str, content: &str) -> String {
        let doc = XmlDocument::parse(xml.to_owned()).unwrap();
        let tree = doc.parse_doc().unwrap();
        let node = tree
            .descendants()
            .find(|n| n.has_tag_name(local_name))
            .unwrap();
        doc.replace_children(node, content).unwrap()
    }

    #[test]
    fn test_replace_self_closing() {
        let xml = "<DataPDU><AppHdr><Sgntr/></AppHdr></DataPDU>";
        assert_eq!(
            replace(xml, "Sgntr", "<x/>"),
            "<DataPDU><AppHdr><Sgntr><x/></Sgntr></AppHdr></DataPDU>"
        );
    }

    #[test]
    fn test_replace_self_closing_with_attributes() {
        let xml = "<a><h:Sgntr xmlns:h=\"urn:h\" k='>' /></a>";
        assert_eq!(
            replace(xml, "Sgntr", "new"),
            "<a><h:Sgntr xmlns:h=\"urn:h\" k='>'>new</h:Sgntr></a>"
        );
    }

    #[test]
    fn test_replace_existing_children() {
        let xml = "<a>\n  <Sgntr>\n    <old>1</old>\n    <old>2</old>\n  </Sgntr>\n</a>";
        assert_eq!(
            replace(xml, "Sgntr", "<new/>"),
            "<a>\n  <Sgntr><new/></Sgntr>\n</a>"
        );
    }

    #[test]
    fn test_replace_nested_same_name() {
        let doc = XmlDocument::parse("<a><b><b>inner</b></b><c/></a>".into()).unwrap();
        let tree = doc.parse_doc().unwrap();
        let outer = tree.root_element().first_element_child().unwrap();
        let out = doc.replace_children(outer, "z").unwrap();
        assert_eq!(out, "<a><b>z</b><c/></a>");
    }

    #[test]
    fn test_id_map_resolves_all_id_spellings() {
        let doc = roxmltree::Document::parse(r#"<a Id="x"><b ID="y"/><c id="z"/></a>"#).unwrap();
        let map = IdMap::build(&doc);
        assert_eq!(map.len(), 3);
        assert!(map.resolve(&doc, "y").unwrap().has_tag_name("b"));
        assert!(matches!(map.resolve(&doc, "nope"), Err(Error::InvalidUri(_))));
    }

    #[test]
    fn test_duplicate_id_is_ambiguous() {
        let doc = roxmltree::Document::parse(r#"<a><b Id="x"/><c Id="x"/><d Id="w"/></a>"#).unwrap();
        let map = IdMap::build(&doc);
        assert!(matches!(map.resolve(&doc, "x"), Err(Error::XmlStructure(_))));
        assert!(map.resolve(&doc, "w").is_ok());
    }

    #[test]
    fn test_parse_normalized() {
        let doc = XmlDocument::parse_normalized("<a>\n  <b>1</b>\n</a>").unwrap();
        assert_eq!(doc.text(), "<a><b>1</b></a>");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            XmlDocument::parse("<a><b></a>".into()),
            Err(Error::XmlParse(_))
        ));
    }
}
