#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N), without comments.
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//!
//! Only "visibly utilized" namespace declarations are output. A namespace
//! is visibly utilized by an element if its prefix is used by the
//! element's tag name or by one of its attributes. The default namespace
//! counts as utilized by every unprefixed element.

use crate::escape;
use crate::render::{Attr, NsDecl};
use sgntr_core::{ns, Error};
use sgntr_xml::NodeSet;
use std::collections::{BTreeMap, BTreeSet};

/// Canonicalize `doc`, restricted to `node_set` when one is given.
///
/// Comment nodes are never rendered. Elements outside the node set are
/// skipped but their children are still visited, so a subtree selected
/// deep inside the document renders on its own.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    let ctx = ExcC14nContext { node_set };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new())?;
    Ok(output)
}

struct ExcC14nContext<'a> {
    node_set: Option<&'a NodeSet>,
}

impl ExcC14nContext<'_> {
    fn is_visible(&self, node: roxmltree::Node<'_, '_>) -> bool {
        match self.node_set {
            None => true,
            Some(set) => set.contains(node),
        }
    }

    fn process_node(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        match node.node_type() {
            roxmltree::NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, rendered_ns)?;
                }
            }
            roxmltree::NodeType::Element => {
                self.process_element(node, output, rendered_ns)?;
            }
            roxmltree::NodeType::Text => {
                if self.is_visible(node) {
                    let text = node.text().unwrap_or("");
                    escape::write_text(output, text);
                }
            }
            roxmltree::NodeType::PI => {
                if let (true, Some(pi)) = (self.is_visible(node), node.pi()) {
                    let parent_is_root = node.parent().is_some_and(|p| p.is_root());

                    if parent_is_root && has_preceding_element(node) {
                        output.push(b'\n');
                    }

                    output.extend_from_slice(b"<?");
                    output.extend_from_slice(pi.target.as_bytes());
                    if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                        output.push(b' ');
                        escape::write_pi_data(output, value);
                    }
                    output.extend_from_slice(b"?>");

                    if parent_is_root && has_following_element(node) {
                        output.push(b'\n');
                    }
                }
            }
            roxmltree::NodeType::Comment => {}
        }
        Ok(())
    }

    fn process_element(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        if !self.is_visible(node) {
            // Namespace declarations are only rendered on visible start
            // tags, so descendants keep the same rendered context.
            for child in node.children() {
                self.process_node(child, output, rendered_ns)?;
            }
            return Ok(());
        }

        let elem_name = qualified_element_name(node)?;
        let inscope_ns = collect_inscope_namespaces(node);

        // Prefixes visibly utilized by the tag name and the attributes.
        let mut utilized_prefixes: BTreeSet<String> = BTreeSet::new();
        utilized_prefixes.insert(
            elem_name
                .split_once(':')
                .map(|(prefix, _)| prefix.to_owned())
                .unwrap_or_default(),
        );

        let mut attrs: Vec<Attr> = Vec::new();
        for attr in node.attributes() {
            let ns_uri = attr.namespace().unwrap_or("");
            let qname = match find_attr_prefix(node, &attr)? {
                Some(prefix) => {
                    utilized_prefixes.insert(prefix.clone());
                    format!("{}:{}", prefix, attr.name())
                }
                None => attr.name().to_owned(),
            };
            attrs.push(Attr {
                ns_uri: ns_uri.to_owned(),
                local_name: attr.name().to_owned(),
                qualified_name: qname,
                value: attr.value().to_owned(),
            });
        }
        attrs.sort();

        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in &utilized_prefixes {
            if prefix == "xml" {
                continue;
            }

            if let Some(uri) = inscope_ns.get(prefix) {
                if rendered_ns.get(prefix) != Some(uri) {
                    ns_decls.push(NsDecl {
                        prefix: prefix.clone(),
                        uri: uri.clone(),
                    });
                }
            } else if prefix.is_empty() {
                // Unprefixed element with no default namespace in scope:
                // undo a default namespace rendered by an output ancestor.
                if rendered_ns.get("").is_some_and(|uri| !uri.is_empty()) {
                    ns_decls.push(NsDecl {
                        prefix: String::new(),
                        uri: String::new(),
                    });
                }
            } else {
                return Err(Error::Canonicalization(format!(
                    "prefix '{prefix}' on <{elem_name}> is not bound"
                )));
            }
        }
        ns_decls.sort();

        output.push(b'<');
        output.extend_from_slice(elem_name.as_bytes());
        for ns_decl in &ns_decls {
            ns_decl.write_to(output);
        }
        for attr in &attrs {
            attr.write_to(output);
        }
        output.push(b'>');

        let mut child_rendered_ns = rendered_ns.clone();
        for ns_decl in ns_decls {
            child_rendered_ns.insert(ns_decl.prefix, ns_decl.uri);
        }

        for child in node.children() {
            self.process_node(child, output, &child_rendered_ns)?;
        }

        output.extend_from_slice(b"</");
        output.extend_from_slice(elem_name.as_bytes());
        output.push(b'>');
        Ok(())
    }
}

fn has_preceding_element(node: roxmltree::Node<'_, '_>) -> bool {
    node.prev_siblings().skip(1).any(|s| s.is_element())
}

fn has_following_element(node: roxmltree::Node<'_, '_>) -> bool {
    node.next_siblings().skip(1).any(|s| s.is_element())
}

/// Collect all in-scope namespaces for an element.
///
/// roxmltree already resolves inheritance per element, so the element's
/// own namespace list is the full in-scope set. An empty URI means the
/// default namespace was reset with `xmlns=""`.
fn collect_inscope_namespaces(node: roxmltree::Node<'_, '_>) -> BTreeMap<String, String> {
    node.namespaces()
        .filter(|ns| !ns.uri().is_empty())
        .map(|ns| (ns.name().unwrap_or("").to_owned(), ns.uri().to_owned()))
        .collect()
}

/// The element's tag name exactly as written in the source, `prefix:local`
/// or `local`.
fn qualified_element_name(node: roxmltree::Node<'_, '_>) -> Result<String, Error> {
    let text = node.document().input_text();
    let start = node.range().start + 1;
    let rest = text.get(start..).unwrap_or("");
    let end = rest
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(rest.len());
    let qname = &rest[..end];
    if !qname.ends_with(node.tag_name().name()) {
        return Err(Error::Canonicalization(format!(
            "cannot recover tag name for <{}>",
            node.tag_name().name()
        )));
    }
    Ok(qname.to_owned())
}

/// Find the prefix used for a namespaced attribute.
fn find_attr_prefix(
    node: roxmltree::Node<'_, '_>,
    attr: &roxmltree::Attribute<'_, '_>,
) -> Result<Option<String>, Error> {
    let Some(ns_uri) = attr.namespace() else {
        return Ok(None);
    };
    if ns_uri == ns::XML {
        return Ok(Some("xml".to_owned()));
    }
    // Namespaced attributes always carry a prefix, never the default.
    node.namespaces()
        .find(|ns| ns.uri() == ns_uri && ns.name().is_some())
        .and_then(|ns| ns.name())
        .map(|p| Some(p.to_owned()))
        .ok_or_else(|| {
            Error::Canonicalization(format!(
                "no prefix bound for attribute namespace {ns_uri}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c14n(xml: &str) -> String {
        let doc = roxmltree::Document::parse(xml).unwrap();
        String::from_utf8(canonicalize(&doc, None).unwrap()).unwrap()
    }

    fn c14n_subtree(xml: &str, local_name: &str) -> String {
        let doc = roxmltree::Document::parse(xml).unwrap();
        let node = doc
            .descendants()
            .find(|n| n.has_tag_name(local_name))
            .unwrap();
        let set = NodeSet::tree_without_comments(node);
        String::from_utf8(canonicalize(&doc, Some(&set)).unwrap()).unwrap()
    }

    #[test]
    fn test_attribute_sorting() {
        let xml = r#"<root><a b="1" a="2"/></root>"#;
        assert_eq!(c14n(xml), r#"<root><a a="2" b="1"></a></root>"#);
    }

    #[test]
    fn test_namespaced_attributes_sort_after_plain() {
        let xml = r#"<e xmlns:z="urn:z" xmlns:a="urn:a" z:k="1" a:k="2" k="3"/>"#;
        assert_eq!(
            c14n(xml),
            r#"<e xmlns:a="urn:a" xmlns:z="urn:z" k="3" a:k="2" z:k="1"></e>"#
        );
    }

    #[test]
    fn test_unused_namespace_dropped() {
        let xml = r#"<root xmlns:unused="urn:unused" xmlns:p="urn:p"><p:child/></root>"#;
        assert_eq!(c14n(xml), r#"<root><p:child xmlns:p="urn:p"></p:child></root>"#);
    }

    #[test]
    fn test_subtree_inherits_default_namespace() {
        let xml = r#"<env xmlns="urn:env" xmlns:x="urn:x"><body><Document>ok</Document></body></env>"#;
        assert_eq!(
            c14n_subtree(xml, "Document"),
            r#"<Document xmlns="urn:env">ok</Document>"#
        );
    }

    #[test]
    fn test_comments_dropped() {
        let xml = "<root><!-- note --><a>x<!-- inner --></a></root>";
        assert_eq!(c14n(xml), "<root><a>x</a></root>");
    }

    #[test]
    fn test_text_escaping() {
        let xml = "<root a=\"x&amp;y\">Alice &amp; Co &lt;3 &gt;</root>";
        assert_eq!(
            c14n(xml),
            "<root a=\"x&amp;y\">Alice &amp; Co &lt;3 &gt;</root>"
        );
    }

    #[test]
    fn test_formatting_independent() {
        let compact = r#"<p:Document xmlns:p="urn:p" Ccy="EUR" Amt="10">v</p:Document>"#;
        let loose = "<p:Document   Amt='10'\n    Ccy=\"EUR\"   xmlns:p='urn:p' xmlns:q='urn:q' >v</p:Document >";
        assert_eq!(c14n(compact), c14n(loose));
    }

    #[test]
    fn test_default_namespace_undeclared_in_subtree_parent() {
        let xml = r#"<a xmlns="urn:a"><b xmlns=""><c/></b></a>"#;
        assert_eq!(
            c14n(xml),
            r#"<a xmlns="urn:a"><b xmlns=""><c></c></b></a>"#
        );
    }

    #[test]
    fn test_processing_instruction_in_content() {
        let xml = "<root><?app run?></root>";
        assert_eq!(c14n(xml), "<root><?app run?></root>");
    }
}
