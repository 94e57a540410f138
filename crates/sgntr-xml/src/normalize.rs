#![forbid(unsafe_code)]

//! Whitespace normalization for incoming XML text.
//!
//! Pretty-printed and compact renditions of the same envelope must sign
//! to the same digests. Exclusive C14N keeps every text node, so the
//! indentation between elements is removed before anything is digested.

use sgntr_core::{ns, Error};

/// Remove whitespace-only text that sits between elements.
///
/// A text node is dropped when its source is nothing but XML whitespace
/// and it shares its parent with at least one element. Text that is the
/// only content of an element (`<Nm> </Nm>`) is kept, as is anything
/// under `xml:space="preserve"`. All other bytes are returned unchanged.
pub fn strip_indentation(text: &str) -> Result<String, Error> {
    let doc = roxmltree::Document::parse_with_options(text, crate::parsing_options())
        .map_err(|e| Error::XmlParse(e.to_string()))?;

    let mut cuts: Vec<std::ops::Range<usize>> = doc
        .descendants()
        .filter(|n| n.is_text())
        .filter(|n| is_indentation(text, *n))
        .map(|n| n.range())
        .collect();
    if cuts.is_empty() {
        return Ok(text.to_owned());
    }
    cuts.sort_by_key(|r| r.start);

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for cut in cuts {
        out.push_str(&text[pos..cut.start]);
        pos = cut.end;
    }
    out.push_str(&text[pos..]);
    tracing::trace!(before = text.len(), after = out.len(), "indentation stripped");
    Ok(out)
}

fn is_indentation(text: &str, node: roxmltree::Node<'_, '_>) -> bool {
    let Some(parent) = node.parent_element() else {
        return false;
    };
    let source = match text.get(node.range()) {
        Some(s) => s,
        None => return false,
    };
    if !source.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n')) {
        return false;
    }
    if !parent.children().any(|c| c.is_element()) {
        return false;
    }
    !preserves_space(parent)
}

/// Nearest `xml:space` in scope, `preserve` wins.
fn preserves_space(element: roxmltree::Node<'_, '_>) -> bool {
    element
        .ancestors()
        .filter(|n| n.is_element())
        .find_map(|n| n.attribute((ns::XML, "space")))
        .is_some_and(|v| v == "preserve")
}
