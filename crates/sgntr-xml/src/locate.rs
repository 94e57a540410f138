#![forbid(unsafe_code)]

//! Element lookup by local name.
//!
//! Envelope nodes are found regardless of namespace: the same `Sgntr` or
//! `Document` tag appears under different message-type namespaces.

use sgntr_core::Error;

/// First descendant element whose local name is `local_name`, or `None`.
pub fn find_optional<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    doc.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == local_name)
}

/// First descendant element whose local name is `local_name`.
///
/// Fails with [`Error::Structure`] when there is none.
pub fn find_required<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    local_name: &str,
) -> Result<roxmltree::Node<'a, 'input>, Error> {
    find_optional(doc, local_name)
        .ok_or_else(|| Error::Structure(format!("required element <{local_name}> not found")))
}

/// First child element of `parent` with the given namespace and local name.
pub fn find_child_element<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    parent.children().find(|n| {
        n.is_element()
            && n.tag_name().name() == local_name
            && n.tag_name().namespace().unwrap_or("") == ns
    })
}

/// All child elements of `parent` with the given namespace and local name.
pub fn find_child_elements<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Vec<roxmltree::Node<'a, 'input>> {
    parent
        .children()
        .filter(|n| {
            n.is_element()
                && n.tag_name().name() == local_name
                && n.tag_name().namespace().unwrap_or("") == ns
        })
        .collect()
}

/// Like [`find_child_element`], failing with [`Error::MissingElement`].
pub fn required_child_element<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Result<roxmltree::Node<'a, 'input>, Error> {
    find_child_element(parent, ns, local_name).ok_or_else(|| {
        Error::MissingElement(format!(
            "{local_name} in {}",
            parent.tag_name().name()
        ))
    })
}
