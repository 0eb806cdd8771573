//! Tree Utilities
//!
//! Stateless helpers over the mapping tree. Lookups take element views and
//! never mutate; the mutation helpers (`add_child`, `set_attribute`,
//! `clone_with_new_name`, `ensure_owner`) work on a `Document` the caller owns.
//!
//! Tag names match a child's qualified name or its local name, and only
//! direct children are considered. This is deliberately narrower than a
//! `getElementsByTagName`-style descendant search: a `<package>` nested
//! inside some deeper element never answers a lookup on the mapping root,
//! and `unique_child` does not fail because a grandchild shares the tag.

use std::io::{BufRead, Write};

use crate::dom::{self, Document, Element, NodeId, NodeRef, WriteOptions};
use crate::error::{Error, Result, TreeError};
use crate::origin::Origin;
use crate::reader::normalize::fill_start;
use crate::reader::stream::XmlTokenReader;

// ============================================================================
// Lookup
// ============================================================================

fn tag_matches(element: &Element<'_>, tag: &str) -> bool {
    element.name() == tag || element.local_name() == tag
}

/// All element children, in document order
pub fn children<'d>(element: Element<'d>) -> Vec<Element<'d>> {
    element.children().collect()
}

/// Element children with the given tag, or all element children when `tag` is `None`
pub fn children_by_tag_name<'d>(element: Element<'d>, tag: Option<&str>) -> Vec<Element<'d>> {
    match tag {
        Some(tag) => element.children().filter(|child| tag_matches(child, tag)).collect(),
        None => children(element),
    }
}

/// The single child with the given tag
///
/// Fails when there is no such child or more than one.
pub fn unique_child<'d>(element: Element<'d>, tag: &str) -> std::result::Result<Element<'d>, TreeError> {
    let mut matches = element.children().filter(|child| tag_matches(child, tag));
    match (matches.next(), matches.next()) {
        (Some(child), None) => Ok(child),
        (Some(_), Some(_)) => Err(TreeError::NonUniqueChild {
            tag: tag.to_string(),
            path: element_path(element),
        }),
        (None, _) => Err(TreeError::MissingChild {
            tag: tag.to_string(),
            path: element_path(element),
        }),
    }
}

/// The first child with the given tag, if any
pub fn optional_child<'d>(element: Element<'d>, tag: &str) -> Option<Element<'d>> {
    element.children().find(|child| tag_matches(child, tag))
}

/// Trimmed text content; `None` when there is no element
pub fn element_content(element: Option<Element<'_>>) -> Option<String> {
    element.map(|e| e.text().trim().to_string())
}

/// Trimmed text content, or `default` when there is no element
pub fn element_content_or(element: Option<Element<'_>>, default: &str) -> String {
    element_content(element).unwrap_or_else(|| default.to_string())
}

/// Trimmed text of the single child with the given tag
pub fn unique_child_content(element: Element<'_>, tag: &str) -> std::result::Result<String, TreeError> {
    unique_child(element, tag).map(|child| child.text().trim().to_string())
}

/// Trimmed text of the first child with the given tag
pub fn optional_child_content(element: Element<'_>, tag: &str) -> Option<String> {
    element_content(optional_child(element, tag))
}

/// True when the child exists and reads "true" or "yes", ignoring case
pub fn optional_child_boolean_content(element: Element<'_>, tag: &str) -> bool {
    optional_child_content(element, tag)
        .map(|value| value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

/// Slash-separated path from the document node down to `element`
pub fn element_path(element: Element<'_>) -> String {
    let mut names = vec![element.name()];
    let mut current = element;
    while let Some(parent) = current.parent() {
        names.push(parent.name());
        current = parent;
    }

    let mut path = String::from("/#document");
    for name in names.iter().rev() {
        path.push('/');
        path.push_str(name);
    }
    path
}

// ============================================================================
// Mutation
// ============================================================================

/// Create an element and append it to `parent`
pub fn add_child(doc: &mut Document, parent: NodeId, tag: &str) -> std::result::Result<NodeId, TreeError> {
    let child = doc.create_element(tag);
    doc.append_child(parent, child)?;
    Ok(child)
}

/// Set or overwrite an attribute
pub fn set_attribute(doc: &mut Document, element: NodeId, name: &str, value: &str) -> std::result::Result<(), TreeError> {
    doc.set_attribute(element, name, value)
}

/// Deep copy of `original` under a new tag name; attributes and children are kept
///
/// The copy belongs to the same document and is detached.
pub fn clone_with_new_name(doc: &mut Document, original: NodeId, new_name: &str) -> std::result::Result<NodeId, TreeError> {
    if doc.element(original).is_none() {
        return Err(TreeError::InvalidOperation(format!("node {} is not an element", original)));
    }
    let copy = doc.clone_subtree(original)?;
    doc.rename(copy, new_name)?;
    Ok(copy)
}

/// Make sure `original` is usable inside `doc`
///
/// A node already owned by `doc` is returned as is. A node of `source` is
/// deep-copied into `doc`. Any other node is rejected.
pub fn ensure_owner(doc: &mut Document, original: NodeRef, source: Option<&Document>) -> std::result::Result<NodeId, TreeError> {
    if original.document == doc.id() {
        return match doc.get_node(original.node) {
            Some(_) => Ok(original.node),
            None => Err(TreeError::ForeignNode(original.node)),
        };
    }
    match source {
        Some(source) if source.id() == original.document => doc.import_node(source, original.node),
        _ => Err(TreeError::ForeignNode(original.node)),
    }
}

// ============================================================================
// Documents
// ============================================================================

/// A document with no root element
pub fn new_empty_document() -> Document {
    Document::new()
}

/// Parse a tree from a byte source
pub fn read_from<R: BufRead>(source: R, origin: &Origin) -> Result<Document> {
    let reader = fill_start(XmlTokenReader::new(source)).map_err(|e| Error::transform(origin, e.to_string()))?;
    Document::from_tokens(reader, false).map_err(|e| Error::transform(origin, e.to_string()))
}

/// Serialize a tree with the XML declaration; `indent` spaces per level, 0 for none
pub fn write_to<W: Write>(doc: &Document, out: W, indent: usize) -> Result<()> {
    dom::write_document(doc, out, &WriteOptions::with_indent(indent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DOCUMENT_NODE;
    use crate::origin::SourceType;

    const MAPPINGS: &[u8] = b"<entity-mappings>\
        <package> com.acme </package>\
        <entity class=\"Order\"/>\
        <entity class=\"Item\"/>\
        <persistence-unit-metadata><xml-mapping-metadata-complete/></persistence-unit-metadata>\
        <flag>Yes</flag>\
        </entity-mappings>";

    fn parse(xml: &[u8]) -> Document {
        Document::parse(xml).unwrap()
    }

    #[test]
    fn test_children_by_tag_name() {
        let doc = parse(MAPPINGS);
        let root = doc.root_element().unwrap();
        let entities = children_by_tag_name(root, Some("entity"));
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].attribute("class"), Some("Order"));
        assert_eq!(entities[1].attribute("class"), Some("Item"));
        assert_eq!(children_by_tag_name(root, None).len(), 5);
        assert_eq!(children(root).len(), 5);
    }

    #[test]
    fn test_only_direct_children_match() {
        let doc = parse(MAPPINGS);
        let root = doc.root_element().unwrap();
        assert!(optional_child(root, "xml-mapping-metadata-complete").is_none());
    }

    #[test]
    fn test_grandchild_with_same_tag_is_ignored() {
        let doc = parse(
            b"<entity-mappings><package>com.acme</package>\
             <embeddable class=\"Money\"><package>ignored</package></embeddable></entity-mappings>",
        );
        let root = doc.root_element().unwrap();
        assert_eq!(unique_child_content(root, "package").unwrap(), "com.acme");
        assert_eq!(children_by_tag_name(root, Some("package")).len(), 1);
    }

    #[test]
    fn test_unique_child() {
        let doc = parse(MAPPINGS);
        let root = doc.root_element().unwrap();
        assert_eq!(unique_child(root, "package").unwrap().name(), "package");
        assert!(matches!(
            unique_child(root, "entity"),
            Err(TreeError::NonUniqueChild { ref tag, .. }) if tag == "entity"
        ));
        let missing = unique_child(root, "schema").unwrap_err();
        assert_eq!(
            missing,
            TreeError::MissingChild {
                tag: "schema".to_string(),
                path: "/#document/entity-mappings".to_string()
            }
        );
    }

    #[test]
    fn test_content_helpers() {
        let doc = parse(MAPPINGS);
        let root = doc.root_element().unwrap();
        assert_eq!(optional_child_content(root, "package"), Some("com.acme".to_string()));
        assert_eq!(unique_child_content(root, "package").unwrap(), "com.acme");
        assert_eq!(optional_child_content(root, "schema"), None);
        assert_eq!(element_content_or(None, "fallback"), "fallback");
        assert!(optional_child_boolean_content(root, "flag"));
        assert!(!optional_child_boolean_content(root, "package"));
        assert!(!optional_child_boolean_content(root, "schema"));
    }

    #[test]
    fn test_element_path() {
        let doc = parse(MAPPINGS);
        let root = doc.root_element().unwrap();
        let metadata = optional_child(root, "persistence-unit-metadata").unwrap();
        let marker = unique_child(metadata, "xml-mapping-metadata-complete").unwrap();
        assert_eq!(
            element_path(marker),
            "/#document/entity-mappings/persistence-unit-metadata/xml-mapping-metadata-complete"
        );
    }

    #[test]
    fn test_add_child_and_attribute() {
        let mut doc = new_empty_document();
        let root = add_child(&mut doc, DOCUMENT_NODE, "hibernate-mapping").unwrap();
        let class = add_child(&mut doc, root, "class").unwrap();
        set_attribute(&mut doc, class, "name", "Order").unwrap();
        set_attribute(&mut doc, class, "name", "Invoice").unwrap();

        let view = doc.element(class).unwrap();
        assert_eq!(view.attributes(), vec![("name", "Invoice")]);
        assert_eq!(view.parent().unwrap().name(), "hibernate-mapping");
    }

    #[test]
    fn test_clone_with_new_name() {
        let mut doc = parse(b"<r><many-to-one name=\"customer\" class=\"Customer\"><column name=\"c\"/></many-to-one></r>");
        let original = doc.root_element().unwrap().children().next().unwrap().id();
        let copy = clone_with_new_name(&mut doc, original, "key-many-to-one").unwrap();
        let root = doc.root_element_id().unwrap();
        doc.append_child(root, copy).unwrap();

        let view = doc.element(copy).unwrap();
        assert_eq!(view.name(), "key-many-to-one");
        assert_eq!(view.attributes(), vec![("name", "customer"), ("class", "Customer")]);
        assert_eq!(view.children().next().unwrap().attribute("name"), Some("c"));
        // original untouched
        assert_eq!(doc.element(original).unwrap().name(), "many-to-one");
    }

    #[test]
    fn test_ensure_owner() {
        let source = parse(b"<entity class=\"A\"/>");
        let mut target = parse(b"<entity-mappings/>");
        let foreign = source.root_element().unwrap().node_ref();
        let local = target.root_element().unwrap().node_ref();

        assert_eq!(ensure_owner(&mut target, local, None).unwrap(), local.node);
        assert!(matches!(ensure_owner(&mut target, foreign, None), Err(TreeError::ForeignNode(_))));

        let imported = ensure_owner(&mut target, foreign, Some(&source)).unwrap();
        assert_ne!(imported, foreign.node);
        assert_eq!(target.get_attribute(imported, "class"), Some("A"));
    }

    #[test]
    fn test_read_and_write() {
        let origin = Origin::new(SourceType::Other, "test");
        let doc = read_from(&b"<a><b>x</b></a>"[..], &origin).unwrap();
        let mut out = Vec::new();
        write_to(&doc, &mut out, 0).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><a><b>x</b></a>"
        );

        let err = read_from(&b"<a><b></a>"[..], &origin).unwrap_err();
        assert!(matches!(err, Error::Transform { .. }));
    }
}
