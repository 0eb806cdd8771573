//! Element Views
//!
//! `Element` is a cheap, copyable handle pairing a document with one of its
//! element nodes. Views are read-only; mutation goes through `Document`.

use std::fmt;

use super::document::{Document, DocumentId};
use super::node::NodeId;
use crate::reader::events::split_name;

/// Reference to a node that does not borrow its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    /// Identity of the owning document
    pub document: DocumentId,
    /// Arena id within that document
    pub node: NodeId,
}

/// Read-only view of an element node
#[derive(Clone, Copy)]
pub struct Element<'d> {
    doc: &'d Document,
    id: NodeId,
}

impl<'d> Element<'d> {
    pub(crate) fn new(doc: &'d Document, id: NodeId) -> Self {
        Element { doc, id }
    }

    /// Arena id of the element within its document
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Detach the view from the document borrow
    pub fn node_ref(&self) -> NodeRef {
        NodeRef {
            document: self.doc.id(),
            node: self.id,
        }
    }

    /// The owning document
    pub fn document(&self) -> &'d Document {
        self.doc
    }

    /// Qualified tag name
    pub fn name(&self) -> &'d str {
        self.doc.node_name(self.id).unwrap_or_default()
    }

    /// Tag name without prefix
    pub fn local_name(&self) -> &'d str {
        split_name(self.name()).1
    }

    /// Resolved namespace URI
    pub fn namespace(&self) -> Option<&'d str> {
        self.doc.namespace_uri(self.id)
    }

    /// Attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&'d str> {
        self.doc.get_attribute(self.id, name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Attribute (name, value) pairs in document order
    pub fn attributes(&self) -> Vec<(&'d str, &'d str)> {
        self.doc.get_attribute_values(self.id)
    }

    /// Element children in document order
    pub fn children(&self) -> impl Iterator<Item = Element<'d>> + 'd {
        let doc = self.doc;
        doc.children(self.id).filter_map(move |id| doc.element(id))
    }

    /// Parent element, `None` for the root element
    pub fn parent(&self) -> Option<Element<'d>> {
        let parent = self.doc.get_node(self.id)?.parent?;
        self.doc.element(parent)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text(&self) -> String {
        self.doc.deep_text(self.id)
    }
}

impl PartialEq for Element<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.doc.id() == other.doc.id() && self.id == other.id
    }
}

impl Eq for Element<'_> {}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.name())
            .field("id", &self.id)
            .finish()
    }
}
