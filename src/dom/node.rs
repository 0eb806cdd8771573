//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// The document node always occupies slot 0
pub const DOCUMENT_NODE: NodeId = 0;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for the document node and detached nodes)
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// Index into string pool for name (elements, PI targets) or content (text, comments)
    pub name_id: u32,
    /// Index into string pool for PI data, or 0
    pub data_id: u32,
    /// Index into string pool for the resolved namespace URI, or 0
    pub ns_id: u32,
    /// Element attributes in document order; names are unique
    pub attributes: Vec<XmlAttribute>,
}

impl XmlNode {
    fn with_kind(kind: NodeKind, name_id: u32) -> Self {
        XmlNode {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id,
            data_id: 0,
            ns_id: 0,
            attributes: Vec::new(),
        }
    }

    /// Create a new document root node
    pub fn document() -> Self {
        Self::with_kind(NodeKind::Document, 0)
    }

    /// Create a new element node
    pub fn element(name_id: u32) -> Self {
        Self::with_kind(NodeKind::Element, name_id)
    }

    /// Create a new text node; content is stored in `name_id`
    pub fn text(content_id: u32) -> Self {
        Self::with_kind(NodeKind::Text, content_id)
    }

    /// Create a new CDATA node
    pub fn cdata(content_id: u32) -> Self {
        Self::with_kind(NodeKind::CData, content_id)
    }

    /// Create a new comment node
    pub fn comment(content_id: u32) -> Self {
        Self::with_kind(NodeKind::Comment, content_id)
    }

    /// Create a processing instruction node
    pub fn processing_instruction(target_id: u32, data_id: u32) -> Self {
        let mut node = Self::with_kind(NodeKind::ProcessingInstruction, target_id);
        node.data_id = data_id;
        node
    }

    /// Copy of this node with every tree link cleared
    pub fn detached(&self) -> Self {
        XmlNode {
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            ..self.clone()
        }
    }

    /// Check if this is an element node
    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Check if this node carries character data
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }

    /// Check if this node has children
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

/// Stored attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Index into string pool for attribute name
    pub name_id: u32,
    /// Index into string pool for attribute value
    pub value_id: u32,
}

impl XmlAttribute {
    pub fn new(name_id: u32, value_id: u32) -> Self {
        XmlAttribute { name_id, value_id }
    }
}
