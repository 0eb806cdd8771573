//! Generic Mapping Tree
//!
//! Arena-based document tree built from a token stream:
//! - All nodes stored in a single Vec, addressed by `NodeId`
//! - Names, attribute values and text interned in a `StringPool`
//! - Each document carries a process-unique id used for ownership checks
//!
//! The tree is mutable so document producers can assemble mappings
//! programmatically: create elements, set attributes, import nodes from
//! other documents.

use std::sync::atomic::{AtomicU64, Ordering};

use super::element::Element;
use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
use super::strings::StringPool;
use crate::error::TreeError;
use crate::reader::events::{split_name, Attribute, XmlToken};
use crate::reader::normalize::fill_start;
use crate::reader::stream::{TokenError, TokenReader, XmlTokenReader};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique document identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Mutable arena document
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    nodes: Vec<XmlNode>,
    strings: StringPool,
    root_element: Option<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Document {
    /// A clone is a distinct document: it receives a fresh identity
    fn clone(&self) -> Self {
        Document {
            id: DocumentId::next(),
            nodes: self.nodes.clone(),
            strings: self.strings.clone(),
            root_element: self.root_element,
        }
    }
}

impl Document {
    /// Create an empty document holding only the document node
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(XmlNode::document());
        Document {
            id: DocumentId::next(),
            nodes,
            strings: StringPool::new(),
            root_element: None,
        }
    }

    /// Identity of this document
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Parse XML bytes, synthesizing the document start when the input has no declaration
    pub fn parse(input: &[u8]) -> Result<Self, TokenError> {
        Self::from_tokens(fill_start(XmlTokenReader::from_bytes(input))?, false)
    }

    /// Parse XML bytes in strict mode
    pub fn parse_strict(input: &[u8]) -> Result<Self, TokenError> {
        Self::from_tokens(fill_start(XmlTokenReader::from_bytes(input))?, true)
    }

    /// Build a tree from a token stream
    ///
    /// The stream must open with a document start token. Strict mode also
    /// rejects duplicate attributes and character data at document level;
    /// otherwise the last duplicate attribute wins and stray text is dropped.
    pub fn from_tokens<R: TokenReader>(mut reader: R, strict: bool) -> Result<Self, TokenError> {
        match reader.next_token()? {
            Some(XmlToken::StartDocument { .. }) => {}
            Some(other) => {
                return Err(TokenError::Syntax(format!(
                    "token stream must open with a document start, found {}",
                    describe(&other)
                )))
            }
            None => return Err(TokenError::Syntax("empty token stream".to_string())),
        }

        let mut doc = Document::new();
        let mut stack: Vec<NodeId> = vec![DOCUMENT_NODE];

        while let Some(token) = reader.next_token()? {
            let parent = stack.last().copied().unwrap_or(DOCUMENT_NODE);
            let at_document_level = stack.len() == 1;

            match token {
                XmlToken::StartDocument { .. } => {
                    return Err(TokenError::Syntax("document start inside a document".to_string()));
                }

                XmlToken::StartElement(start) => {
                    if at_document_level && doc.root_element.is_some() {
                        return Err(TokenError::Syntax("document has multiple root elements".to_string()));
                    }
                    if strict {
                        if let Some(dup) = find_duplicate_attribute(&start.attributes) {
                            return Err(TokenError::Syntax(format!("duplicate attribute: {}", dup)));
                        }
                    }

                    let name_id = doc.strings.intern(&start.name);
                    let mut node = XmlNode::element(name_id);
                    if let Some(ns) = start.namespace.as_deref() {
                        node.ns_id = doc.strings.intern(ns);
                    }
                    let id = doc.push_node(node);
                    for attr in &start.attributes {
                        doc.put_attribute(id, &attr.name, &attr.value);
                    }
                    doc.link_child(parent, id);
                    if at_document_level {
                        doc.root_element = Some(id);
                    }
                    stack.push(id);
                }

                XmlToken::EndElement(end) => {
                    if at_document_level {
                        return Err(TokenError::Syntax(format!(
                            "unexpected end tag </{}> without matching start tag",
                            end.name
                        )));
                    }
                    let open = doc.node_name(parent).unwrap_or_default();
                    if open != end.name {
                        return Err(TokenError::Syntax(format!(
                            "tag mismatch: <{}> closed with </{}>",
                            open, end.name
                        )));
                    }
                    stack.pop();
                }

                XmlToken::Text(text) => {
                    if at_document_level {
                        if strict && !is_whitespace(&text) {
                            return Err(TokenError::Syntax(
                                "text content not allowed at document level".to_string(),
                            ));
                        }
                        continue;
                    }
                    let content_id = doc.strings.intern(&text);
                    doc.append_new(parent, XmlNode::text(content_id));
                }

                XmlToken::CData(text) => {
                    if at_document_level {
                        if strict {
                            return Err(TokenError::Syntax(
                                "CDATA section not allowed at document level".to_string(),
                            ));
                        }
                        continue;
                    }
                    let content_id = doc.strings.intern(&text);
                    doc.append_new(parent, XmlNode::cdata(content_id));
                }

                XmlToken::Comment(text) => {
                    let content_id = doc.strings.intern(&text);
                    doc.append_new(parent, XmlNode::comment(content_id));
                }

                XmlToken::ProcessingInstruction { target, data } => {
                    let target_id = doc.strings.intern(&target);
                    let data_id = doc.strings.intern(&data);
                    doc.append_new(parent, XmlNode::processing_instruction(target_id, data_id));
                }

                XmlToken::DocType(_) => {}

                XmlToken::EndDocument => break,
            }
        }

        if stack.len() > 1 {
            let open = stack
                .last()
                .and_then(|&id| doc.node_name(id))
                .unwrap_or_default();
            return Err(TokenError::Syntax(format!("unclosed element <{}>", open)));
        }
        if doc.root_element.is_none() {
            return Err(TokenError::Syntax("document has no root element".to_string()));
        }

        Ok(doc)
    }

    // ========================================================================
    // Arena plumbing
    // ========================================================================

    fn push_node(&mut self, node: XmlNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    fn append_new(&mut self, parent: NodeId, node: XmlNode) -> NodeId {
        let id = self.push_node(node);
        self.link_child(parent, id);
        id
    }

    /// Link a detached node as the last child of parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child_opt = self.nodes[parent_id as usize].last_child;

        if let Some(last_child_id) = last_child_opt {
            self.nodes[child_id as usize].prev_sibling = Some(last_child_id);
            self.nodes[last_child_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
        self.nodes[child_id as usize].parent = Some(parent_id);
    }

    /// Unlink a node from its parent and siblings
    fn unlink(&mut self, id: NodeId) {
        let node = &self.nodes[id as usize];
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);

        if let Some(prev) = prev {
            self.nodes[prev as usize].next_sibling = next;
        } else if let Some(parent) = parent {
            self.nodes[parent as usize].first_child = next;
        }
        if let Some(next) = next {
            self.nodes[next as usize].prev_sibling = prev;
        } else if let Some(parent) = parent {
            self.nodes[parent as usize].last_child = prev;
        }

        let node = &mut self.nodes[id as usize];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;

        if self.root_element == Some(id) {
            self.root_element = None;
        }
    }

    /// Insert or overwrite an attribute without kind checks
    fn put_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let name_id = self.strings.intern(name);
        let value_id = self.strings.intern(value);
        let attributes = &mut self.nodes[id as usize].attributes;
        match attributes.iter_mut().find(|a| a.name_id == name_id) {
            Some(attr) => attr.value_id = value_id,
            None => attributes.push(XmlAttribute::new(name_id, value_id)),
        }
    }

    fn check(&self, id: NodeId) -> Result<&XmlNode, TreeError> {
        self.nodes.get(id as usize).ok_or(TreeError::ForeignNode(id))
    }

    fn check_element(&self, id: NodeId) -> Result<&XmlNode, TreeError> {
        let node = self.check(id)?;
        if node.is_element() {
            Ok(node)
        } else {
            Err(TreeError::InvalidOperation(format!("node {} is not an element", id)))
        }
    }

    #[inline]
    fn resolve(&self, string_id: u32) -> &str {
        self.strings.get(string_id).unwrap_or_default()
    }

    // ========================================================================
    // Read access
    // ========================================================================

    /// Get the document node (index 0)
    pub fn document_node(&self) -> &XmlNode {
        &self.nodes[DOCUMENT_NODE as usize]
    }

    /// Get root element ID
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    /// Get the root element as a view
    pub fn root_element(&self) -> Option<Element<'_>> {
        self.root_element.map(|id| Element::new(self, id))
    }

    /// View a node as an element, if it is one
    pub fn element(&self, id: NodeId) -> Option<Element<'_>> {
        self.get_node(id)
            .filter(|n| n.is_element())
            .map(|_| Element::new(self, id))
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    /// Get node name (elements and processing instruction targets)
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => self.strings.get(node.name_id),
            _ => None,
        }
    }

    /// Get node local name (without prefix)
    pub fn node_local_name(&self, id: NodeId) -> Option<&str> {
        self.node_name(id).map(|name| split_name(name).1)
    }

    /// Resolved namespace URI of an element, if any
    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        if node.is_element() && node.ns_id != 0 {
            self.strings.get(node.ns_id)
        } else {
            None
        }
    }

    /// Get content of a text, CDATA or comment node
    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Text | NodeKind::CData | NodeKind::Comment => self.strings.get(node.name_id),
            _ => None,
        }
    }

    /// Get data of a processing instruction node
    pub fn pi_data(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::ProcessingInstruction => self.strings.get(node.data_id),
            _ => None,
        }
    }

    /// Concatenated character data of every descendant text node
    pub fn deep_text(&self, id: NodeId) -> String {
        let mut result = String::new();
        for node_id in self.descendants(id) {
            if let Some(node) = self.get_node(node_id) {
                if node.is_text() {
                    result.push_str(self.resolve(node.name_id));
                }
            }
        }
        result
    }

    /// Get attributes for an element
    pub fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        self.get_node(id)
            .map(|n| n.attributes.as_slice())
            .unwrap_or_default()
    }

    /// Get attribute value by name
    pub fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.attributes(node_id)
            .iter()
            .find(|attr| self.resolve(attr.name_id) == name)
            .map(|attr| self.resolve(attr.value_id))
    }

    /// Get all attribute names and values, in document order
    pub fn get_attribute_values(&self, node_id: NodeId) -> Vec<(&str, &str)> {
        self.attributes(node_id)
            .iter()
            .map(|attr| (self.resolve(attr.name_id), self.resolve(attr.value_id)))
            .collect()
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_child);
        ChildIter { doc: self, next: first }
    }

    /// Iterate over all descendants of a node (depth-first, document order)
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        if let Some(node) = self.get_node(id) {
            let mut child_id = node.last_child;
            while let Some(cid) = child_id {
                stack.push(cid);
                child_id = self.get_node(cid).and_then(|n| n.prev_sibling);
            }
        }
        DescendantIter { doc: self, stack }
    }

    /// Get total number of nodes, detached ones included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the string pool
    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    /// Check whether `ancestor` is `id` or one of its ancestors
    fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(cid) = current {
            if cid == ancestor {
                return true;
            }
            current = self.get_node(cid).and_then(|n| n.parent);
        }
        false
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Create a detached element owned by this document
    pub fn create_element(&mut self, name: &str) -> NodeId {
        let name_id = self.strings.intern(name);
        self.push_node(XmlNode::element(name_id))
    }

    /// Create a detached text node owned by this document
    pub fn create_text(&mut self, content: &str) -> NodeId {
        let content_id = self.strings.intern(content);
        self.push_node(XmlNode::text(content_id))
    }

    /// Append `child` as the last child of `parent`, moving it if already attached
    ///
    /// Appending an element to the document node makes it the root element;
    /// a document holds at most one.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let parent_kind = self.check(parent)?.kind;
        let child_kind = self.check(child)?.kind;

        match (parent_kind, child_kind) {
            (_, NodeKind::Document) => {
                return Err(TreeError::InvalidOperation("the document node cannot be a child".to_string()))
            }
            (NodeKind::Element, _) => {}
            (NodeKind::Document, NodeKind::Element) => {
                if self.root_element.is_some_and(|root| root != child) {
                    return Err(TreeError::InvalidOperation(
                        "document already has a root element".to_string(),
                    ));
                }
            }
            (NodeKind::Document, NodeKind::Comment | NodeKind::ProcessingInstruction) => {}
            _ => {
                return Err(TreeError::InvalidOperation(format!(
                    "cannot append {:?} node to {:?} node",
                    child_kind, parent_kind
                )))
            }
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::InvalidOperation(
                "cannot append a node to itself or its descendant".to_string(),
            ));
        }

        self.unlink(child);
        self.link_child(parent, child);
        if parent == DOCUMENT_NODE && child_kind == NodeKind::Element {
            self.root_element = Some(child);
        }
        Ok(())
    }

    /// Set or overwrite an attribute on an element
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        self.check_element(id)?;
        self.put_attribute(id, name, value);
        Ok(())
    }

    /// Remove an attribute, returning its former value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>, TreeError> {
        self.check_element(id)?;
        let Some(pos) = self
            .attributes(id)
            .iter()
            .position(|attr| self.resolve(attr.name_id) == name)
        else {
            return Ok(None);
        };
        let removed = self.nodes[id as usize].attributes.remove(pos);
        Ok(Some(self.resolve(removed.value_id).to_string()))
    }

    /// Rename an element
    pub fn rename(&mut self, id: NodeId, name: &str) -> Result<(), TreeError> {
        self.check_element(id)?;
        let name_id = self.strings.intern(name);
        self.nodes[id as usize].name_id = name_id;
        Ok(())
    }

    /// Deep-copy a subtree of this document; the copy is detached
    pub fn clone_subtree(&mut self, id: NodeId) -> Result<NodeId, TreeError> {
        self.check(id)?;
        Ok(self.copy_within(id))
    }

    fn copy_within(&mut self, id: NodeId) -> NodeId {
        let copy = self.push_node(self.nodes[id as usize].detached());
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            let child_copy = self.copy_within(child);
            self.link_child(copy, child_copy);
        }
        copy
    }

    /// Deep-copy a node of another document into this one; the copy is detached
    pub fn import_node(&mut self, source: &Document, id: NodeId) -> Result<NodeId, TreeError> {
        let node = source.check(id)?;
        if node.kind == NodeKind::Document {
            return Err(TreeError::InvalidOperation("the document node cannot be imported".to_string()));
        }
        Ok(self.import_within(source, id))
    }

    fn import_within(&mut self, source: &Document, id: NodeId) -> NodeId {
        let original = &source.nodes[id as usize];
        let mut node = original.detached();
        node.name_id = self.strings.intern(source.resolve(original.name_id));
        node.data_id = self.strings.intern(source.resolve(original.data_id));
        node.ns_id = self.strings.intern(source.resolve(original.ns_id));
        node.attributes = original
            .attributes
            .iter()
            .map(|attr| {
                XmlAttribute::new(
                    self.strings.intern(source.resolve(attr.name_id)),
                    self.strings.intern(source.resolve(attr.value_id)),
                )
            })
            .collect();

        let copy = self.push_node(node);
        for child in source.children(id) {
            let child_copy = self.import_within(source, child);
            self.link_child(copy, child_copy);
        }
        copy
    }
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl<'d> Iterator for ChildIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.get_node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first)
pub struct DescendantIter<'d> {
    doc: &'d Document,
    stack: Vec<NodeId>,
}

impl<'d> Iterator for DescendantIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;

        // Children pushed in reverse so the first child is visited first
        if let Some(node) = self.doc.get_node(current) {
            let mut child_id = node.last_child;
            while let Some(id) = child_id {
                self.stack.push(id);
                child_id = self.doc.get_node(id).and_then(|n| n.prev_sibling);
            }
        }

        Some(current)
    }
}

fn find_duplicate_attribute(attrs: &[Attribute]) -> Option<&str> {
    attrs
        .iter()
        .enumerate()
        .find(|(i, attr)| attrs[i + 1..].iter().any(|other| other.name == attr.name))
        .map(|(_, attr)| attr.name.as_str())
}

fn is_whitespace(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
}

fn describe(token: &XmlToken) -> String {
    match token {
        XmlToken::StartElement(start) => format!("<{}>", start.name),
        XmlToken::EndElement(end) => format!("</{}>", end.name),
        XmlToken::Text(_) | XmlToken::CData(_) => "character data".to_string(),
        XmlToken::Comment(_) => "a comment".to_string(),
        XmlToken::ProcessingInstruction { target, .. } => format!("<?{}?>", target),
        XmlToken::DocType(_) => "a DOCTYPE".to_string(),
        XmlToken::StartDocument { .. } => "a document start".to_string(),
        XmlToken::EndDocument => "the end of the document".to_string(),
    }
}
