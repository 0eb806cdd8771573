//! XML Token Types
//!
//! Owned token types for pull-style processing of mapping documents.
//! Tokens are owned so dialect readers can rewrite them in place and
//! so a token can be held across a peek.

use memchr::memchr;

/// XML stream token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlToken {
    /// Document start marker: <?xml version="1.0"?> or a synthesized equivalent
    StartDocument {
        version: String,
        encoding: Option<String>,
        standalone: Option<bool>,
    },
    /// Start of an element; empty elements are reported as start + end
    StartElement(StartElement),
    /// End of an element
    EndElement(EndElement),
    /// Text content, entities decoded
    Text(String),
    /// CDATA section content
    CData(String),
    /// Comment content
    Comment(String),
    /// Processing instruction
    ProcessingInstruction { target: String, data: String },
    /// DOCTYPE declaration content
    DocType(String),
    /// End of document
    EndDocument,
}

impl XmlToken {
    /// The document start marker a well-formed stream opens with
    pub fn start_document() -> Self {
        XmlToken::StartDocument {
            version: "1.0".to_string(),
            encoding: Some("UTF-8".to_string()),
            standalone: None,
        }
    }

    /// Check if this is a document start token
    pub fn is_start_document(&self) -> bool {
        matches!(self, XmlToken::StartDocument { .. })
    }

    /// Check if this is a start element token
    pub fn is_start_element(&self) -> bool {
        matches!(self, XmlToken::StartElement(_))
    }

    /// Check if this is an end element token
    pub fn is_end_element(&self) -> bool {
        matches!(self, XmlToken::EndElement(_))
    }

    /// Get as start element if applicable
    pub fn as_start_element(&self) -> Option<&StartElement> {
        match self {
            XmlToken::StartElement(e) => Some(e),
            _ => None,
        }
    }

    /// Get as mutable start element if applicable
    pub fn as_start_element_mut(&mut self) -> Option<&mut StartElement> {
        match self {
            XmlToken::StartElement(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if applicable
    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlToken::Text(t) | XmlToken::CData(t) => Some(t),
            _ => None,
        }
    }

    /// True for whitespace-only text
    pub fn is_whitespace(&self) -> bool {
        match self {
            XmlToken::Text(t) => t.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r')),
            _ => false,
        }
    }
}

/// An attribute on a start element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name (may include namespace prefix)
    pub name: String,
    /// Attribute value (entities decoded)
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Local name (after colon)
    pub fn local_name(&self) -> &str {
        split_name(&self.name).1
    }

    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&str> {
        split_name(&self.name).0
    }

    /// True for `xmlns` and `xmlns:*` declarations
    pub fn is_namespace_declaration(&self) -> bool {
        self.name == "xmlns" || self.prefix() == Some("xmlns")
    }
}

/// Start element token data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement {
    /// Full element name (may include prefix)
    pub name: String,
    /// Namespace URI (resolved), if any
    pub namespace: Option<String>,
    /// Element attributes, in document order
    pub attributes: Vec<Attribute>,
}

impl StartElement {
    pub fn new(name: impl Into<String>) -> Self {
        StartElement {
            name: name.into(),
            namespace: None,
            attributes: Vec::new(),
        }
    }

    /// Builder-style attribute append
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    /// Builder-style namespace assignment
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Local name (after colon)
    pub fn local_name(&self) -> &str {
        split_name(&self.name).1
    }

    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&str> {
        split_name(&self.name).0
    }

    /// Get an attribute by name
    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Get an attribute value by name
    pub fn get_attribute_value(&self, name: &str) -> Option<&str> {
        self.get_attribute(name).map(|a| a.value.as_str())
    }

    /// Remove an attribute by name, returning its value
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(pos).value)
    }

    /// Set an attribute, overwriting an existing value
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute::new(name, value)),
        }
    }

    /// Rename the element keeping its prefix
    pub fn rename_local(&mut self, local_name: &str) {
        self.name = match self.prefix() {
            Some(prefix) => format!("{}:{}", prefix, local_name),
            None => local_name.to_string(),
        };
    }
}

/// End element token data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndElement {
    /// Full element name
    pub name: String,
}

impl EndElement {
    pub fn new(name: impl Into<String>) -> Self {
        EndElement { name: name.into() }
    }

    /// Local name (after colon)
    pub fn local_name(&self) -> &str {
        split_name(&self.name).1
    }

    /// Rename the element keeping its prefix
    pub fn rename_local(&mut self, local_name: &str) {
        self.name = match split_name(&self.name).0 {
            Some(prefix) => format!("{}:{}", prefix, local_name),
            None => local_name.to_string(),
        };
    }
}

/// Split a name into prefix and local name at the colon
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    if let Some(pos) = memchr(b':', name.as_bytes()) {
        (Some(&name[..pos]), &name[pos + 1..])
    } else {
        (None, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_element() {
        let elem = StartElement::new("entity").with_attribute("class", "Order");
        assert_eq!(elem.local_name(), "entity");
        assert!(elem.prefix().is_none());
        assert_eq!(elem.get_attribute_value("class"), Some("Order"));
    }

    #[test]
    fn test_namespaced_element() {
        let mut elem = StartElement::new("orm:entity-mappings");
        assert_eq!(elem.local_name(), "entity-mappings");
        assert_eq!(elem.prefix(), Some("orm"));

        elem.rename_local("mappings");
        assert_eq!(elem.name, "orm:mappings");
    }

    #[test]
    fn test_set_and_remove_attribute() {
        let mut elem = StartElement::new("entity-mappings").with_attribute("version", "2.1");
        elem.set_attribute("version", "2.2");
        assert_eq!(elem.get_attribute_value("version"), Some("2.2"));
        assert_eq!(elem.attributes.len(), 1);

        assert_eq!(elem.remove_attribute("version"), Some("2.2".to_string()));
        assert!(elem.remove_attribute("version").is_none());
    }

    #[test]
    fn test_namespace_declaration() {
        assert!(Attribute::new("xmlns", "urn:x").is_namespace_declaration());
        assert!(Attribute::new("xmlns:xsi", "urn:x").is_namespace_declaration());
        assert!(!Attribute::new("xsi:schemaLocation", "urn:x").is_namespace_declaration());
    }

    #[test]
    fn test_whitespace_token() {
        assert!(XmlToken::Text(" \n\t".to_string()).is_whitespace());
        assert!(!XmlToken::Text(" a ".to_string()).is_whitespace());
        assert!(!XmlToken::Comment(" ".to_string()).is_whitespace());
    }
}
