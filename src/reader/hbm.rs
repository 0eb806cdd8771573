//! Hierarchical (hbm.xml) Dialect Reader
//!
//! Rewrites a legacy mapping token stream into the shape the compiled hbm
//! schema expects:
//! - DOCTYPE declarations of DTD-era documents are dropped
//! - the legacy and the empty namespace become the canonical hbm namespace
//! - a default namespace declaration is synthesized on the root when absent
//! - legacy element names are renamed to their current equivalents

use super::events::XmlToken;
use super::stream::{TokenError, TokenReader};

/// Root element local name of the hierarchical dialect
pub const HBM_ROOT: &str = "hibernate-mapping";

/// Canonical hbm.xml namespace
pub const HBM_NAMESPACE: &str = "http://www.hibernate.org/xsd/orm/hbm";

/// Namespace used by pre-XSD documents
pub const LEGACY_HBM_NAMESPACE: &str = "http://www.hibernate.org/xsd/hibernate-mapping";

/// Legacy element names and their replacements
const RENAMED_ELEMENTS: &[(&str, &str)] = &[
    ("composite-index", "composite-map-key"),
    ("index-many-to-many", "map-key-many-to-many"),
];

/// Token reader applying hbm.xml rewriting
pub struct HbmTokenReader<R: TokenReader> {
    inner: R,
    peeked: Option<XmlToken>,
    seen_root: bool,
}

impl<R: TokenReader> HbmTokenReader<R> {
    pub fn new(inner: R) -> Self {
        HbmTokenReader {
            inner,
            peeked: None,
            seen_root: false,
        }
    }

    fn read_next(&mut self) -> Result<Option<XmlToken>, TokenError> {
        loop {
            let Some(mut token) = self.inner.next_token()? else {
                return Ok(None);
            };
            match token {
                XmlToken::DocType(_) => continue,
                XmlToken::StartElement(ref mut start) => {
                    if start.namespace.is_none() || start.namespace.as_deref() == Some(LEGACY_HBM_NAMESPACE) {
                        start.namespace = Some(HBM_NAMESPACE.to_string());
                    }
                    for attr in start.attributes.iter_mut() {
                        if attr.is_namespace_declaration() && attr.value == LEGACY_HBM_NAMESPACE {
                            attr.value = HBM_NAMESPACE.to_string();
                        }
                    }
                    if !self.seen_root {
                        self.seen_root = true;
                        if start.prefix().is_none() && start.get_attribute("xmlns").is_none() {
                            start.set_attribute("xmlns", HBM_NAMESPACE);
                        }
                    }
                    if let Some(renamed) = renamed(start.local_name()) {
                        tracing::trace!(from = start.local_name(), to = renamed, "renaming legacy hbm element");
                        start.rename_local(renamed);
                    }
                }
                XmlToken::EndElement(ref mut end) => {
                    if let Some(renamed) = renamed(end.local_name()) {
                        end.rename_local(renamed);
                    }
                }
                _ => {}
            }
            return Ok(Some(token));
        }
    }
}

fn renamed(local_name: &str) -> Option<&'static str> {
    RENAMED_ELEMENTS
        .iter()
        .find(|(legacy, _)| *legacy == local_name)
        .map(|(_, current)| *current)
}

impl<R: TokenReader> TokenReader for HbmTokenReader<R> {
    fn next_token(&mut self) -> Result<Option<XmlToken>, TokenError> {
        match self.peeked.take() {
            Some(token) => Ok(Some(token)),
            None => self.read_next(),
        }
    }

    fn peek_token(&mut self) -> Result<Option<&XmlToken>, TokenError> {
        if self.peeked.is_none() {
            self.peeked = self.read_next()?;
        }
        Ok(self.peeked.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::stream::{read_all, XmlTokenReader};

    fn rewrite(xml: &str) -> Vec<XmlToken> {
        read_all(HbmTokenReader::new(XmlTokenReader::from_bytes(xml.as_bytes()))).unwrap()
    }

    #[test]
    fn test_doctype_dropped() {
        let tokens = rewrite(
            "<!DOCTYPE hibernate-mapping PUBLIC \"-//Hibernate/Hibernate Mapping DTD 3.0//EN\" \
             \"http://www.hibernate.org/dtd/hibernate-mapping-3.0.dtd\"><hibernate-mapping/>",
        );
        assert!(!tokens.iter().any(|t| matches!(t, XmlToken::DocType(_))));
        assert!(tokens[0].is_start_element());
    }

    #[test]
    fn test_namespace_synthesized_on_root() {
        let tokens = rewrite("<hibernate-mapping><class name=\"Order\"/></hibernate-mapping>");
        let root = tokens[0].as_start_element().unwrap();
        assert_eq!(root.get_attribute_value("xmlns"), Some(HBM_NAMESPACE));
        assert_eq!(root.namespace.as_deref(), Some(HBM_NAMESPACE));

        let class = tokens[1].as_start_element().unwrap();
        assert_eq!(class.namespace.as_deref(), Some(HBM_NAMESPACE));
        assert!(class.get_attribute("xmlns").is_none());
    }

    #[test]
    fn test_legacy_namespace_rewritten() {
        let tokens = rewrite(
            "<hibernate-mapping xmlns=\"http://www.hibernate.org/xsd/hibernate-mapping\"/>",
        );
        let root = tokens[0].as_start_element().unwrap();
        assert_eq!(root.get_attribute_value("xmlns"), Some(HBM_NAMESPACE));
        assert_eq!(root.namespace.as_deref(), Some(HBM_NAMESPACE));
    }

    #[test]
    fn test_legacy_elements_renamed() {
        let tokens = rewrite(
            "<hibernate-mapping><class name=\"A\"><map name=\"m\"><key column=\"a\"/>\
             <composite-index class=\"K\"/><element type=\"string\"/></map></class></hibernate-mapping>",
        );
        assert!(tokens
            .iter()
            .any(|t| matches!(t, XmlToken::StartElement(s) if s.name == "composite-map-key")));
        assert!(tokens
            .iter()
            .any(|t| matches!(t, XmlToken::EndElement(e) if e.name == "composite-map-key")));
        assert!(!tokens
            .iter()
            .any(|t| matches!(t, XmlToken::StartElement(s) if s.name == "composite-index")));
    }
}
