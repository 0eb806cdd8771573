//! Entity (orm.xml) Dialect Reader
//!
//! Validates and strips the `version` marker of the root element, then
//! maps every supported orm namespace onto the canonical one so a single
//! consumer handles all versions alike.

use super::events::XmlToken;
use super::stream::{TokenError, TokenReader};

/// Canonical orm.xml namespace
pub const ORM_NAMESPACE: &str = "http://www.hibernate.org/xsd/orm/mapping";

/// Namespaces of the standard orm.xml schema generations
pub const JPA_NAMESPACES: &[&str] = &[
    "http://java.sun.com/xml/ns/persistence/orm",
    "http://xmlns.jcp.org/xml/ns/persistence/orm",
];

/// Newest orm.xml version understood
pub const CURRENT_ORM_VERSION: &str = "2.2";

/// Versions accepted when no explicit set is configured
pub const DEFAULT_ORM_VERSIONS: &[&str] = &["1.0", "2.0", "2.1", CURRENT_ORM_VERSION];

/// Token reader applying orm.xml version checks and namespace rewriting
pub struct OrmTokenReader<R: TokenReader> {
    inner: R,
    supported_versions: Vec<String>,
    peeked: Option<XmlToken>,
    seen_root: bool,
}

impl<R: TokenReader> OrmTokenReader<R> {
    /// Create a reader accepting the default version set
    pub fn new(inner: R) -> Self {
        Self::with_versions(inner, DEFAULT_ORM_VERSIONS.iter().map(|v| v.to_string()).collect())
    }

    /// Create a reader accepting the given version set
    pub fn with_versions(inner: R, supported_versions: Vec<String>) -> Self {
        OrmTokenReader {
            inner,
            supported_versions,
            peeked: None,
            seen_root: false,
        }
    }

    fn read_next(&mut self) -> Result<Option<XmlToken>, TokenError> {
        let Some(mut token) = self.inner.next_token()? else {
            return Ok(None);
        };

        if let XmlToken::StartElement(ref mut start) = token {
            if !self.seen_root {
                self.seen_root = true;
                if let Some(version) = start.remove_attribute("version") {
                    if !self.supported_versions.iter().any(|v| *v == version) {
                        return Err(TokenError::BadVersion { requested: version });
                    }
                }
                start
                    .attributes
                    .retain(|attr| attr.local_name() != "schemaLocation" || attr.prefix().is_none());
                if start.prefix().is_none() && start.get_attribute("xmlns").is_none() {
                    start.set_attribute("xmlns", ORM_NAMESPACE);
                }
            }

            if start.namespace.as_deref().map_or(true, is_jpa_namespace) {
                start.namespace = Some(ORM_NAMESPACE.to_string());
            }
            for attr in start.attributes.iter_mut() {
                if attr.is_namespace_declaration() && is_jpa_namespace(&attr.value) {
                    attr.value = ORM_NAMESPACE.to_string();
                }
            }
        }

        Ok(Some(token))
    }
}

fn is_jpa_namespace(uri: &str) -> bool {
    JPA_NAMESPACES.contains(&uri)
}

impl<R: TokenReader> TokenReader for OrmTokenReader<R> {
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
