//! Document Binder
//!
//! Sniffs the dialect of a mapping document from its root element and binds
//! it accordingly:
//! - `hibernate-mapping` roots are unmarshalled into the typed hbm model
//!   through a lazily compiled, per-binder binding context
//! - any other root is treated as orm.xml, version-checked and transformed
//!   into a generic `Document`

pub mod parallel;

use std::io::BufRead;

use once_cell::sync::OnceCell;

use crate::dom::Document;
use crate::error::{Error, Result};
use crate::hbm::{HbmBindingContext, HbmMapping};
use crate::origin::Origin;
use crate::reader::hbm::{HbmTokenReader, HBM_ROOT};
use crate::reader::normalize::fill_start;
use crate::reader::orm::{OrmTokenReader, DEFAULT_ORM_VERSIONS};
use crate::reader::stream::{TokenError, TokenReader, XmlTokenReader};

// ============================================================================
// Options
// ============================================================================

/// Binder configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderOptions {
    /// Reject hbm.xml content the compiled schema does not declare
    pub validate_xml: bool,
    /// Reject duplicate attributes and stray document-level text in orm.xml trees
    pub strict: bool,
    /// orm.xml versions accepted by the entity dialect reader
    pub supported_orm_versions: Vec<String>,
}

impl Default for BinderOptions {
    fn default() -> Self {
        BinderOptions {
            validate_xml: true,
            strict: false,
            supported_orm_versions: DEFAULT_ORM_VERSIONS.iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl BinderOptions {
    pub fn validate_xml(mut self, validate_xml: bool) -> Self {
        self.validate_xml = validate_xml;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn supported_orm_versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_orm_versions = versions.into_iter().map(Into::into).collect();
        self
    }
}

// ============================================================================
// Binding result
// ============================================================================

/// Dialect-specific bound representation
#[derive(Debug, Clone)]
pub enum BoundRoot {
    /// Typed hbm.xml model
    Hierarchical(HbmMapping),
    /// Generic tree of an orm.xml document
    Entity(Document),
}

impl BoundRoot {
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, BoundRoot::Hierarchical(_))
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, BoundRoot::Entity(_))
    }

    pub fn as_hierarchical(&self) -> Option<&HbmMapping> {
        match self {
            BoundRoot::Hierarchical(mapping) => Some(mapping),
            BoundRoot::Entity(_) => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Document> {
        match self {
            BoundRoot::Entity(document) => Some(document),
            BoundRoot::Hierarchical(_) => None,
        }
    }
}

/// A bound document together with where it came from
#[derive(Debug, Clone)]
pub struct Binding {
    root: BoundRoot,
    origin: Origin,
}

impl Binding {
    pub fn new(root: BoundRoot, origin: Origin) -> Self {
        Binding { root, origin }
    }

    pub fn root(&self) -> &BoundRoot {
        &self.root
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn into_root(self) -> BoundRoot {
        self.root
    }

    pub fn into_parts(self) -> (BoundRoot, Origin) {
        (self.root, self.origin)
    }
}

// ============================================================================
// Binder
// ============================================================================

/// Binds mapping documents of either dialect
///
/// Safe to share between threads. The hbm binding context is compiled on
/// first hbm use, exactly once per binder.
#[derive(Debug, Default)]
pub struct DocumentBinder {
    options: BinderOptions,
    hbm_context: OnceCell<HbmBindingContext>,
}

impl DocumentBinder {
    /// Create a binder with default options
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BinderOptions) -> Self {
        DocumentBinder {
            options,
            hbm_context: OnceCell::new(),
        }
    }

    pub fn options(&self) -> &BinderOptions {
        &self.options
    }

    /// Whether the hbm binding context has been compiled yet
    pub fn is_context_initialized(&self) -> bool {
        self.hbm_context.get().is_some()
    }

    /// The hbm binding context, compiled on first call
    pub fn hbm_context(&self) -> Result<&HbmBindingContext> {
        self.hbm_context.get_or_try_init(HbmBindingContext::compile)
    }

    /// Bind a token stream positioned before the root element
    pub fn bind<R: TokenReader>(&self, mut reader: R, origin: &Origin) -> Result<Binding> {
        let root_name = seek_root(&mut reader, origin)?;

        if root_name == HBM_ROOT {
            tracing::debug!(origin = %origin, "performing typed binding of hbm.xml document");
            let context = self.hbm_context()?;
            let mapping = context.unmarshal(HbmTokenReader::new(reader), origin, self.options.validate_xml)?;
            Ok(Binding::new(BoundRoot::Hierarchical(mapping), origin.clone()))
        } else {
            tracing::debug!(origin = %origin, root = %root_name, "transforming orm.xml document to tree");
            let reader = OrmTokenReader::with_versions(reader, self.options.supported_orm_versions.clone());
            let document = fill_start(reader)
                .and_then(|reader| Document::from_tokens(reader, self.options.strict))
                .map_err(|err| match err {
                    TokenError::BadVersion { requested } => Error::UnsupportedVersion {
                        requested,
                        origin: origin.clone(),
                    },
                    other => Error::transform(origin, other.to_string()),
                })?;
            Ok(Binding::new(BoundRoot::Entity(document), origin.clone()))
        }
    }

    /// Bind an in-memory document
    pub fn bind_bytes(&self, input: &[u8], origin: &Origin) -> Result<Binding> {
        self.bind(XmlTokenReader::from_bytes(input), origin)
    }

    /// Bind a document read from a buffered byte source
    pub fn bind_read<S: BufRead>(&self, source: S, origin: &Origin) -> Result<Binding> {
        self.bind(XmlTokenReader::new(source), origin)
    }
}

/// Skip prolog tokens and return the local name of the root element
///
/// The root start token itself stays in the reader.
fn seek_root<R: TokenReader>(reader: &mut R, origin: &Origin) -> Result<String> {
    loop {
        let root = match reader.peek_token().map_err(|e| Error::transform(origin, e.to_string()))? {
            Some(token) => token.as_start_element().map(|start| start.local_name().to_string()),
            None => return Err(Error::transform(origin, "document has no root element")),
        };
        if let Some(name) = root {
            return Ok(name);
        }
        reader
            .next_token()
            .map_err(|e| Error::transform(origin, e.to_string()))?;
    }
}
