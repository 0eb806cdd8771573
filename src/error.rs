//! Error Types
//!
//! Every failure raised by the binding pipeline or the override context.
//! Tolerated conditions (duplicate global metadata, duplicate listeners)
//! are logged and never surface here.

use crate::origin::Origin;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Which step of converter resolution failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterFailure {
    /// The class-loading collaborator could not find the class
    Locate,
    /// The class was found but no instance could be created
    Instantiate,
}

impl std::fmt::Display for ConverterFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConverterFailure::Locate => f.write_str("locate"),
            ConverterFailure::Instantiate => f.write_str("instantiate"),
        }
    }
}

/// Failures raised by the tree helpers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// A unique child was required but none exists
    #[error("expected one <{tag}> tag under {path}")]
    MissingChild { tag: String, path: String },

    /// A unique child was required but several exist
    #[error("expected only one <{tag}> tag under {path}")]
    NonUniqueChild { tag: String, path: String },

    /// A node id does not belong to the document it was used with
    #[error("node {0} does not belong to this document")]
    ForeignNode(u32),

    /// A mutation would break the tree structure
    #[error("invalid tree operation: {0}")]
    InvalidOperation(String),
}

/// Errors raised while binding documents or resolving overrides
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An orm.xml document declares a version this binder does not support
    #[error("unsupported orm.xml version {requested} in {origin}")]
    UnsupportedVersion { requested: String, origin: Origin },

    /// The token stream could not be turned into the target representation
    #[error("an error occurred transforming mapping document from {origin}: {message}")]
    Transform { origin: Origin, message: String },

    /// The hbm.xml token stream did not match the compiled schema
    #[error("unable to bind hbm.xml document from {origin}: {message}")]
    Unmarshal { origin: Origin, message: String },

    /// The hbm.xml binding context could not be built
    #[error("unable to build hbm.xml binding context: {0}")]
    Configuration(String),

    /// The same qualified class name was registered twice
    #[error("duplicate XML entry for {0}")]
    DuplicateClass(String),

    /// An attribute converter class could not be resolved
    #[error("unable to {kind} specified attribute converter implementation class: {class_name} ({reason})")]
    ConverterResolution {
        class_name: String,
        kind: ConverterFailure,
        reason: String,
    },

    /// An access type outside FIELD/PROPERTY
    #[error("invalid access type {value} at {context} (check your xml configuration)")]
    InvalidAccessType { value: String, context: String },

    /// A tree helper rejected its input
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// A tree could not be serialized
    #[error("unable to write mapping document: {0}")]
    Write(String),
}

impl Error {
    /// Build a transform failure tagged with its origin
    pub fn transform(origin: &Origin, message: impl Into<String>) -> Self {
        Error::Transform {
            origin: origin.clone(),
            message: message.into(),
        }
    }

    /// Build an unmarshal failure tagged with its origin
    pub fn unmarshal(origin: &Origin, message: impl Into<String>) -> Self {
        Error::Unmarshal {
            origin: origin.clone(),
            message: message.into(),
        }
    }

    /// True for the version mismatch condition callers map to a dedicated message
    pub fn is_unsupported_version(&self) -> bool {
        matches!(self, Error::UnsupportedVersion { .. })
    }
}
