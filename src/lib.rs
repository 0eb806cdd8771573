//! ormxml - Binding and override resolution for O/R mapping documents
//!
//! Pipeline:
//! 1. Token layer (reader): pull tokens from bytes, normalize the
//!    document start, rewrite dialect namespaces and versions
//! 2. Binder: dispatch on the root element, unmarshal hbm.xml into the
//!    typed model, transform orm.xml into an arena tree
//! 3. Override context: accumulate orm.xml trees and resolve layered
//!    defaults, override elements and attribute converters
//!
//! Synthetic documents built in memory go back through the same binder via
//! the producer.

pub mod binder;
pub mod context;
pub mod dom;
pub mod error;
pub mod hbm;
pub mod helper;
pub mod origin;
pub mod producer;
pub mod reader;

// ============================================================================
// Re-exports
// ============================================================================

pub use binder::{BinderOptions, Binding, BoundRoot, DocumentBinder};
pub use context::{
    qualify_class_name, AccessType, ClassLoader, ClassRegistry, ConverterDescriptor, MappingDefault,
    OverrideContext, OverrideKind,
};
pub use dom::{Document, Element, WriteOptions};
pub use error::{Error, Result, TreeError};
pub use hbm::HbmMapping;
pub use origin::{Origin, SourceType};
pub use producer::{MappingCollector, SyntheticMappingProducer};
