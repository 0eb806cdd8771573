//! DOM Module - Arena-based Mapping Tree
//!
//! The generic tree representation entity-dialect documents bind to:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for names, attribute values and text
//! - Per-document identity for ownership checks
//! - Serialization back to bytes

pub mod document;
pub mod element;
pub mod node;
pub mod strings;
pub mod writer;

pub use document::{ChildIter, DescendantIter, Document, DocumentId};
pub use element::{Element, NodeRef};
pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
pub use strings::StringPool;
pub use writer::{to_bytes, write_document, WriteOptions};
