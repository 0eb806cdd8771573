//! Synthetic Mapping Producer
//!
//! Some mappings are generated at build time as trees rather than read from
//! files. They are serialized and fed back through the normal binder so
//! that generated documents get exactly the same binding and diagnostics
//! as hand-written ones.

use tracing::trace;

use crate::binder::{BoundRoot, DocumentBinder};
use crate::dom::{to_bytes, Document, WriteOptions};
use crate::error::{Error, Result};
use crate::hbm::HbmMapping;
use crate::origin::{Origin, SourceType};

/// Origin name given to every generated document
pub const GENERATED_ORIGIN: &str = "generated";

/// Receives generated mapping trees
pub trait MappingCollector {
    fn add_document(&mut self, document: Document) -> Result<()>;
}

/// Collects generated hbm.xml trees as bound typed mappings
#[derive(Debug)]
pub struct SyntheticMappingProducer<'b> {
    binder: &'b DocumentBinder,
    origin: Origin,
    mappings: Vec<HbmMapping>,
}

impl<'b> SyntheticMappingProducer<'b> {
    pub fn new(binder: &'b DocumentBinder) -> Self {
        SyntheticMappingProducer {
            binder,
            origin: Origin::new(SourceType::Other, GENERATED_ORIGIN),
            mappings: Vec::new(),
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Mappings bound so far, in the order they were added
    pub fn mappings(&self) -> &[HbmMapping] {
        &self.mappings
    }

    pub fn into_mappings(self) -> Vec<HbmMapping> {
        self.mappings
    }

    /// Serialize, rebind and keep one generated document
    pub fn produce(&mut self, document: &Document) -> Result<&HbmMapping> {
        let bytes = to_bytes(document, &WriteOptions::with_indent(1))?;

        if tracing::enabled!(tracing::Level::TRACE) {
            trace!(
                origin = %self.origin,
                "generated entity mapping:\n{}",
                String::from_utf8_lossy(&bytes)
            );
        }

        let binding = self.binder.bind_bytes(&bytes, &self.origin)?;
        match binding.into_root() {
            BoundRoot::Hierarchical(mapping) => {
                self.mappings.push(mapping);
                let index = self.mappings.len() - 1;
                Ok(&self.mappings[index])
            }
            BoundRoot::Entity(_) => Err(Error::transform(
                &self.origin,
                "generated document is not a hibernate-mapping document",
            )),
        }
    }
}

impl MappingCollector for SyntheticMappingProducer<'_> {
    fn add_document(&mut self, document: Document) -> Result<()> {
        self.produce(&document).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::{add_child, new_empty_document, set_attribute};

    fn audit_mapping() -> Document {
        let mut doc = new_empty_document();
        let root = doc.create_element("hibernate-mapping");
        doc.append_child(crate::dom::DOCUMENT_NODE, root).unwrap();
        set_attribute(&mut doc, root, "auto-import", "false").unwrap();

        let class = add_child(&mut doc, root, "class").unwrap();
        set_attribute(&mut doc, class, "entity-name", "Order_AUD").unwrap();
        set_attribute(&mut doc, class, "table", "ORDER_AUD").unwrap();

        let id = add_child(&mut doc, class, "id").unwrap();
        set_attribute(&mut doc, id, "name", "rev").unwrap();
        set_attribute(&mut doc, id, "type", "integer").unwrap();

        let property = add_child(&mut doc, class, "property").unwrap();
        set_attribute(&mut doc, property, "name", "total").unwrap();
        doc
    }

    #[test]
    fn test_produce_rebinds_generated_tree() {
        let binder = DocumentBinder::new();
        let mut producer = SyntheticMappingProducer::new(&binder);

        let mapping = producer.produce(&audit_mapping()).unwrap();
        assert!(!mapping.auto_import);
        assert_eq!(mapping.classes.len(), 1);
        assert_eq!(mapping.classes[0].entity_name.as_deref(), Some("Order_AUD"));

        assert_eq!(producer.origin().name(), "generated");
        assert_eq!(producer.origin().source_type(), SourceType::Other);
        assert_eq!(producer.into_mappings().len(), 1);
    }

    #[test]
    fn test_collector_rejects_orm_document() {
        let binder = DocumentBinder::new();
        let mut producer = SyntheticMappingProducer::new(&binder);

        let doc = Document::parse(b"<entity-mappings><entity class=\"A\"/></entity-mappings>").unwrap();
        let err = producer.add_document(doc).unwrap_err();
        assert!(matches!(err, Error::Transform { ref origin, .. } if origin.name() == "generated"));
        assert!(producer.mappings().is_empty());
    }
}
