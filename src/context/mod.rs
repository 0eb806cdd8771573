//! Override Context
//!
//! Accumulates bound orm.xml trees over one build session and answers the
//! questions the metadata builder asks while walking annotated classes:
//! which defaults apply to a class, which XML element overrides it, and
//! which attribute converters were declared.
//!
//! Defaults are layered global < mapping unit < class. Class names are
//! qualified with the mapping unit's `<package>` before registration, so
//! `Order` under package `com.acme` and a bare `Order` elsewhere are two
//! different keys.
//!
//! The context is single-session state: it is `Send` when its class loader
//! is, but concurrent `add_document` calls need outside serialization.

pub mod converter;
pub mod defaults;

use std::collections::HashMap;
use std::fmt;

use memchr::memchr;
use tracing::debug;

use crate::dom::{Document, Element, NodeId};
use crate::error::{Error, Result, TreeError};
use crate::helper::{children_by_tag_name, element_path, optional_child, optional_child_content};

pub use converter::{
    resolve_converter, ClassLoader, ClassLoadingError, ClassRegistry, ConverterDescriptor, ConverterInstance,
    FactoryClass, LoadedClass,
};
pub use defaults::{AccessType, MappingDefault};

// ============================================================================
// Element names
// ============================================================================

const PERSISTENCE_UNIT_METADATA: &str = "persistence-unit-metadata";
const METADATA_COMPLETE_MARKER: &str = "xml-mapping-metadata-complete";
const PERSISTENCE_UNIT_DEFAULTS: &str = "persistence-unit-defaults";
const ENTITY_LISTENERS: &str = "entity-listeners";
const ENTITY_LISTENER: &str = "entity-listener";
const CONVERTER: &str = "converter";

/// Top-level mapped class kinds, in registration order
const CLASS_KINDS: [(&str, OverrideKind); 3] = [
    ("entity", OverrideKind::Entity),
    ("mapped-superclass", OverrideKind::MappedSuperclass),
    ("embeddable", OverrideKind::Embeddable),
];

/// Qualify `class_name` with `package` unless it already contains a dot
///
/// An absent or empty package leaves the name unchanged.
pub fn qualify_class_name(class_name: &str, package: Option<&str>) -> String {
    match package {
        Some(package) if !package.is_empty() && memchr(b'.', class_name.as_bytes()).is_none() => {
            format!("{}.{}", package, class_name)
        }
        _ => class_name.to_string(),
    }
}

/// What kind of element an override entry was registered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKind {
    Entity,
    MappedSuperclass,
    Embeddable,
    Listener,
}

#[derive(Debug, Clone, Copy)]
struct OverrideEntry {
    document: usize,
    node: NodeId,
    kind: OverrideKind,
}

// ============================================================================
// OverrideContext
// ============================================================================

/// Session state built from orm.xml trees
pub struct OverrideContext<L> {
    class_loader: L,
    global_defaults: Option<MappingDefault>,
    class_overrides: HashMap<String, OverrideEntry>,
    class_defaults: HashMap<String, MappingDefault>,
    documents: Vec<Document>,
    default_entity_listeners: Vec<String>,
    pending_converters: Vec<ConverterDescriptor>,
    has_context: bool,
}

impl<L: ClassLoader> OverrideContext<L> {
    /// Create an empty context resolving converters through `class_loader`
    pub fn new(class_loader: L) -> Self {
        OverrideContext {
            class_loader,
            global_defaults: None,
            class_overrides: HashMap::new(),
            class_defaults: HashMap::new(),
            documents: Vec::new(),
            default_entity_listeners: Vec::new(),
            pending_converters: Vec::new(),
            has_context: false,
        }
    }

    /// Register an orm.xml tree
    ///
    /// Returns the qualified class names registered by this call, listener
    /// classes included, in registration order. The document is kept by the
    /// context even when registration fails part way.
    pub fn add_document(&mut self, document: Document) -> Result<Vec<String>> {
        self.has_context = true;
        let index = self.documents.len();
        let result = self.register_document(&document, index);
        self.documents.push(document);
        result
    }

    fn register_document(&mut self, document: &Document, index: usize) -> Result<Vec<String>> {
        let root = document.root_element().ok_or_else(|| {
            Error::Tree(TreeError::InvalidOperation(
                "mapping document has no root element".to_string(),
            ))
        })?;
        let mut added = Vec::new();

        if let Some(metadata) = optional_child(root, PERSISTENCE_UNIT_METADATA) {
            if self.global_defaults.is_some() {
                debug!(
                    path = %element_path(metadata),
                    "duplicate persistence-unit-metadata, keeping the first one"
                );
            } else {
                let global = self.global_default_from(metadata, index, &mut added)?;
                self.global_defaults = Some(global);
            }
        }

        let unit_default = MappingDefault {
            package_name: trimmed_child(root, "package"),
            schema: trimmed_child(root, "schema"),
            catalog: trimmed_child(root, "catalog"),
            access: access_child(root)?,
            ..MappingDefault::default()
        };

        for (tag, kind) in CLASS_KINDS {
            for element in children_by_tag_name(root, Some(tag)) {
                self.register_class(element, kind, &unit_default, index, &mut added)?;
            }
        }

        for element in children_by_tag_name(root, Some(CONVERTER)) {
            let class_name = element.attribute("class").unwrap_or_default();
            let auto_apply = element
                .attribute("auto-apply")
                .is_some_and(|value| value.eq_ignore_ascii_case("true"));
            let descriptor = resolve_converter(&self.class_loader, class_name, auto_apply)?;
            debug!(converter = %class_name, auto_apply, "registered attribute converter");
            self.pending_converters.push(descriptor);
        }

        Ok(added)
    }

    fn global_default_from(
        &mut self,
        metadata: Element<'_>,
        index: usize,
        added: &mut Vec<String>,
    ) -> Result<MappingDefault> {
        let mut global = MappingDefault {
            metadata_complete: optional_child(metadata, METADATA_COMPLETE_MARKER).map(|_| true),
            ..MappingDefault::default()
        };

        if let Some(defaults) = optional_child(metadata, PERSISTENCE_UNIT_DEFAULTS) {
            global.schema = trimmed_child(defaults, "schema");
            global.catalog = trimmed_child(defaults, "catalog");
            global.access = access_child(defaults)?;
            global.cascade_persist = optional_child(defaults, "cascade-persist").map(|_| true);
            global.delimited_identifiers = optional_child(defaults, "delimited-identifiers").map(|_| true);

            let listeners = self.register_listeners(defaults, None, index, added)?;
            self.default_entity_listeners.extend(listeners);
        }

        Ok(global)
    }

    fn register_class(
        &mut self,
        element: Element<'_>,
        kind: OverrideKind,
        unit_default: &MappingDefault,
        index: usize,
        added: &mut Vec<String>,
    ) -> Result<()> {
        let package = unit_default.package_name.as_deref();
        let class_name = qualify_class_name(element.attribute("class").unwrap_or_default(), package);
        if self.class_overrides.contains_key(&class_name) {
            return Err(Error::DuplicateClass(class_name));
        }

        let mut local = unit_default.clone();
        if let Some(value) = element.attribute("metadata-complete").filter(|v| !v.is_empty()) {
            local.metadata_complete = Some(value.eq_ignore_ascii_case("true"));
        }
        let access_context = format!("{}/@access", element_path(element));
        if let Some(access) = AccessType::parse(element.attribute("access").unwrap_or_default(), &access_context)? {
            local.access = Some(access);
        }

        debug!(class = %class_name, "adding XML overriding information");
        self.class_overrides.insert(
            class_name.clone(),
            OverrideEntry {
                document: index,
                node: element.id(),
                kind,
            },
        );
        self.class_defaults.insert(class_name.clone(), local);
        added.push(class_name);

        self.register_listeners(element, package, index, added)?;
        Ok(())
    }

    /// Register the `<entity-listener>` children of `parent`'s `<entity-listeners>`
    ///
    /// A listener already registered as a listener is skipped; a listener
    /// whose name is taken by a mapped class is a duplicate.
    fn register_listeners(
        &mut self,
        parent: Element<'_>,
        package: Option<&str>,
        index: usize,
        added: &mut Vec<String>,
    ) -> Result<Vec<String>> {
        let mut registered = Vec::new();
        let Some(listeners) = optional_child(parent, ENTITY_LISTENERS) else {
            return Ok(registered);
        };

        for listener in children_by_tag_name(listeners, Some(ENTITY_LISTENER)) {
            let class_name = qualify_class_name(listener.attribute("class").unwrap_or_default(), package);
            match self.class_overrides.get(&class_name) {
                Some(existing) if existing.kind == OverrideKind::Listener => {
                    debug!(listener = %class_name, "entity listener already registered, ignoring");
                    continue;
                }
                Some(_) => return Err(Error::DuplicateClass(class_name)),
                None => {}
            }
            self.class_overrides.insert(
                class_name.clone(),
                OverrideEntry {
                    document: index,
                    node: listener.id(),
                    kind: OverrideKind::Listener,
                },
            );
            registered.push(class_name);
        }

        if !registered.is_empty() {
            debug!(listeners = ?registered, "adding XML overriding information for listeners");
        }
        added.extend(registered.iter().cloned());
        Ok(registered)
    }
}

impl<L> OverrideContext<L> {
    /// Effective defaults for `class_name`, or the global defaults alone
    ///
    /// Unregistered class names resolve to the global defaults.
    pub fn get_default(&self, class_name: Option<&str>) -> MappingDefault {
        let mut effective = MappingDefault::default();
        effective.override_with(self.global_defaults.as_ref());
        if let Some(class_name) = class_name {
            effective.override_with(self.class_defaults.get(class_name));
        }
        effective
    }

    /// The element registered under `class_name`, without merging
    pub fn get_override_element(&self, class_name: &str) -> Option<Element<'_>> {
        let entry = self.class_overrides.get(class_name)?;
        self.documents.get(entry.document)?.element(entry.node)
    }

    /// What kind of element `class_name` was registered from
    pub fn override_kind(&self, class_name: &str) -> Option<OverrideKind> {
        self.class_overrides.get(class_name).map(|entry| entry.kind)
    }

    /// Hand every pending converter to `consumer` once, then forget them
    pub fn drain_converters<F>(&mut self, mut consumer: F)
    where
        F: FnMut(ConverterDescriptor),
    {
        for descriptor in self.pending_converters.drain(..) {
            consumer(descriptor);
        }
    }

    /// Converters waiting to be drained
    pub fn pending_converter_count(&self) -> usize {
        self.pending_converters.len()
    }

    /// True once any document has been added
    pub fn has_any_document(&self) -> bool {
        self.has_context
    }

    /// Root elements of every added document, in insertion order
    pub fn all_documents(&self) -> Vec<Element<'_>> {
        self.documents.iter().filter_map(Document::root_element).collect()
    }

    /// Listener classes declared in `<persistence-unit-defaults>`, across all documents
    pub fn default_entity_listeners(&self) -> &[String] {
        &self.default_entity_listeners
    }

    pub fn class_loader(&self) -> &L {
        &self.class_loader
    }
}

impl<L> fmt::Debug for OverrideContext<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideContext")
            .field("global_defaults", &self.global_defaults)
            .field("classes", &self.class_overrides.len())
            .field("documents", &self.documents.len())
            .field("default_entity_listeners", &self.default_entity_listeners)
            .field("pending_converters", &self.pending_converters.len())
            .finish_non_exhaustive()
    }
}

fn trimmed_child(element: Element<'_>, tag: &str) -> Option<String> {
    optional_child_content(element, tag).filter(|text| !text.is_empty())
}

fn access_child(element: Element<'_>) -> Result<Option<AccessType>> {
    match optional_child(element, "access") {
        Some(access) => AccessType::parse(access.text().trim(), &element_path(access)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::ConverterFailure;

    fn parse(xml: &str) -> Document {
        Document::parse(xml.as_bytes()).unwrap()
    }

    fn context() -> OverrideContext<ClassRegistry> {
        let mut registry = ClassRegistry::new();
        registry.register_factory("com.acme.MoneyConverter", || Ok(Arc::new(0u32) as ConverterInstance));
        OverrideContext::new(registry)
    }

    const ORDERS: &str = r#"<entity-mappings>
        <persistence-unit-metadata>
            <persistence-unit-defaults>
                <access>PROPERTY</access>
                <cascade-persist/>
                <entity-listeners>
                    <entity-listener class="com.acme.AuditListener"/>
                </entity-listeners>
            </persistence-unit-defaults>
        </persistence-unit-metadata>
        <package> com.acme </package>
        <schema>SALES</schema>
        <converter class="com.acme.MoneyConverter" auto-apply="TRUE"/>
        <embeddable class="Address"/>
        <entity class="Order" access="FIELD">
            <entity-listeners>
                <entity-listener class="OrderListener"/>
            </entity-listeners>
        </entity>
        <mapped-superclass class="com.acme.base.Base" metadata-complete="true"/>
    </entity-mappings>"#;

    #[test]
    fn test_qualify_class_name() {
        assert_eq!(qualify_class_name("Order", Some("com.acme")), "com.acme.Order");
        assert_eq!(qualify_class_name("x.Order", Some("com.acme")), "x.Order");
        assert_eq!(qualify_class_name("Order", Some("")), "Order");
        assert_eq!(qualify_class_name("Order", None), "Order");
    }

    #[test]
    fn test_add_document_order() {
        let mut ctx = context();
        assert!(!ctx.has_any_document());

        let added = ctx.add_document(parse(ORDERS)).unwrap();
        assert_eq!(
            added,
            vec![
                "com.acme.AuditListener",
                "com.acme.Order",
                "com.acme.OrderListener",
                "com.acme.base.Base",
                "com.acme.Address",
            ]
        );
        assert!(ctx.has_any_document());
        assert_eq!(ctx.default_entity_listeners(), ["com.acme.AuditListener".to_string()]);
        assert_eq!(ctx.all_documents().len(), 1);
        assert_eq!(ctx.all_documents()[0].name(), "entity-mappings");
    }

    #[test]
    fn test_layered_defaults() {
        let mut ctx = context();
        ctx.add_document(parse(ORDERS)).unwrap();

        let global = ctx.get_default(None);
        assert_eq!(global.access, Some(AccessType::Property));
        assert_eq!(global.cascade_persist, Some(true));
        assert_eq!(global.delimited_identifiers, None);
        assert_eq!(global.package_name, None);

        let order = ctx.get_default(Some("com.acme.Order"));
        assert_eq!(order.access, Some(AccessType::Field));
        assert_eq!(order.package_name.as_deref(), Some("com.acme"));
        assert_eq!(order.schema.as_deref(), Some("SALES"));
        assert_eq!(order.cascade_persist, Some(true));
        assert!(order.can_use_annotations());

        let base = ctx.get_default(Some("com.acme.base.Base"));
        assert_eq!(base.access, Some(AccessType::Property));
        assert!(!base.can_use_annotations());

        assert_eq!(ctx.get_default(Some("com.acme.Unknown")), global);
    }

    #[test]
    fn test_override_element() {
        let mut ctx = context();
        ctx.add_document(parse(ORDERS)).unwrap();

        let order = ctx.get_override_element("com.acme.Order").unwrap();
        assert_eq!(order.name(), "entity");
        assert_eq!(order.attribute("class"), Some("Order"));
        assert_eq!(ctx.override_kind("com.acme.Order"), Some(OverrideKind::Entity));
        assert_eq!(ctx.override_kind("com.acme.OrderListener"), Some(OverrideKind::Listener));
        assert!(ctx.get_override_element("Order").is_none());
    }

    #[test]
    fn test_duplicate_class_across_documents() {
        let mut ctx = context();
        ctx.add_document(parse(r#"<entity-mappings><entity class="com.x.Foo"/></entity-mappings>"#))
            .unwrap();
        let err = ctx
            .add_document(parse(r#"<entity-mappings><package>com.x</package><entity class="Foo"/></entity-mappings>"#))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateClass(ref name) if name == "com.x.Foo"));
        assert_eq!(ctx.all_documents().len(), 2);
    }

    #[test]
    fn test_duplicate_class_stops_registration() {
        let mut ctx = context();
        let err = ctx
            .add_document(parse(
                r#"<entity-mappings><entity class="A"/><entity class="A"/><entity class="B"/></entity-mappings>"#,
            ))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateClass(ref name) if name == "A"));
        assert!(ctx.get_override_element("A").is_some());
        assert!(ctx.get_override_element("B").is_none());
        assert!(ctx.override_kind("B").is_none());
    }

    #[test]
    fn test_duplicate_listener_tolerated() {
        let doc = r#"<entity-mappings>
            <entity class="com.x.A">
                <entity-listeners><entity-listener class="com.x.L"/></entity-listeners>
            </entity>
        </entity-mappings>"#;
        let other = r#"<entity-mappings>
            <entity class="com.x.B">
                <entity-listeners><entity-listener class="com.x.L"/></entity-listeners>
            </entity>
        </entity-mappings>"#;

        let mut ctx = context();
        assert_eq!(ctx.add_document(parse(doc)).unwrap(), vec!["com.x.A", "com.x.L"]);
        assert_eq!(ctx.add_document(parse(other)).unwrap(), vec!["com.x.B"]);
    }

    #[test]
    fn test_listener_clashing_with_class() {
        let doc = r#"<entity-mappings>
            <entity class="com.x.A">
                <entity-listeners><entity-listener class="com.x.A"/></entity-listeners>
            </entity>
        </entity-mappings>"#;
        let err = context().add_document(parse(doc)).unwrap_err();
        assert!(matches!(err, Error::DuplicateClass(ref name) if name == "com.x.A"));
    }

    #[test]
    fn test_global_metadata_first_wins() {
        let mut ctx = context();
        ctx.add_document(parse(
            r#"<entity-mappings><persistence-unit-metadata>
                <xml-mapping-metadata-complete/>
                <persistence-unit-defaults><schema>FIRST</schema></persistence-unit-defaults>
            </persistence-unit-metadata></entity-mappings>"#,
        ))
        .unwrap();
        ctx.add_document(parse(
            r#"<entity-mappings><persistence-unit-metadata>
                <persistence-unit-defaults><schema>SECOND</schema></persistence-unit-defaults>
            </persistence-unit-metadata></entity-mappings>"#,
        ))
        .unwrap();

        let global = ctx.get_default(None);
        assert_eq!(global.schema.as_deref(), Some("FIRST"));
        assert_eq!(global.metadata_complete, Some(true));
        assert!(!global.can_use_annotations());
    }

    #[test]
    fn test_empty_package_is_absent() {
        let mut ctx = context();
        let added = ctx
            .add_document(parse(r#"<entity-mappings><package>  </package><entity class="Order"/></entity-mappings>"#))
            .unwrap();
        assert_eq!(added, vec!["Order"]);
        assert_eq!(ctx.get_default(Some("Order")).package_name, None);
    }

    #[test]
    fn test_invalid_access() {
        let err = context()
            .add_document(parse(r#"<entity-mappings><access>field</access></entity-mappings>"#))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidAccessType { ref value, ref context }
                if value == "field" && context == "/#document/entity-mappings/access"
        ));

        let err = context()
            .add_document(parse(r#"<entity-mappings><entity class="A" access="BOTH"/></entity-mappings>"#))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAccessType { ref value, .. } if value == "BOTH"));
    }

    #[test]
    fn test_drain_converters_once() {
        let mut ctx = context();
        ctx.add_document(parse(ORDERS)).unwrap();
        assert_eq!(ctx.pending_converter_count(), 1);

        let mut drained = Vec::new();
        ctx.drain_converters(|c| drained.push(c));
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].class_name(), "com.acme.MoneyConverter");
        assert!(drained[0].auto_apply());

        let mut again = 0;
        ctx.drain_converters(|_| again += 1);
        assert_eq!(again, 0);
    }

    #[test]
    fn test_unknown_converter() {
        let err = context()
            .add_document(parse(r#"<entity-mappings><converter class="com.acme.Nope"/></entity-mappings>"#))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ConverterResolution { ref class_name, kind: ConverterFailure::Locate, .. }
                if class_name == "com.acme.Nope"
        ));
    }

    #[test]
    fn test_document_without_root() {
        let mut ctx = context();
        assert!(matches!(ctx.add_document(Document::new()), Err(Error::Tree(_))));
        assert!(ctx.has_any_document());
        assert!(ctx.all_documents().is_empty());
    }
}
