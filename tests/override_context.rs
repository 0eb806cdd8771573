use std::sync::Arc;

use ormxml::context::ConverterInstance;
use ormxml::{
    AccessType, BoundRoot, ClassRegistry, Document, DocumentBinder, Error, MappingDefault, Origin,
    OverrideContext, SourceType,
};
use pretty_assertions::assert_eq;

fn bind_tree(binder: &DocumentBinder, xml: &str) -> Document {
    let binding = binder
        .bind_bytes(xml.as_bytes(), &Origin::new(SourceType::File, "orm.xml"))
        .unwrap();
    match binding.into_root() {
        BoundRoot::Entity(doc) => doc,
        BoundRoot::Hierarchical(_) => panic!("expected an orm.xml tree"),
    }
}

const DOCUMENT_A: &str = r#"<entity-mappings version="2.2">
    <persistence-unit-metadata>
        <persistence-unit-defaults>
            <access>PROPERTY</access>
        </persistence-unit-defaults>
    </persistence-unit-metadata>
    <package>com.acme</package>
    <entity class="Order"/>
</entity-mappings>"#;

const DOCUMENT_B: &str = r#"<entity-mappings version="2.2">
    <entity class="Order"/>
</entity-mappings>"#;

#[test]
fn test_same_simple_name_under_different_packages() {
    let binder = DocumentBinder::new();
    let mut ctx = OverrideContext::new(ClassRegistry::new());

    assert_eq!(ctx.add_document(bind_tree(&binder, DOCUMENT_A)).unwrap(), vec!["com.acme.Order"]);
    assert_eq!(
        ctx.get_default(Some("com.acme.Order")),
        MappingDefault {
            access: Some(AccessType::Property),
            package_name: Some("com.acme".to_string()),
            ..MappingDefault::default()
        }
    );

    assert_eq!(ctx.add_document(bind_tree(&binder, DOCUMENT_B)).unwrap(), vec!["Order"]);
    assert_eq!(ctx.get_default(Some("Order")).package_name, None);
    assert_eq!(ctx.get_default(Some("Order")).access, Some(AccessType::Property));
    assert_eq!(ctx.all_documents().len(), 2);
}

#[test]
fn test_duplicate_primary_class() {
    let binder = DocumentBinder::new();
    let mut ctx = OverrideContext::new(ClassRegistry::new());
    ctx.add_document(bind_tree(&binder, DOCUMENT_A)).unwrap();

    let err = ctx.add_document(bind_tree(&binder, DOCUMENT_A)).unwrap_err();
    assert_eq!(err.to_string(), "duplicate XML entry for com.acme.Order");
}

#[test]
fn test_unregistered_class_gets_global_defaults() {
    let binder = DocumentBinder::new();
    let mut ctx = OverrideContext::new(ClassRegistry::new());
    ctx.add_document(bind_tree(&binder, DOCUMENT_A)).unwrap();
    assert_eq!(ctx.get_default(Some("com.other.Thing")), ctx.get_default(None));
}

#[test]
fn test_converters_drained_once_per_session() {
    let mut registry = ClassRegistry::new();
    registry.register_factory("com.acme.YesNo", || Ok(Arc::new("yes-no") as ConverterInstance));
    let binder = DocumentBinder::new();
    let mut ctx = OverrideContext::new(registry);

    ctx.add_document(bind_tree(
        &binder,
        r#"<entity-mappings><converter class="com.acme.YesNo" auto-apply="true"/></entity-mappings>"#,
    ))
    .unwrap();

    let mut names = Vec::new();
    ctx.drain_converters(|c| names.push((c.class_name().to_string(), c.auto_apply())));
    ctx.drain_converters(|c| names.push((c.class_name().to_string(), c.auto_apply())));
    assert_eq!(names, vec![("com.acme.YesNo".to_string(), true)]);

    ctx.add_document(bind_tree(
        &binder,
        r#"<entity-mappings><converter class="com.acme.YesNo"/></entity-mappings>"#,
    ))
    .unwrap();
    let mut count = 0;
    ctx.drain_converters(|c| {
        assert!(!c.auto_apply());
        count += 1;
    });
    assert_eq!(count, 1);
}

#[test]
fn test_converter_instantiation_failure() {
    let mut registry = ClassRegistry::new();
    registry.register_factory("com.acme.Abstract", || Err("abstract class".to_string()));
    let binder = DocumentBinder::new();
    let mut ctx = OverrideContext::new(registry);

    let err = ctx
        .add_document(bind_tree(
            &binder,
            r#"<entity-mappings><converter class="com.acme.Abstract"/></entity-mappings>"#,
        ))
        .unwrap_err();
    assert!(matches!(err, Error::ConverterResolution { ref class_name, .. } if class_name == "com.acme.Abstract"));
}

#[test]
fn test_listeners_shared_between_documents() {
    let binder = DocumentBinder::new();
    let mut ctx = OverrideContext::new(ClassRegistry::new());
    let listener = |entity: &str| {
        format!(
            r#"<entity-mappings><package>com.x</package><entity class="{entity}">
                <entity-listeners><entity-listener class="Audit"/></entity-listeners>
            </entity></entity-mappings>"#
        )
    };

    assert_eq!(
        ctx.add_document(bind_tree(&binder, &listener("A"))).unwrap(),
        vec!["com.x.A", "com.x.Audit"]
    );
    assert_eq!(ctx.add_document(bind_tree(&binder, &listener("B"))).unwrap(), vec!["com.x.B"]);
    let audit = ctx.get_override_element("com.x.Audit").unwrap();
    assert_eq!(audit.local_name(), "entity-listener");
}
