//! hbm.xml Binding Context
//!
//! The typed binding context is compiled from a static schema table:
//! - element declarations with their permitted children
//! - attribute declarations with kinds, defaults and required flags
//! - which elements carry character data
//!
//! Compilation resolves every child reference and checks every default
//! against its attribute kind. The compiled context then drives a
//! single-pass unmarshaller over an hbm token stream.

use std::collections::HashMap;

use super::model::HbmMapping;
use crate::error::{Error, Result};
use crate::origin::Origin;
use crate::reader::events::{StartElement, XmlToken};
use crate::reader::hbm::{HBM_NAMESPACE, HBM_ROOT};
use crate::reader::stream::TokenReader;

// ============================================================================
// Schema declarations
// ============================================================================

/// Lexical kind of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Text,
    /// xs:boolean: true, false, 1, 0
    Boolean,
    /// Unsigned count or size
    Integer,
}

impl AttrKind {
    fn accepts(self, value: &str) -> bool {
        match self {
            AttrKind::Text => true,
            AttrKind::Boolean => matches!(value.trim(), "true" | "false" | "1" | "0"),
            AttrKind::Integer => value.trim().parse::<u32>().is_ok(),
        }
    }
}

/// Attribute declaration
#[derive(Debug, Clone, Copy)]
pub struct AttributeDecl {
    pub name: &'static str,
    pub kind: AttrKind,
    pub default: Option<&'static str>,
    pub required: bool,
}

/// Element declaration
#[derive(Debug, Clone, Copy)]
pub struct ElementDecl {
    pub name: &'static str,
    pub attributes: &'static [AttributeDecl],
    pub children: &'static [&'static str],
    /// Whether character data is content rather than formatting
    pub text: bool,
}

const fn attr(name: &'static str) -> AttributeDecl {
    AttributeDecl {
        name,
        kind: AttrKind::Text,
        default: None,
        required: false,
    }
}

const fn required(name: &'static str) -> AttributeDecl {
    AttributeDecl {
        name,
        kind: AttrKind::Text,
        default: None,
        required: true,
    }
}

const fn defaulted(name: &'static str, default: &'static str) -> AttributeDecl {
    AttributeDecl {
        name,
        kind: AttrKind::Text,
        default: Some(default),
        required: false,
    }
}

const fn flag(name: &'static str, default: Option<&'static str>) -> AttributeDecl {
    AttributeDecl {
        name,
        kind: AttrKind::Boolean,
        default,
        required: false,
    }
}

const fn number(name: &'static str) -> AttributeDecl {
    AttributeDecl {
        name,
        kind: AttrKind::Integer,
        default: None,
        required: false,
    }
}

const fn count(name: &'static str, default: &'static str) -> AttributeDecl {
    AttributeDecl {
        name,
        kind: AttrKind::Integer,
        default: Some(default),
        required: false,
    }
}

const fn element(
    name: &'static str,
    attributes: &'static [AttributeDecl],
    children: &'static [&'static str],
) -> ElementDecl {
    ElementDecl {
        name,
        attributes,
        children,
        text: false,
    }
}

const fn text_element(
    name: &'static str,
    attributes: &'static [AttributeDecl],
    children: &'static [&'static str],
) -> ElementDecl {
    ElementDecl {
        name,
        attributes,
        children,
        text: true,
    }
}

/// Mapped attributes of classes, subclasses and joins
const ATTRIBUTE_ELEMENTS: &[&str] = &[
    "property",
    "many-to-one",
    "one-to-one",
    "component",
    "dynamic-component",
    "properties",
    "any",
    "map",
    "set",
    "list",
    "bag",
    "idbag",
    "array",
    "primitive-array",
];

/// Members of `<component>` and `<dynamic-component>`
const COMPONENT_CHILDREN: &[&str] = &[
    "meta",
    "tuplizer",
    "parent",
    "property",
    "many-to-one",
    "one-to-one",
    "component",
    "dynamic-component",
    "any",
    "map",
    "set",
    "list",
    "bag",
    "array",
    "primitive-array",
];

const CLASS_CHILDREN: &[&str] = &[
    "meta",
    "subselect",
    "cache",
    "synchronize",
    "comment",
    "tuplizer",
    "id",
    "composite-id",
    "discriminator",
    "natural-id",
    "version",
    "timestamp",
    "property",
    "many-to-one",
    "one-to-one",
    "component",
    "dynamic-component",
    "properties",
    "any",
    "map",
    "set",
    "list",
    "bag",
    "idbag",
    "array",
    "primitive-array",
    "join",
    "subclass",
    "joined-subclass",
    "union-subclass",
    "loader",
    "sql-insert",
    "sql-update",
    "sql-delete",
    "filter",
    "fetch-profile",
    "resultset",
    "query",
    "sql-query",
];

const SUBCLASS_ATTRIBUTES: &[AttributeDecl] = &[
    attr("name"),
    attr("entity-name"),
    attr("proxy"),
    attr("extends"),
    attr("discriminator-value"),
    attr("table"),
    attr("schema"),
    attr("catalog"),
    attr("subselect"),
    attr("check"),
    attr("persister"),
    flag("lazy", None),
    flag("abstract", None),
    flag("dynamic-update", Some("false")),
    flag("dynamic-insert", Some("false")),
    flag("select-before-update", Some("false")),
    number("batch-size"),
    attr("node"),
];

const SUBCLASS_MEMBERS: &[&str] = &[
    "meta",
    "subselect",
    "synchronize",
    "comment",
    "tuplizer",
    "key",
    "property",
    "many-to-one",
    "one-to-one",
    "component",
    "dynamic-component",
    "properties",
    "any",
    "map",
    "set",
    "list",
    "bag",
    "idbag",
    "array",
    "primitive-array",
    "join",
    "subclass",
    "joined-subclass",
    "union-subclass",
    "loader",
    "sql-insert",
    "sql-update",
    "sql-delete",
    "fetch-profile",
    "resultset",
    "query",
    "sql-query",
];

const COLLECTION_ATTRIBUTES: &[AttributeDecl] = &[
    required("name"),
    attr("access"),
    attr("table"),
    attr("schema"),
    attr("catalog"),
    attr("subselect"),
    attr("lazy"),
    flag("inverse", Some("false")),
    flag("mutable", Some("true")),
    attr("cascade"),
    attr("order-by"),
    attr("where"),
    number("batch-size"),
    attr("outer-join"),
    attr("fetch"),
    attr("persister"),
    attr("collection-type"),
    attr("check"),
    flag("optimistic-lock", Some("true")),
    attr("sort"),
    attr("node"),
    flag("embed-xml", Some("true")),
];

const ARRAY_ATTRIBUTES: &[AttributeDecl] = &[
    required("name"),
    attr("access"),
    attr("table"),
    attr("schema"),
    attr("catalog"),
    attr("subselect"),
    flag("inverse", Some("false")),
    flag("mutable", Some("true")),
    attr("element-class"),
    attr("cascade"),
    attr("where"),
    number("batch-size"),
    attr("outer-join"),
    attr("fetch"),
    attr("persister"),
    attr("collection-type"),
    attr("check"),
    flag("optimistic-lock", Some("true")),
    attr("node"),
    flag("embed-xml", Some("true")),
];

/// Children shared by every collection, before and after the index and element
const SET_CHILDREN: &[&str] = &[
    "meta",
    "subselect",
    "cache",
    "synchronize",
    "comment",
    "key",
    "element",
    "one-to-many",
    "many-to-many",
    "composite-element",
    "many-to-any",
    "loader",
    "sql-insert",
    "sql-update",
    "sql-delete",
    "sql-delete-all",
    "filter",
];

const INDEXED_CHILDREN: &[&str] = &[
    "meta",
    "subselect",
    "cache",
    "synchronize",
    "comment",
    "key",
    "list-index",
    "index",
    "map-key",
    "composite-map-key",
    "map-key-many-to-many",
    "index-many-to-any",
    "element",
    "one-to-many",
    "many-to-many",
    "composite-element",
    "many-to-any",
    "loader",
    "sql-insert",
    "sql-update",
    "sql-delete",
    "sql-delete-all",
    "filter",
];

const COLUMN_SOURCE: &[&str] = &["column", "formula"];

const CUSTOM_SQL_ATTRIBUTES: &[AttributeDecl] = &[flag("callable", Some("false")), attr("check")];

/// The hbm.xml schema
pub static HBM_SCHEMA: &[ElementDecl] = &[
    element(
        HBM_ROOT,
        &[
            attr("schema"),
            attr("catalog"),
            defaulted("default-cascade", "none"),
            defaulted("default-access", "property"),
            flag("default-lazy", Some("true")),
            flag("auto-import", Some("true")),
            attr("package"),
        ],
        &[
            "meta",
            "identifier-generator",
            "typedef",
            "filter-def",
            "import",
            "class",
            "subclass",
            "joined-subclass",
            "union-subclass",
            "resultset",
            "query",
            "sql-query",
            "fetch-profile",
            "database-object",
        ],
    ),
    text_element("meta", &[required("attribute"), flag("inherit", Some("true"))], &[]),
    element("identifier-generator", &[required("name"), required("class")], &[]),
    element("typedef", &[required("name"), required("class")], &["param"]),
    text_element("param", &[required("name")], &[]),
    text_element("filter-def", &[required("name"), attr("condition")], &["filter-param"]),
    element("filter-param", &[required("name"), required("type")], &[]),
    text_element(
        "filter",
        &[required("name"), attr("condition"), flag("autoAliasInjection", Some("true"))],
        &[],
    ),
    element("import", &[required("class"), attr("rename")], &[]),
    element(
        "class",
        &[
            attr("name"),
            attr("entity-name"),
            attr("proxy"),
            attr("table"),
            attr("schema"),
            attr("catalog"),
            attr("subselect"),
            attr("discriminator-value"),
            flag("mutable", Some("true")),
            flag("abstract", None),
            defaulted("polymorphism", "implicit"),
            attr("where"),
            attr("persister"),
            flag("dynamic-update", Some("false")),
            flag("dynamic-insert", Some("false")),
            number("batch-size"),
            flag("select-before-update", Some("false")),
            defaulted("optimistic-lock", "version"),
            flag("lazy", None),
            attr("check"),
            attr("rowid"),
            attr("node"),
        ],
        CLASS_CHILDREN,
    ),
    text_element("subselect", &[], &[]),
    text_element("comment", &[], &[]),
    element("synchronize", &[required("table")], &[]),
    element("tuplizer", &[required("class"), attr("entity-mode")], &[]),
    element("cache", &[required("usage"), attr("region"), defaulted("include", "all")], &[]),
    element(
        "id",
        &[
            attr("name"),
            attr("node"),
            attr("access"),
            attr("column"),
            attr("type"),
            number("length"),
            attr("unsaved-value"),
        ],
        &["meta", "column", "type", "generator"],
    ),
    element(
        "composite-id",
        &[
            attr("name"),
            attr("class"),
            flag("mapped", Some("false")),
            attr("access"),
            attr("node"),
            defaulted("unsaved-value", "undefined"),
        ],
        &["meta", "tuplizer", "key-property", "key-many-to-one", "generator"],
    ),
    element("generator", &[required("class")], &["param"]),
    element(
        "discriminator",
        &[
            attr("column"),
            attr("formula"),
            defaulted("type", "string"),
            number("length"),
            flag("not-null", Some("true")),
            flag("force", Some("false")),
            flag("insert", Some("true")),
        ],
        COLUMN_SOURCE,
    ),
    element(
        "natural-id",
        &[flag("mutable", Some("false"))],
        &["property", "many-to-one", "component", "dynamic-component", "any"],
    ),
    element(
        "version",
        &[
            required("name"),
            attr("node"),
            attr("access"),
            attr("column"),
            defaulted("type", "integer"),
            attr("unsaved-value"),
            defaulted("generated", "never"),
            flag("insert", None),
        ],
        &["meta", "column"],
    ),
    element(
        "timestamp",
        &[
            required("name"),
            attr("node"),
            attr("column"),
            attr("access"),
            attr("unsaved-value"),
            defaulted("source", "vm"),
            defaulted("generated", "never"),
        ],
        &["meta"],
    ),
    element(
        "column",
        &[
            required("name"),
            number("length"),
            number("precision"),
            number("scale"),
            flag("not-null", None),
            flag("unique", None),
            attr("unique-key"),
            attr("sql-type"),
            attr("index"),
            attr("check"),
            attr("default"),
            attr("read"),
            attr("write"),
        ],
        &["comment"],
    ),
    text_element("formula", &[], &[]),
    element(
        "property",
        &[
            required("name"),
            attr("node"),
            attr("access"),
            attr("type"),
            attr("column"),
            number("length"),
            number("precision"),
            number("scale"),
            flag("not-null", None),
            flag("unique", None),
            attr("unique-key"),
            attr("index"),
            flag("update", None),
            flag("insert", None),
            flag("optimistic-lock", Some("true")),
            attr("formula"),
            flag("lazy", Some("false")),
            defaulted("generated", "never"),
        ],
        &["meta", "column", "formula", "type"],
    ),
    element("type", &[required("name")], &["param"]),
    element(
        "many-to-one",
        &[
            required("name"),
            attr("access"),
            attr("class"),
            attr("entity-name"),
            attr("column"),
            flag("not-null", None),
            flag("unique", Some("false")),
            attr("unique-key"),
            attr("index"),
            attr("cascade"),
            attr("outer-join"),
            attr("fetch"),
            flag("update", Some("true")),
            flag("insert", Some("true")),
            flag("optimistic-lock", Some("true")),
            attr("foreign-key"),
            attr("property-ref"),
            attr("formula"),
            attr("lazy"),
            defaulted("not-found", "exception"),
            attr("node"),
            flag("embed-xml", Some("true")),
        ],
        &["meta", "column", "formula"],
    ),
    element(
        "one-to-one",
        &[
            required("name"),
            attr("formula"),
            attr("access"),
            attr("class"),
            attr("entity-name"),
            attr("cascade"),
            attr("outer-join"),
            attr("fetch"),
            flag("constrained", Some("false")),
            attr("foreign-key"),
            attr("property-ref"),
            attr("lazy"),
            attr("node"),
            flag("embed-xml", Some("true")),
        ],
        &["meta", "formula"],
    ),
    element(
        "component",
        &[
            required("name"),
            attr("class"),
            attr("access"),
            flag("unique", Some("false")),
            flag("update", Some("true")),
            flag("insert", Some("true")),
            flag("lazy", Some("false")),
            flag("optimistic-lock", Some("true")),
            attr("node"),
        ],
        COMPONENT_CHILDREN,
    ),
    element(
        "dynamic-component",
        &[
            required("name"),
            attr("access"),
            flag("unique", Some("false")),
            flag("update", Some("true")),
            flag("insert", Some("true")),
            flag("optimistic-lock", Some("true")),
            attr("node"),
        ],
        COMPONENT_CHILDREN,
    ),
    element("parent", &[required("name"), attr("access")], &[]),
    element(
        "properties",
        &[
            required("name"),
            flag("unique", Some("false")),
            flag("insert", Some("true")),
            flag("update", Some("true")),
            flag("optimistic-lock", Some("true")),
            attr("node"),
        ],
        &["property", "many-to-one", "component", "dynamic-component"],
    ),
    element(
        "any",
        &[
            required("name"),
            required("id-type"),
            defaulted("meta-type", "string"),
            attr("access"),
            flag("insert", Some("true")),
            flag("update", Some("true")),
            attr("cascade"),
            attr("index"),
            flag("optimistic-lock", Some("true")),
            flag("lazy", Some("false")),
            attr("node"),
        ],
        &["meta", "meta-value", "column"],
    ),
    element("meta-value", &[required("value"), required("class")], &[]),
    element(
        "join",
        &[
            required("table"),
            attr("schema"),
            attr("catalog"),
            attr("subselect"),
            defaulted("fetch", "join"),
            flag("inverse", Some("false")),
            flag("optional", Some("false")),
        ],
        &[
            "subselect",
            "comment",
            "key",
            "property",
            "many-to-one",
            "component",
            "dynamic-component",
            "any",
            "sql-insert",
            "sql-update",
            "sql-delete",
        ],
    ),
    element("set", COLLECTION_ATTRIBUTES, SET_CHILDREN),
    element("bag", COLLECTION_ATTRIBUTES, SET_CHILDREN),
    element("idbag", COLLECTION_ATTRIBUTES, &[
        "meta",
        "subselect",
        "cache",
        "synchronize",
        "comment",
        "collection-id",
        "key",
        "element",
        "many-to-many",
        "composite-element",
        "many-to-any",
        "loader",
        "sql-insert",
        "sql-update",
        "sql-delete",
        "sql-delete-all",
        "filter",
    ]),
    element("list", COLLECTION_ATTRIBUTES, INDEXED_CHILDREN),
    element("map", COLLECTION_ATTRIBUTES, INDEXED_CHILDREN),
    element("array", ARRAY_ATTRIBUTES, INDEXED_CHILDREN),
    element("primitive-array", ARRAY_ATTRIBUTES, &[
        "meta",
        "subselect",
        "cache",
        "synchronize",
        "comment",
        "key",
        "list-index",
        "index",
        "element",
        "loader",
        "sql-insert",
        "sql-update",
        "sql-delete",
        "sql-delete-all",
    ]),
    element(
        "collection-id",
        &[required("column"), required("type"), number("length")],
        &["meta", "column", "generator"],
    ),
    element(
        "key",
        &[
            attr("column"),
            attr("property-ref"),
            attr("foreign-key"),
            defaulted("on-delete", "noaction"),
            flag("not-null", None),
            flag("update", None),
            flag("unique", None),
        ],
        &["column"],
    ),
    element("list-index", &[attr("column"), count("base", "0")], &["column"]),
    element(
        "index",
        &[attr("column"), attr("type"), number("length")],
        &["column"],
    ),
    element(
        "map-key",
        &[attr("column"), attr("formula"), required("type"), attr("node"), number("length")],
        COLUMN_SOURCE,
    ),
    element(
        "composite-map-key",
        &[required("class")],
        &["key-property", "key-many-to-one"],
    ),
    element(
        "key-property",
        &[required("name"), attr("access"), attr("type"), attr("column"), number("length"), attr("node")],
        &["meta", "column", "type"],
    ),
    element(
        "key-many-to-one",
        &[
            required("name"),
            attr("access"),
            attr("class"),
            attr("entity-name"),
            attr("column"),
            attr("foreign-key"),
            attr("lazy"),
        ],
        &["meta", "column"],
    ),
    element(
        "map-key-many-to-many",
        &[attr("class"), attr("entity-name"), attr("column"), attr("formula"), attr("foreign-key")],
        COLUMN_SOURCE,
    ),
    element(
        "index-many-to-any",
        &[required("id-type"), defaulted("meta-type", "string")],
        &["column"],
    ),
    element(
        "element",
        &[
            attr("column"),
            attr("node"),
            attr("formula"),
            attr("type"),
            number("length"),
            number("precision"),
            number("scale"),
            flag("not-null", Some("false")),
            flag("unique", Some("false")),
        ],
        &["column", "formula", "type"],
    ),
    element(
        "one-to-many",
        &[
            attr("class"),
            attr("node"),
            flag("embed-xml", Some("true")),
            defaulted("not-found", "exception"),
            attr("entity-name"),
        ],
        &[],
    ),
    element(
        "many-to-many",
        &[
            attr("class"),
            attr("node"),
            flag("embed-xml", Some("true")),
            attr("entity-name"),
            attr("column"),
            attr("formula"),
            defaulted("not-found", "exception"),
            attr("outer-join"),
            attr("fetch"),
            attr("lazy"),
            attr("foreign-key"),
            flag("unique", Some("false")),
            attr("where"),
            attr("order-by"),
            attr("property-ref"),
        ],
        &["meta", "column", "formula", "filter"],
    ),
    element(
        "composite-element",
        &[required("class"), attr("node")],
        &["meta", "tuplizer", "parent", "property", "many-to-one", "any", "nested-composite-element"],
    ),
    element(
        "nested-composite-element",
        &[required("name"), attr("access"), required("class"), attr("node")],
        &["tuplizer", "parent", "property", "many-to-one", "any", "nested-composite-element"],
    ),
    element(
        "many-to-any",
        &[required("id-type"), defaulted("meta-type", "string")],
        &["meta-value", "column"],
    ),
    element("subclass", SUBCLASS_ATTRIBUTES, SUBCLASS_MEMBERS),
    element("joined-subclass", SUBCLASS_ATTRIBUTES, SUBCLASS_MEMBERS),
    element("union-subclass", SUBCLASS_ATTRIBUTES, SUBCLASS_MEMBERS),
    element("loader", &[required("query-ref")], &[]),
    text_element("sql-insert", CUSTOM_SQL_ATTRIBUTES, &[]),
    text_element("sql-update", CUSTOM_SQL_ATTRIBUTES, &[]),
    text_element("sql-delete", CUSTOM_SQL_ATTRIBUTES, &[]),
    text_element("sql-delete-all", CUSTOM_SQL_ATTRIBUTES, &[]),
    element(
        "fetch-profile",
        &[required("name")],
        &["fetch"],
    ),
    element(
        "fetch",
        &[attr("entity"), required("association"), defaulted("style", "join")],
        &[],
    ),
    element(
        "resultset",
        &[required("name")],
        &["return-scalar", "return", "return-join", "load-collection"],
    ),
    element("return-scalar", &[required("column"), attr("type")], &[]),
    element(
        "return",
        &[attr("alias"), attr("entity-name"), attr("class"), defaulted("lock-mode", "read")],
        &["return-discriminator", "return-property"],
    ),
    element("return-discriminator", &[required("column")], &[]),
    element(
        "return-property",
        &[required("name"), attr("column")],
        &["return-column"],
    ),
    element("return-column", &[required("name")], &[]),
    element(
        "return-join",
        &[required("alias"), required("property"), defaulted("lock-mode", "read")],
        &["return-property"],
    ),
    element(
        "load-collection",
        &[required("alias"), required("role"), defaulted("lock-mode", "read")],
        &["return-property"],
    ),
    text_element(
        "query",
        &[
            required("name"),
            flag("cacheable", Some("false")),
            attr("cache-region"),
            number("fetch-size"),
            number("timeout"),
            attr("flush-mode"),
            attr("cache-mode"),
            flag("read-only", None),
            attr("comment"),
        ],
        &["query-param"],
    ),
    text_element(
        "sql-query",
        &[
            required("name"),
            attr("resultset-ref"),
            flag("cacheable", Some("false")),
            attr("cache-region"),
            number("fetch-size"),
            number("timeout"),
            attr("flush-mode"),
            attr("cache-mode"),
            flag("read-only", None),
            attr("comment"),
            flag("callable", Some("false")),
        ],
        &[
            "return-scalar",
            "return",
            "return-join",
            "load-collection",
            "synchronize",
            "query-param",
        ],
    ),
    element("query-param", &[required("name"), required("type")], &[]),
    element(
        "database-object",
        &[],
        &["definition", "create", "drop", "dialect-scope"],
    ),
    element("definition", &[required("class")], &[]),
    text_element("create", &[], &[]),
    text_element("drop", &[], &[]),
    text_element("dialect-scope", &[required("name")], &[]),
];

// ============================================================================
// Bound element tree
// ============================================================================

/// An element accepted by the schema, defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawElement {
    pub name: &'static str,
    pub attributes: Vec<(&'static str, String)>,
    pub children: Vec<RawElement>,
    pub text: String,
}

impl RawElement {
    fn new(name: &'static str) -> Self {
        RawElement {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attr_string(&self, name: &str) -> Option<String> {
        self.attr(name).map(str::to_string)
    }

    /// Boolean attribute; unparseable values read as absent
    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        match self.attr(name)?.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    pub fn attr_u32(&self, name: &str) -> Option<u32> {
        self.attr(name)?.trim().parse().ok()
    }

    pub fn child(&self, name: &str) -> Option<&RawElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RawElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn text(&self) -> &str {
        self.text.trim()
    }
}

// ============================================================================
// Compiled context
// ============================================================================

#[derive(Debug)]
struct CompiledElement {
    decl: &'static ElementDecl,
    attributes: HashMap<&'static str, &'static AttributeDecl>,
}

impl CompiledElement {
    fn permits(&self, child: &str) -> bool {
        self.decl.children.iter().any(|c| *c == child)
    }

    fn bind_attributes(&self, start: &StartElement, validate: bool) -> std::result::Result<RawElement, String> {
        let mut element = RawElement::new(self.decl.name);

        for attribute in &start.attributes {
            // Namespace declarations and foreign-namespace attributes (xsi:*)
            if attribute.is_namespace_declaration() || attribute.prefix().is_some() {
                continue;
            }
            match self.attributes.get(attribute.name.as_str()) {
                Some(decl) => {
                    if validate && !decl.kind.accepts(&attribute.value) {
                        return Err(format!(
                            "value '{}' of attribute '{}' in <{}> is not a valid {:?}",
                            attribute.value, attribute.name, self.decl.name, decl.kind
                        ));
                    }
                    element.attributes.push((decl.name, attribute.value.clone()));
                }
                None if validate => {
                    return Err(format!(
                        "attribute '{}' is not allowed in <{}>",
                        attribute.name, self.decl.name
                    ));
                }
                None => {
                    tracing::trace!(element = self.decl.name, attribute = %attribute.name, "skipping undeclared hbm attribute");
                }
            }
        }

        for decl in self.decl.attributes {
            if element.attr(decl.name).is_some() {
                continue;
            }
            if let Some(default) = decl.default {
                element.attributes.push((decl.name, default.to_string()));
            } else if decl.required && validate {
                return Err(format!(
                    "attribute '{}' is required in <{}>",
                    decl.name, self.decl.name
                ));
            }
        }

        Ok(element)
    }
}

/// Compiled hbm.xml binding context
///
/// Built once per binder and shared by every hbm binding it performs.
#[derive(Debug)]
pub struct HbmBindingContext {
    root: &'static str,
    elements: HashMap<&'static str, CompiledElement>,
}

impl HbmBindingContext {
    /// Compile the built-in hbm.xml schema
    pub fn compile() -> Result<Self> {
        Self::compile_from(HBM_SCHEMA, HBM_ROOT)
    }

    /// Compile an arbitrary schema table rooted at `root`
    pub fn compile_from(schema: &'static [ElementDecl], root: &'static str) -> Result<Self> {
        let mut elements = HashMap::with_capacity(schema.len());

        for decl in schema {
            let mut attributes = HashMap::with_capacity(decl.attributes.len());
            for attribute in decl.attributes {
                if attributes.insert(attribute.name, attribute).is_some() {
                    return Err(Error::Configuration(format!(
                        "attribute '{}' declared twice in <{}>",
                        attribute.name, decl.name
                    )));
                }
                if let Some(default) = attribute.default {
                    if !attribute.kind.accepts(default) {
                        return Err(Error::Configuration(format!(
                            "default '{}' of attribute '{}' in <{}> is not a valid {:?}",
                            default, attribute.name, decl.name, attribute.kind
                        )));
                    }
                }
            }
            if elements
                .insert(decl.name, CompiledElement { decl, attributes })
                .is_some()
            {
                return Err(Error::Configuration(format!("element <{}> declared twice", decl.name)));
            }
        }

        for decl in schema {
            if let Some(missing) = decl.children.iter().find(|c| !elements.contains_key(*c)) {
                return Err(Error::Configuration(format!(
                    "element <{}> references undeclared child <{}>",
                    decl.name, missing
                )));
            }
        }
        if !elements.contains_key(root) {
            return Err(Error::Configuration(format!("root element <{}> is not declared", root)));
        }

        tracing::debug!(elements = elements.len(), root, "compiled hbm.xml binding context");
        Ok(HbmBindingContext { root, elements })
    }

    /// Number of declared elements
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Check whether an element is declared
    pub fn declares(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    /// Unmarshal an hbm token stream into the typed model
    ///
    /// With `validate` set, undeclared elements and attributes, malformed
    /// values, missing required attributes, foreign namespaces and stray
    /// text are rejected. Otherwise undeclared content is skipped.
    pub fn unmarshal<R: TokenReader>(&self, reader: R, origin: &Origin, validate: bool) -> Result<HbmMapping> {
        let root = self
            .bind_tree(reader, validate)
            .map_err(|message| Error::unmarshal(origin, message))?;
        Ok(HbmMapping::from_raw(&root))
    }

    pub(crate) fn bind_tree<R: TokenReader>(&self, mut reader: R, validate: bool) -> std::result::Result<RawElement, String> {
        let mut stack: Vec<(RawElement, &CompiledElement)> = Vec::new();
        let mut root: Option<RawElement> = None;
        let mut skip_depth = 0usize;

        while let Some(token) = reader.next_token().map_err(|e| e.to_string())? {
            if skip_depth > 0 {
                match token {
                    XmlToken::StartElement(_) => skip_depth += 1,
                    XmlToken::EndElement(_) => skip_depth -= 1,
                    _ => {}
                }
                continue;
            }

            match token {
                XmlToken::StartElement(start) => {
                    if root.is_some() {
                        return Err(format!("unexpected element <{}> after the root element", start.name));
                    }
                    let local = start.local_name();
                    let compiled = match stack.last() {
                        None => match self.elements.get(local).filter(|_| local == self.root) {
                            Some(compiled) => compiled,
                            None => {
                                return Err(format!(
                                    "unexpected root element <{}>, expected <{}>",
                                    start.name, self.root
                                ));
                            }
                        },
                        Some((_, parent)) => match self.elements.get(local).filter(|_| parent.permits(local)) {
                            Some(compiled) => compiled,
                            None if validate => {
                                return Err(format!(
                                    "element <{}> is not allowed in <{}>",
                                    local, parent.decl.name
                                ));
                            }
                            None => {
                                tracing::trace!(element = local, parent = parent.decl.name, "skipping undeclared hbm element");
                                skip_depth = 1;
                                continue;
                            }
                        },
                    };

                    if validate {
                        if let Some(ns) = start.namespace.as_deref().filter(|ns| *ns != HBM_NAMESPACE) {
                            return Err(format!(
                                "element <{}> is in namespace {}, expected {}",
                                start.name, ns, HBM_NAMESPACE
                            ));
                        }
                    }

                    let element = compiled.bind_attributes(&start, validate)?;
                    stack.push((element, compiled));
                }

                XmlToken::EndElement(end) => {
                    let Some((element, _)) = stack.pop() else {
                        return Err(format!("unexpected end tag </{}>", end.name));
                    };
                    if end.local_name() != element.name {
                        return Err(format!(
                            "tag mismatch: <{}> closed with </{}>",
                            element.name, end.name
                        ));
                    }
                    match stack.last_mut() {
                        Some((parent, _)) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }

                XmlToken::Text(text) | XmlToken::CData(text) => match stack.last_mut() {
                    Some((element, compiled)) if compiled.decl.text => element.text.push_str(&text),
                    Some((element, _)) => {
                        if validate && !text.trim().is_empty() {
                            return Err(format!("character data is not allowed in <{}>", element.name));
                        }
                    }
                    None => {}
                },

                XmlToken::EndDocument => break,

                _ => {}
            }
        }

        if let Some((open, _)) = stack.last() {
            return Err(format!("unexpected end of document inside <{}>", open.name));
        }
        root.ok_or_else(|| "document has no root element".to_string())
    }
}
