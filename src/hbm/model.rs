//! Typed hbm.xml Model
//!
//! Strongly-shaped representation of a hierarchical mapping document.
//! Values are built from the schema-checked element tree, so declared
//! defaults are already applied when conversion runs.

use super::context::RawElement;

/// Root of a bound hbm.xml document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmMapping {
    pub package: Option<String>,
    pub schema: Option<String>,
    pub catalog: Option<String>,
    pub default_access: String,
    pub default_cascade: String,
    pub default_lazy: bool,
    pub auto_import: bool,
    pub metas: Vec<HbmMeta>,
    pub identifier_generators: Vec<HbmIdentifierGenerator>,
    pub type_defs: Vec<HbmTypeDef>,
    pub filter_defs: Vec<HbmFilterDef>,
    pub imports: Vec<HbmImport>,
    pub classes: Vec<HbmClass>,
    /// Subclasses declared at the top level, tied to their parent by `extends`
    pub subclasses: Vec<HbmSubclass>,
    pub result_sets: Vec<HbmResultSet>,
    pub queries: Vec<HbmQuery>,
    pub fetch_profiles: Vec<HbmFetchProfile>,
    pub database_objects: Vec<HbmDatabaseObject>,
}

impl Default for HbmMapping {
    fn default() -> Self {
        HbmMapping {
            package: None,
            schema: None,
            catalog: None,
            default_access: "property".to_string(),
            default_cascade: "none".to_string(),
            default_lazy: true,
            auto_import: true,
            metas: Vec::new(),
            identifier_generators: Vec::new(),
            type_defs: Vec::new(),
            filter_defs: Vec::new(),
            imports: Vec::new(),
            classes: Vec::new(),
            subclasses: Vec::new(),
            result_sets: Vec::new(),
            queries: Vec::new(),
            fetch_profiles: Vec::new(),
            database_objects: Vec::new(),
        }
    }
}

impl HbmMapping {
    pub(crate) fn from_raw(raw: &RawElement) -> Self {
        let defaults = HbmMapping::default();
        let mut mapping = HbmMapping {
            package: raw.attr_string("package"),
            schema: raw.attr_string("schema"),
            catalog: raw.attr_string("catalog"),
            default_access: raw.attr_string("default-access").unwrap_or(defaults.default_access),
            default_cascade: raw.attr_string("default-cascade").unwrap_or(defaults.default_cascade),
            default_lazy: raw.attr_bool("default-lazy").unwrap_or(defaults.default_lazy),
            auto_import: raw.attr_bool("auto-import").unwrap_or(defaults.auto_import),
            ..HbmMapping::default()
        };

        for child in &raw.children {
            match child.name {
                "meta" => mapping.metas.push(HbmMeta::from_raw(child)),
                "identifier-generator" => mapping.identifier_generators.push(HbmIdentifierGenerator {
                    name: child.attr_string("name").unwrap_or_default(),
                    class: child.attr_string("class").unwrap_or_default(),
                }),
                "typedef" => mapping.type_defs.push(HbmTypeDef {
                    name: child.attr_string("name").unwrap_or_default(),
                    class: child.attr_string("class").unwrap_or_default(),
                    params: params(child),
                }),
                "filter-def" => mapping.filter_defs.push(HbmFilterDef::from_raw(child)),
                "import" => mapping.imports.push(HbmImport {
                    class: child.attr_string("class").unwrap_or_default(),
                    rename: child.attr_string("rename"),
                }),
                "class" => mapping.classes.push(HbmClass::from_raw(child)),
                "subclass" | "joined-subclass" | "union-subclass" => {
                    if let Some(subclass) = HbmSubclass::from_raw(child) {
                        mapping.subclasses.push(subclass);
                    }
                }
                "resultset" => mapping.result_sets.push(HbmResultSet::from_raw(child)),
                "query" | "sql-query" => mapping.queries.push(HbmQuery::from_raw(child)),
                "fetch-profile" => mapping.fetch_profiles.push(HbmFetchProfile::from_raw(child)),
                "database-object" => mapping.database_objects.push(HbmDatabaseObject::from_raw(child)),
                _ => {}
            }
        }

        mapping
    }

    /// Qualify a class name with this document's package
    pub fn qualify(&self, class_name: &str) -> String {
        crate::context::qualify_class_name(class_name, self.package.as_deref())
    }

    /// Look up a root class by unqualified or qualified name, or by entity name
    pub fn find_class(&self, name: &str) -> Option<&HbmClass> {
        self.classes.iter().find(|class| {
            class.entity_name.as_deref() == Some(name)
                || class
                    .name
                    .as_deref()
                    .is_some_and(|n| n == name || self.qualify(n) == name)
        })
    }
}

// ============================================================================
// Shared pieces
// ============================================================================

/// Named `<param>` of a generator, typedef or type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmParam {
    pub name: String,
    pub value: String,
}

fn params(raw: &RawElement) -> Vec<HbmParam> {
    raw.children_named("param")
        .map(|param| HbmParam {
            name: param.attr_string("name").unwrap_or_default(),
            value: param.text().to_string(),
        })
        .collect()
}

/// Tool metadata attached with `<meta attribute="...">`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmMeta {
    pub attribute: String,
    pub value: String,
    pub inherit: bool,
}

impl HbmMeta {
    fn from_raw(raw: &RawElement) -> Self {
        HbmMeta {
            attribute: raw.attr_string("attribute").unwrap_or_default(),
            value: raw.text().to_string(),
            inherit: raw.attr_bool("inherit").unwrap_or(true),
        }
    }
}

fn metas(raw: &RawElement) -> Vec<HbmMeta> {
    raw.children_named("meta").map(HbmMeta::from_raw).collect()
}

/// Trimmed text of the first child called `name`, when not blank
fn child_text(raw: &RawElement, name: &str) -> Option<String> {
    raw.child(name)
        .map(RawElement::text)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// An attribute that may also be written as a child element, e.g. `formula`
fn attr_or_child(raw: &RawElement, name: &str) -> Option<String> {
    raw.attr_string(name).or_else(|| child_text(raw, name))
}

/// Type name from the `type` attribute or a nested `<type name="...">`
fn type_name(raw: &RawElement) -> Option<String> {
    raw.attr_string("type")
        .or_else(|| raw.child("type").and_then(|t| t.attr_string("name")))
}

fn synchronized_tables(raw: &RawElement) -> Vec<String> {
    raw.children_named("synchronize")
        .filter_map(|sync| sync.attr_string("table"))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmIdentifierGenerator {
    pub name: String,
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmTypeDef {
    pub name: String,
    pub class: String,
    pub params: Vec<HbmParam>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmImport {
    pub class: String,
    pub rename: Option<String>,
}

/// `<filter-def>`: a named filter and its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmFilterDef {
    pub name: String,
    /// Default condition, from the attribute or the element text
    pub condition: Option<String>,
    pub params: Vec<HbmFilterParam>,
}

impl HbmFilterDef {
    fn from_raw(raw: &RawElement) -> Self {
        HbmFilterDef {
            name: raw.attr_string("name").unwrap_or_default(),
            condition: raw
                .attr_string("condition")
                .or_else(|| Some(raw.text().to_string()).filter(|text| !text.is_empty())),
            params: raw
                .children_named("filter-param")
                .map(|param| HbmFilterParam {
                    name: param.attr_string("name").unwrap_or_default(),
                    type_name: param.attr_string("type").unwrap_or_default(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmFilterParam {
    pub name: String,
    pub type_name: String,
}

/// `<filter>` applied to a class or collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmFilter {
    pub name: String,
    pub condition: Option<String>,
    pub auto_alias_injection: bool,
}

fn filters(raw: &RawElement) -> Vec<HbmFilter> {
    raw.children_named("filter")
        .map(|filter| HbmFilter {
            name: filter.attr_string("name").unwrap_or_default(),
            condition: filter
                .attr_string("condition")
                .or_else(|| Some(filter.text().to_string()).filter(|text| !text.is_empty())),
            auto_alias_injection: filter.attr_bool("autoAliasInjection").unwrap_or(true),
        })
        .collect()
}

/// Hand-written `<sql-insert>`, `<sql-update>`, `<sql-delete>` or `<sql-delete-all>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmCustomSql {
    pub sql: String,
    pub callable: bool,
    pub check: Option<String>,
}

fn custom_sql(raw: &RawElement, name: &str) -> Option<HbmCustomSql> {
    raw.child(name).map(|sql| HbmCustomSql {
        sql: sql.text().to_string(),
        callable: sql.attr_bool("callable").unwrap_or(false),
        check: sql.attr_string("check"),
    })
}

fn loader(raw: &RawElement) -> Option<String> {
    raw.child("loader").and_then(|l| l.attr_string("query-ref"))
}

// ============================================================================
// Queries and result sets
// ============================================================================

/// Named HQL or native query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmQuery {
    pub name: String,
    /// True for `<sql-query>`
    pub native: bool,
    pub query: String,
    pub cacheable: bool,
    pub callable: bool,
    pub result_set_ref: Option<String>,
    pub params: Vec<HbmFilterParam>,
    pub returns: Vec<HbmReturn>,
    pub synchronized_tables: Vec<String>,
}

impl HbmQuery {
    fn from_raw(raw: &RawElement) -> Self {
        HbmQuery {
            name: raw.attr_string("name").unwrap_or_default(),
            native: raw.name == "sql-query",
            query: raw.text().to_string(),
            cacheable: raw.attr_bool("cacheable").unwrap_or(false),
            callable: raw.attr_bool("callable").unwrap_or(false),
            result_set_ref: raw.attr_string("resultset-ref"),
            params: raw
                .children_named("query-param")
                .map(|param| HbmFilterParam {
                    name: param.attr_string("name").unwrap_or_default(),
                    type_name: param.attr_string("type").unwrap_or_default(),
                })
                .collect(),
            returns: returns(raw),
            synchronized_tables: synchronized_tables(raw),
        }
    }
}

fn queries(raw: &RawElement) -> Vec<HbmQuery> {
    raw.children
        .iter()
        .filter(|c| c.name == "query" || c.name == "sql-query")
        .map(HbmQuery::from_raw)
        .collect()
}

/// Named `<resultset>` shared by native queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmResultSet {
    pub name: String,
    pub returns: Vec<HbmReturn>,
}

impl HbmResultSet {
    fn from_raw(raw: &RawElement) -> Self {
        HbmResultSet {
            name: raw.attr_string("name").unwrap_or_default(),
            returns: returns(raw),
        }
    }
}

/// One column of a native result mapped to a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmReturnProperty {
    pub name: String,
    pub columns: Vec<String>,
}

/// What a native query returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HbmReturn {
    Scalar {
        column: String,
        type_name: Option<String>,
    },
    Entity {
        alias: Option<String>,
        /// Entity name, else class name
        entity: Option<String>,
        lock_mode: String,
        properties: Vec<HbmReturnProperty>,
    },
    Join {
        alias: String,
        property: String,
        lock_mode: String,
        properties: Vec<HbmReturnProperty>,
    },
    Collection {
        alias: String,
        role: String,
        lock_mode: String,
        properties: Vec<HbmReturnProperty>,
    },
}

fn return_properties(raw: &RawElement) -> Vec<HbmReturnProperty> {
    raw.children_named("return-property")
        .map(|property| {
            let mut columns: Vec<String> = property.attr_string("column").into_iter().collect();
            columns.extend(
                property
                    .children_named("return-column")
                    .filter_map(|c| c.attr_string("name")),
            );
            HbmReturnProperty {
                name: property.attr_string("name").unwrap_or_default(),
                columns,
            }
        })
        .collect()
}

fn returns(raw: &RawElement) -> Vec<HbmReturn> {
    let lock_mode = |r: &RawElement| r.attr_string("lock-mode").unwrap_or_else(|| "read".to_string());
    raw.children
        .iter()
        .filter_map(|child| match child.name {
            "return-scalar" => Some(HbmReturn::Scalar {
                column: child.attr_string("column").unwrap_or_default(),
                type_name: child.attr_string("type"),
            }),
            "return" => Some(HbmReturn::Entity {
                alias: child.attr_string("alias"),
                entity: child.attr_string("entity-name").or_else(|| child.attr_string("class")),
                lock_mode: lock_mode(child),
                properties: return_properties(child),
            }),
            "return-join" => Some(HbmReturn::Join {
                alias: child.attr_string("alias").unwrap_or_default(),
                property: child.attr_string("property").unwrap_or_default(),
                lock_mode: lock_mode(child),
                properties: return_properties(child),
            }),
            "load-collection" => Some(HbmReturn::Collection {
                alias: child.attr_string("alias").unwrap_or_default(),
                role: child.attr_string("role").unwrap_or_default(),
                lock_mode: lock_mode(child),
                properties: return_properties(child),
            }),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Fetch profiles and auxiliary database objects
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmFetchProfile {
    pub name: String,
    pub fetches: Vec<HbmFetch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmFetch {
    /// Owning entity; absent when the profile sits inside a class
    pub entity: Option<String>,
    pub association: String,
    pub style: String,
}

impl HbmFetchProfile {
    fn from_raw(raw: &RawElement) -> Self {
        HbmFetchProfile {
            name: raw.attr_string("name").unwrap_or_default(),
            fetches: raw
                .children_named("fetch")
                .map(|fetch| HbmFetch {
                    entity: fetch.attr_string("entity"),
                    association: fetch.attr_string("association").unwrap_or_default(),
                    style: fetch.attr_string("style").unwrap_or_else(|| "join".to_string()),
                })
                .collect(),
        }
    }
}

fn fetch_profiles(raw: &RawElement) -> Vec<HbmFetchProfile> {
    raw.children_named("fetch-profile").map(HbmFetchProfile::from_raw).collect()
}

/// `<database-object>`: either a definition class or a create/drop script pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmDatabaseObject {
    pub definition: Option<String>,
    pub create: Option<String>,
    pub drop: Option<String>,
    pub dialect_scopes: Vec<String>,
}

impl HbmDatabaseObject {
    fn from_raw(raw: &RawElement) -> Self {
        HbmDatabaseObject {
            definition: raw.child("definition").and_then(|d| d.attr_string("class")),
            create: child_text(raw, "create"),
            drop: child_text(raw, "drop"),
            dialect_scopes: raw
                .children_named("dialect-scope")
                .filter_map(|scope| scope.attr_string("name"))
                .collect(),
        }
    }
}

// ============================================================================
// Columns
// ============================================================================

/// A `<column>` child
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HbmColumn {
    pub name: String,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub not_null: Option<bool>,
    pub unique: Option<bool>,
    pub sql_type: Option<String>,
    pub default: Option<String>,
}

/// Columns of an element: the `column` attribute, else every `<column>` child
fn columns(raw: &RawElement) -> Vec<HbmColumn> {
    if let Some(name) = raw.attr_string("column") {
        return vec![HbmColumn {
            name,
            length: raw.attr_u32("length"),
            precision: raw.attr_u32("precision"),
            scale: raw.attr_u32("scale"),
            ..HbmColumn::default()
        }];
    }
    raw.children_named("column")
        .map(|column| HbmColumn {
            name: column.attr_string("name").unwrap_or_default(),
            length: column.attr_u32("length"),
            precision: column.attr_u32("precision"),
            scale: column.attr_u32("scale"),
            not_null: column.attr_bool("not-null"),
            unique: column.attr_bool("unique"),
            sql_type: column.attr_string("sql-type"),
            default: column.attr_string("default"),
        })
        .collect()
}

// ============================================================================
// Classes
// ============================================================================

/// Root `<class>` mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmClass {
    pub name: Option<String>,
    pub entity_name: Option<String>,
    pub proxy: Option<String>,
    pub table: Option<String>,
    pub schema: Option<String>,
    pub catalog: Option<String>,
    /// From the attribute or the `<subselect>` child
    pub subselect: Option<String>,
    pub discriminator_value: Option<String>,
    pub mutable: bool,
    pub is_abstract: Option<bool>,
    pub polymorphism: String,
    pub persister: Option<String>,
    pub lazy: Option<bool>,
    pub dynamic_update: bool,
    pub dynamic_insert: bool,
    pub select_before_update: bool,
    pub optimistic_lock: String,
    pub batch_size: Option<u32>,
    pub where_clause: Option<String>,
    pub check: Option<String>,
    pub rowid: Option<String>,
    pub metas: Vec<HbmMeta>,
    pub synchronized_tables: Vec<String>,
    pub cache: Option<HbmCache>,
    pub id: Option<HbmId>,
    pub composite_id: Option<HbmCompositeId>,
    pub discriminator: Option<HbmDiscriminator>,
    pub natural_id: Option<HbmNaturalId>,
    pub version: Option<HbmVersion>,
    pub timestamp: Option<HbmTimestamp>,
    pub attributes: Vec<HbmAttribute>,
    pub joins: Vec<HbmJoin>,
    pub subclasses: Vec<HbmSubclass>,
    pub loader: Option<String>,
    pub sql_insert: Option<HbmCustomSql>,
    pub sql_update: Option<HbmCustomSql>,
    pub sql_delete: Option<HbmCustomSql>,
    pub filters: Vec<HbmFilter>,
    pub fetch_profiles: Vec<HbmFetchProfile>,
    pub result_sets: Vec<HbmResultSet>,
    pub queries: Vec<HbmQuery>,
}

impl HbmClass {
    fn from_raw(raw: &RawElement) -> Self {
        HbmClass {
            name: raw.attr_string("name"),
            entity_name: raw.attr_string("entity-name"),
            proxy: raw.attr_string("proxy"),
            table: raw.attr_string("table"),
            schema: raw.attr_string("schema"),
            catalog: raw.attr_string("catalog"),
            subselect: attr_or_child(raw, "subselect"),
            discriminator_value: raw.attr_string("discriminator-value"),
            mutable: raw.attr_bool("mutable").unwrap_or(true),
            is_abstract: raw.attr_bool("abstract"),
            polymorphism: raw.attr_string("polymorphism").unwrap_or_else(|| "implicit".to_string()),
            persister: raw.attr_string("persister"),
            lazy: raw.attr_bool("lazy"),
            dynamic_update: raw.attr_bool("dynamic-update").unwrap_or(false),
            dynamic_insert: raw.attr_bool("dynamic-insert").unwrap_or(false),
            select_before_update: raw.attr_bool("select-before-update").unwrap_or(false),
            optimistic_lock: raw.attr_string("optimistic-lock").unwrap_or_else(|| "version".to_string()),
            batch_size: raw.attr_u32("batch-size"),
            where_clause: raw.attr_string("where"),
            check: raw.attr_string("check"),
            rowid: raw.attr_string("rowid"),
            metas: metas(raw),
            synchronized_tables: synchronized_tables(raw),
            cache: raw.child("cache").map(HbmCache::from_raw),
            id: raw.child("id").map(HbmId::from_raw),
            composite_id: raw.child("composite-id").map(HbmCompositeId::from_raw),
            discriminator: raw.child("discriminator").map(HbmDiscriminator::from_raw),
            natural_id: raw.child("natural-id").map(|natural| HbmNaturalId {
                mutable: natural.attr_bool("mutable").unwrap_or(false),
                attributes: attributes(natural),
            }),
            version: raw.child("version").map(HbmVersion::from_raw),
            timestamp: raw.child("timestamp").map(HbmTimestamp::from_raw),
            attributes: attributes(raw),
            joins: raw.children_named("join").map(HbmJoin::from_raw).collect(),
            subclasses: subclasses(raw),
            loader: loader(raw),
            sql_insert: custom_sql(raw, "sql-insert"),
            sql_update: custom_sql(raw, "sql-update"),
            sql_delete: custom_sql(raw, "sql-delete"),
            filters: filters(raw),
            fetch_profiles: fetch_profiles(raw),
            result_sets: raw.children_named("resultset").map(HbmResultSet::from_raw).collect(),
            queries: queries(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmCache {
    pub usage: String,
    pub region: Option<String>,
    pub include: String,
}

impl HbmCache {
    fn from_raw(raw: &RawElement) -> Self {
        HbmCache {
            usage: raw.attr_string("usage").unwrap_or_default(),
            region: raw.attr_string("region"),
            include: raw.attr_string("include").unwrap_or_else(|| "all".to_string()),
        }
    }
}

/// Identifier mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmId {
    pub name: Option<String>,
    pub type_name: Option<String>,
    pub access: Option<String>,
    pub unsaved_value: Option<String>,
    pub metas: Vec<HbmMeta>,
    pub columns: Vec<HbmColumn>,
    pub generator: Option<HbmGenerator>,
}

impl HbmId {
    fn from_raw(raw: &RawElement) -> Self {
        HbmId {
            name: raw.attr_string("name"),
            type_name: type_name(raw),
            access: raw.attr_string("access"),
            unsaved_value: raw.attr_string("unsaved-value"),
            metas: metas(raw),
            columns: columns(raw),
            generator: generator(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmGenerator {
    pub class: String,
    pub params: Vec<HbmParam>,
}

fn generator(raw: &RawElement) -> Option<HbmGenerator> {
    raw.child("generator").map(|generator| HbmGenerator {
        class: generator.attr_string("class").unwrap_or_default(),
        params: params(generator),
    })
}

/// One part of a composite key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HbmKeyPart {
    /// `<key-property>`
    Property {
        name: String,
        type_name: Option<String>,
        access: Option<String>,
        columns: Vec<HbmColumn>,
    },
    /// `<key-many-to-one>`
    ManyToOne {
        name: String,
        class: Option<String>,
        entity_name: Option<String>,
        lazy: Option<String>,
        columns: Vec<HbmColumn>,
    },
}

fn key_parts(raw: &RawElement) -> Vec<HbmKeyPart> {
    raw.children
        .iter()
        .filter_map(|child| match child.name {
            "key-property" => Some(HbmKeyPart::Property {
                name: child.attr_string("name").unwrap_or_default(),
                type_name: type_name(child),
                access: child.attr_string("access"),
                columns: columns(child),
            }),
            "key-many-to-one" => Some(HbmKeyPart::ManyToOne {
                name: child.attr_string("name").unwrap_or_default(),
                class: child.attr_string("class"),
                entity_name: child.attr_string("entity-name"),
                lazy: child.attr_string("lazy"),
                columns: columns(child),
            }),
            _ => None,
        })
        .collect()
}

/// `<composite-id>`: identifier made of several columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmCompositeId {
    pub name: Option<String>,
    pub class: Option<String>,
    pub mapped: bool,
    pub access: Option<String>,
    pub unsaved_value: String,
    pub metas: Vec<HbmMeta>,
    /// Key parts in declaration order
    pub keys: Vec<HbmKeyPart>,
    pub generator: Option<HbmGenerator>,
}

impl HbmCompositeId {
    fn from_raw(raw: &RawElement) -> Self {
        HbmCompositeId {
            name: raw.attr_string("name"),
            class: raw.attr_string("class"),
            mapped: raw.attr_bool("mapped").unwrap_or(false),
            access: raw.attr_string("access"),
            unsaved_value: raw.attr_string("unsaved-value").unwrap_or_else(|| "undefined".to_string()),
            metas: metas(raw),
            keys: key_parts(raw),
            generator: generator(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmDiscriminator {
    pub type_name: String,
    pub formula: Option<String>,
    pub not_null: bool,
    pub force: bool,
    pub insert: bool,
    pub columns: Vec<HbmColumn>,
}

impl HbmDiscriminator {
    fn from_raw(raw: &RawElement) -> Self {
        HbmDiscriminator {
            type_name: raw.attr_string("type").unwrap_or_else(|| "string".to_string()),
            formula: attr_or_child(raw, "formula"),
            not_null: raw.attr_bool("not-null").unwrap_or(true),
            force: raw.attr_bool("force").unwrap_or(false),
            insert: raw.attr_bool("insert").unwrap_or(true),
            columns: columns(raw),
        }
    }
}

/// `<natural-id>`: the business key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmNaturalId {
    pub mutable: bool,
    pub attributes: Vec<HbmAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmVersion {
    pub name: String,
    pub type_name: String,
    pub access: Option<String>,
    pub unsaved_value: Option<String>,
    pub generated: String,
    pub insert: Option<bool>,
    pub metas: Vec<HbmMeta>,
    pub columns: Vec<HbmColumn>,
}

impl HbmVersion {
    fn from_raw(raw: &RawElement) -> Self {
        HbmVersion {
            name: raw.attr_string("name").unwrap_or_default(),
            type_name: raw.attr_string("type").unwrap_or_else(|| "integer".to_string()),
            access: raw.attr_string("access"),
            unsaved_value: raw.attr_string("unsaved-value"),
            generated: raw.attr_string("generated").unwrap_or_else(|| "never".to_string()),
            insert: raw.attr_bool("insert"),
            metas: metas(raw),
            columns: columns(raw),
        }
    }
}

/// `<timestamp>`: version kept as a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmTimestamp {
    pub name: String,
    pub access: Option<String>,
    pub unsaved_value: Option<String>,
    /// `vm` or `db`
    pub source: String,
    pub generated: String,
    pub metas: Vec<HbmMeta>,
    pub columns: Vec<HbmColumn>,
}

impl HbmTimestamp {
    fn from_raw(raw: &RawElement) -> Self {
        HbmTimestamp {
            name: raw.attr_string("name").unwrap_or_default(),
            access: raw.attr_string("access"),
            unsaved_value: raw.attr_string("unsaved-value"),
            source: raw.attr_string("source").unwrap_or_else(|| "vm".to_string()),
            generated: raw.attr_string("generated").unwrap_or_else(|| "never".to_string()),
            metas: metas(raw),
            columns: columns(raw),
        }
    }
}

/// `<join>`: attributes kept in a secondary table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmJoin {
    pub table: String,
    pub schema: Option<String>,
    pub catalog: Option<String>,
    pub fetch: String,
    pub inverse: bool,
    pub optional: bool,
    pub key: Option<HbmKey>,
    pub attributes: Vec<HbmAttribute>,
    pub sql_insert: Option<HbmCustomSql>,
    pub sql_update: Option<HbmCustomSql>,
    pub sql_delete: Option<HbmCustomSql>,
}

impl HbmJoin {
    fn from_raw(raw: &RawElement) -> Self {
        HbmJoin {
            table: raw.attr_string("table").unwrap_or_default(),
            schema: raw.attr_string("schema"),
            catalog: raw.attr_string("catalog"),
            fetch: raw.attr_string("fetch").unwrap_or_else(|| "join".to_string()),
            inverse: raw.attr_bool("inverse").unwrap_or(false),
            optional: raw.attr_bool("optional").unwrap_or(false),
            key: raw.child("key").map(HbmKey::from_raw),
            attributes: attributes(raw),
            sql_insert: custom_sql(raw, "sql-insert"),
            sql_update: custom_sql(raw, "sql-update"),
            sql_delete: custom_sql(raw, "sql-delete"),
        }
    }
}

// ============================================================================
// Subclasses
// ============================================================================

/// Inheritance strategy of a subclass mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubclassKind {
    /// `<subclass>`: single table with discriminator
    Discriminated,
    /// `<joined-subclass>`
    Joined,
    /// `<union-subclass>`
    Union,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmSubclass {
    pub kind: SubclassKind,
    pub name: Option<String>,
    pub entity_name: Option<String>,
    pub proxy: Option<String>,
    pub extends: Option<String>,
    pub table: Option<String>,
    pub schema: Option<String>,
    pub catalog: Option<String>,
    pub discriminator_value: Option<String>,
    pub lazy: Option<bool>,
    pub is_abstract: Option<bool>,
    pub metas: Vec<HbmMeta>,
    pub key: Option<HbmKey>,
    pub attributes: Vec<HbmAttribute>,
    pub joins: Vec<HbmJoin>,
    pub subclasses: Vec<HbmSubclass>,
    pub sql_insert: Option<HbmCustomSql>,
    pub sql_update: Option<HbmCustomSql>,
    pub sql_delete: Option<HbmCustomSql>,
    pub queries: Vec<HbmQuery>,
}

impl HbmSubclass {
    fn from_raw(raw: &RawElement) -> Option<Self> {
        let kind = match raw.name {
            "subclass" => SubclassKind::Discriminated,
            "joined-subclass" => SubclassKind::Joined,
            "union-subclass" => SubclassKind::Union,
            _ => return None,
        };
        Some(HbmSubclass {
            kind,
            name: raw.attr_string("name"),
            entity_name: raw.attr_string("entity-name"),
            proxy: raw.attr_string("proxy"),
            extends: raw.attr_string("extends"),
            table: raw.attr_string("table"),
            schema: raw.attr_string("schema"),
            catalog: raw.attr_string("catalog"),
            discriminator_value: raw.attr_string("discriminator-value"),
            lazy: raw.attr_bool("lazy"),
            is_abstract: raw.attr_bool("abstract"),
            metas: metas(raw),
            key: raw.child("key").map(HbmKey::from_raw),
            attributes: attributes(raw),
            joins: raw.children_named("join").map(HbmJoin::from_raw).collect(),
            subclasses: subclasses(raw),
            sql_insert: custom_sql(raw, "sql-insert"),
            sql_update: custom_sql(raw, "sql-update"),
            sql_delete: custom_sql(raw, "sql-delete"),
            queries: queries(raw),
        })
    }
}

fn subclasses(raw: &RawElement) -> Vec<HbmSubclass> {
    raw.children.iter().filter_map(HbmSubclass::from_raw).collect()
}

// ============================================================================
// Attributes
// ============================================================================

/// A mapped attribute, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HbmAttribute {
    Property(HbmProperty),
    ManyToOne(HbmManyToOne),
    OneToOne(HbmOneToOne),
    Component(HbmComponent),
    /// `<dynamic-component>`: a component backed by a map
    DynamicComponent(HbmComponent),
    /// `<properties>`: a named grouping, usually a unique key
    Properties(HbmProperties),
    Any(HbmAny),
    Collection(HbmCollection),
}

impl HbmAttribute {
    /// Attribute name
    pub fn name(&self) -> &str {
        match self {
            HbmAttribute::Property(p) => &p.name,
            HbmAttribute::ManyToOne(m) => &m.name,
            HbmAttribute::OneToOne(o) => &o.name,
            HbmAttribute::Component(c) | HbmAttribute::DynamicComponent(c) => &c.name,
            HbmAttribute::Properties(p) => &p.name,
            HbmAttribute::Any(a) => &a.name,
            HbmAttribute::Collection(c) => &c.name,
        }
    }

    fn from_raw(raw: &RawElement) -> Option<Self> {
        let attribute = match raw.name {
            "property" => HbmAttribute::Property(HbmProperty {
                name: raw.attr_string("name").unwrap_or_default(),
                type_name: type_name(raw),
                type_params: raw.child("type").map(params).unwrap_or_default(),
                columns: columns(raw),
                not_null: raw.attr_bool("not-null"),
                unique: raw.attr_bool("unique"),
                insert: raw.attr_bool("insert"),
                update: raw.attr_bool("update"),
                lazy: raw.attr_bool("lazy").unwrap_or(false),
                optimistic_lock: raw.attr_bool("optimistic-lock").unwrap_or(true),
                generated: raw.attr_string("generated").unwrap_or_else(|| "never".to_string()),
                formula: attr_or_child(raw, "formula"),
                access: raw.attr_string("access"),
                metas: metas(raw),
            }),
            "many-to-one" => HbmAttribute::ManyToOne(HbmManyToOne {
                name: raw.attr_string("name").unwrap_or_default(),
                class: raw.attr_string("class"),
                entity_name: raw.attr_string("entity-name"),
                columns: columns(raw),
                formula: attr_or_child(raw, "formula"),
                cascade: raw.attr_string("cascade"),
                fetch: raw.attr_string("fetch"),
                lazy: raw.attr_string("lazy"),
                not_null: raw.attr_bool("not-null"),
                unique: raw.attr_bool("unique").unwrap_or(false),
                insert: raw.attr_bool("insert").unwrap_or(true),
                update: raw.attr_bool("update").unwrap_or(true),
                property_ref: raw.attr_string("property-ref"),
                not_found: raw.attr_string("not-found").unwrap_or_else(|| "exception".to_string()),
                foreign_key: raw.attr_string("foreign-key"),
                access: raw.attr_string("access"),
                metas: metas(raw),
            }),
            "one-to-one" => HbmAttribute::OneToOne(HbmOneToOne {
                name: raw.attr_string("name").unwrap_or_default(),
                class: raw.attr_string("class"),
                entity_name: raw.attr_string("entity-name"),
                cascade: raw.attr_string("cascade"),
                constrained: raw.attr_bool("constrained").unwrap_or(false),
                property_ref: raw.attr_string("property-ref"),
                formula: attr_or_child(raw, "formula"),
                foreign_key: raw.attr_string("foreign-key"),
            }),
            "component" => HbmAttribute::Component(HbmComponent::from_raw(raw)),
            "dynamic-component" => HbmAttribute::DynamicComponent(HbmComponent::from_raw(raw)),
            "properties" => HbmAttribute::Properties(HbmProperties {
                name: raw.attr_string("name").unwrap_or_default(),
                unique: raw.attr_bool("unique").unwrap_or(false),
                insert: raw.attr_bool("insert").unwrap_or(true),
                update: raw.attr_bool("update").unwrap_or(true),
                attributes: attributes(raw),
            }),
            "any" => HbmAttribute::Any(HbmAny {
                name: raw.attr_string("name").unwrap_or_default(),
                id_type: raw.attr_string("id-type").unwrap_or_default(),
                meta_type: raw.attr_string("meta-type").unwrap_or_else(|| "string".to_string()),
                meta_values: meta_values(raw),
                columns: columns(raw),
                cascade: raw.attr_string("cascade"),
                lazy: raw.attr_bool("lazy").unwrap_or(false),
                access: raw.attr_string("access"),
            }),
            _ => HbmAttribute::Collection(HbmCollection::from_raw(raw)?),
        };
        Some(attribute)
    }
}

fn attributes(raw: &RawElement) -> Vec<HbmAttribute> {
    raw.children.iter().filter_map(HbmAttribute::from_raw).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmProperty {
    pub name: String,
    pub type_name: Option<String>,
    pub type_params: Vec<HbmParam>,
    pub columns: Vec<HbmColumn>,
    pub not_null: Option<bool>,
    pub unique: Option<bool>,
    pub insert: Option<bool>,
    pub update: Option<bool>,
    pub lazy: bool,
    pub optimistic_lock: bool,
    pub generated: String,
    pub formula: Option<String>,
    pub access: Option<String>,
    pub metas: Vec<HbmMeta>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmManyToOne {
    pub name: String,
    pub class: Option<String>,
    pub entity_name: Option<String>,
    pub columns: Vec<HbmColumn>,
    pub formula: Option<String>,
    pub cascade: Option<String>,
    pub fetch: Option<String>,
    pub lazy: Option<String>,
    pub not_null: Option<bool>,
    pub unique: bool,
    pub insert: bool,
    pub update: bool,
    pub property_ref: Option<String>,
    /// `exception` or `ignore`
    pub not_found: String,
    pub foreign_key: Option<String>,
    pub access: Option<String>,
    pub metas: Vec<HbmMeta>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmOneToOne {
    pub name: String,
    pub class: Option<String>,
    pub entity_name: Option<String>,
    pub cascade: Option<String>,
    pub constrained: bool,
    pub property_ref: Option<String>,
    pub formula: Option<String>,
    pub foreign_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmComponent {
    pub name: String,
    /// Always absent for a dynamic component
    pub class: Option<String>,
    pub access: Option<String>,
    pub unique: bool,
    pub insert: bool,
    pub update: bool,
    /// Back-reference property from `<parent>`
    pub parent: Option<String>,
    pub metas: Vec<HbmMeta>,
    pub attributes: Vec<HbmAttribute>,
}

impl HbmComponent {
    fn from_raw(raw: &RawElement) -> Self {
        HbmComponent {
            name: raw.attr_string("name").unwrap_or_default(),
            class: raw.attr_string("class"),
            access: raw.attr_string("access"),
            unique: raw.attr_bool("unique").unwrap_or(false),
            insert: raw.attr_bool("insert").unwrap_or(true),
            update: raw.attr_bool("update").unwrap_or(true),
            parent: raw.child("parent").and_then(|p| p.attr_string("name")),
            metas: metas(raw),
            attributes: attributes(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmProperties {
    pub name: String,
    pub unique: bool,
    pub insert: bool,
    pub update: bool,
    pub attributes: Vec<HbmAttribute>,
}

/// Discriminator value mapped to an entity class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmMetaValue {
    pub value: String,
    pub class: String,
}

fn meta_values(raw: &RawElement) -> Vec<HbmMetaValue> {
    raw.children_named("meta-value")
        .map(|meta| HbmMetaValue {
            value: meta.attr_string("value").unwrap_or_default(),
            class: meta.attr_string("class").unwrap_or_default(),
        })
        .collect()
}

/// `<any>`: polymorphic reference to one of several entities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmAny {
    pub name: String,
    pub id_type: String,
    pub meta_type: String,
    pub meta_values: Vec<HbmMetaValue>,
    /// Discriminator column first, then the identifier columns
    pub columns: Vec<HbmColumn>,
    pub cascade: Option<String>,
    pub lazy: bool,
    pub access: Option<String>,
}

// ============================================================================
// Collections
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Set,
    Bag,
    IdBag,
    List,
    Map,
    Array,
    PrimitiveArray,
}

impl CollectionKind {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "set" => CollectionKind::Set,
            "bag" => CollectionKind::Bag,
            "idbag" => CollectionKind::IdBag,
            "list" => CollectionKind::List,
            "map" => CollectionKind::Map,
            "array" => CollectionKind::Array,
            "primitive-array" => CollectionKind::PrimitiveArray,
            _ => return None,
        })
    }

    /// Whether elements are addressed by position
    pub fn is_positional(self) -> bool {
        matches!(
            self,
            CollectionKind::List | CollectionKind::Array | CollectionKind::PrimitiveArray
        )
    }
}

/// Foreign key of a collection, join or joined subclass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmKey {
    pub columns: Vec<HbmColumn>,
    pub property_ref: Option<String>,
    pub foreign_key: Option<String>,
    pub on_delete: String,
}

impl HbmKey {
    fn from_raw(raw: &RawElement) -> Self {
        HbmKey {
            columns: columns(raw),
            property_ref: raw.attr_string("property-ref"),
            foreign_key: raw.attr_string("foreign-key"),
            on_delete: raw.attr_string("on-delete").unwrap_or_else(|| "noaction".to_string()),
        }
    }
}

/// Surrogate key of an `<idbag>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmCollectionId {
    pub type_name: String,
    pub columns: Vec<HbmColumn>,
    pub generator: Option<HbmGenerator>,
}

/// Index of a list or array, or key of a map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HbmCollectionIndex {
    /// `<list-index>` / `<index>`: positional column
    Column { columns: Vec<HbmColumn>, base: u32 },
    /// `<map-key>`: basic-typed key
    MapKey {
        type_name: Option<String>,
        columns: Vec<HbmColumn>,
        formula: Option<String>,
    },
    /// `<composite-map-key>`
    Composite { class: String, keys: Vec<HbmKeyPart> },
    /// `<map-key-many-to-many>`: entity-typed key
    ManyToMany { class: Option<String>, columns: Vec<HbmColumn> },
    /// `<index-many-to-any>`
    ManyToAny {
        id_type: String,
        meta_type: String,
        columns: Vec<HbmColumn>,
    },
}

/// `<composite-element>` or `<nested-composite-element>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmCompositeElement {
    /// Set only on nested elements
    pub name: Option<String>,
    pub class: String,
    pub parent: Option<String>,
    pub attributes: Vec<HbmAttribute>,
    pub nested: Vec<HbmCompositeElement>,
}

impl HbmCompositeElement {
    fn from_raw(raw: &RawElement) -> Self {
        HbmCompositeElement {
            name: raw.attr_string("name"),
            class: raw.attr_string("class").unwrap_or_default(),
            parent: raw.child("parent").and_then(|p| p.attr_string("name")),
            attributes: attributes(raw),
            nested: raw
                .children_named("nested-composite-element")
                .map(HbmCompositeElement::from_raw)
                .collect(),
        }
    }
}

/// What a collection holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HbmCollectionElement {
    Basic {
        type_name: Option<String>,
        columns: Vec<HbmColumn>,
        formula: Option<String>,
    },
    OneToMany { class: Option<String> },
    ManyToMany { class: Option<String>, columns: Vec<HbmColumn> },
    Composite(HbmCompositeElement),
    ManyToAny {
        id_type: String,
        meta_type: String,
        meta_values: Vec<HbmMetaValue>,
        columns: Vec<HbmColumn>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbmCollection {
    pub kind: CollectionKind,
    pub name: String,
    pub access: Option<String>,
    pub table: Option<String>,
    pub schema: Option<String>,
    pub catalog: Option<String>,
    pub subselect: Option<String>,
    pub inverse: bool,
    pub mutable: bool,
    pub lazy: Option<String>,
    pub cascade: Option<String>,
    pub order_by: Option<String>,
    pub where_clause: Option<String>,
    pub fetch: Option<String>,
    pub batch_size: Option<u32>,
    pub sort: Option<String>,
    /// Component type of an `<array>`
    pub element_class: Option<String>,
    pub metas: Vec<HbmMeta>,
    pub cache: Option<HbmCache>,
    pub collection_id: Option<HbmCollectionId>,
    pub key: Option<HbmKey>,
    pub index: Option<HbmCollectionIndex>,
    pub element: Option<HbmCollectionElement>,
    pub filters: Vec<HbmFilter>,
    pub loader: Option<String>,
    pub sql_insert: Option<HbmCustomSql>,
    pub sql_update: Option<HbmCustomSql>,
    pub sql_delete: Option<HbmCustomSql>,
    pub sql_delete_all: Option<HbmCustomSql>,
}

impl HbmCollection {
    fn from_raw(raw: &RawElement) -> Option<Self> {
        let kind = CollectionKind::from_name(raw.name)?;

        let mut index = None;
        let mut element = None;
        for child in &raw.children {
            match child.name {
                "list-index" | "index" if kind.is_positional() => {
                    index = Some(HbmCollectionIndex::Column {
                        columns: columns(child),
                        base: child.attr_u32("base").unwrap_or(0),
                    });
                }
                "map-key" | "index" => {
                    index = Some(HbmCollectionIndex::MapKey {
                        type_name: type_name(child),
                        columns: columns(child),
                        formula: attr_or_child(child, "formula"),
                    });
                }
                "composite-map-key" => {
                    index = Some(HbmCollectionIndex::Composite {
                        class: child.attr_string("class").unwrap_or_default(),
                        keys: key_parts(child),
                    });
                }
                "map-key-many-to-many" => {
                    index = Some(HbmCollectionIndex::ManyToMany {
                        class: child.attr_string("class"),
                        columns: columns(child),
                    });
                }
                "index-many-to-any" => {
                    index = Some(HbmCollectionIndex::ManyToAny {
                        id_type: child.attr_string("id-type").unwrap_or_default(),
                        meta_type: child.attr_string("meta-type").unwrap_or_else(|| "string".to_string()),
                        columns: columns(child),
                    });
                }
                "element" => {
                    element = Some(HbmCollectionElement::Basic {
                        type_name: type_name(child),
                        columns: columns(child),
                        formula: attr_or_child(child, "formula"),
                    });
                }
                "one-to-many" => {
                    element = Some(HbmCollectionElement::OneToMany {
                        class: child.attr_string("class"),
                    });
                }
                "many-to-many" => {
                    element = Some(HbmCollectionElement::ManyToMany {
                        class: child.attr_string("class"),
                        columns: columns(child),
                    });
                }
                "composite-element" => {
                    element = Some(HbmCollectionElement::Composite(HbmCompositeElement::from_raw(child)));
                }
                "many-to-any" => {
                    element = Some(HbmCollectionElement::ManyToAny {
                        id_type: child.attr_string("id-type").unwrap_or_default(),
                        meta_type: child.attr_string("meta-type").unwrap_or_else(|| "string".to_string()),
                        meta_values: meta_values(child),
                        columns: columns(child),
                    });
                }
                _ => {}
            }
        }

        Some(HbmCollection {
            kind,
            name: raw.attr_string("name").unwrap_or_default(),
            access: raw.attr_string("access"),
            table: raw.attr_string("table"),
            schema: raw.attr_string("schema"),
            catalog: raw.attr_string("catalog"),
            subselect: attr_or_child(raw, "subselect"),
            inverse: raw.attr_bool("inverse").unwrap_or(false),
            mutable: raw.attr_bool("mutable").unwrap_or(true),
            lazy: raw.attr_string("lazy"),
            cascade: raw.attr_string("cascade"),
            order_by: raw.attr_string("order-by"),
            where_clause: raw.attr_string("where"),
            fetch: raw.attr_string("fetch"),
            batch_size: raw.attr_u32("batch-size"),
            sort: raw.attr_string("sort"),
            element_class: raw.attr_string("element-class"),
            metas: metas(raw),
            cache: raw.child("cache").map(HbmCache::from_raw),
            collection_id: raw.child("collection-id").map(|id| HbmCollectionId {
                type_name: id.attr_string("type").unwrap_or_default(),
                columns: columns(id),
                generator: generator(id),
            }),
            key: raw.child("key").map(HbmKey::from_raw),
            index,
            element,
            filters: filters(raw),
            loader: loader(raw),
            sql_insert: custom_sql(raw, "sql-insert"),
            sql_update: custom_sql(raw, "sql-update"),
            sql_delete: custom_sql(raw, "sql-delete"),
            sql_delete_all: custom_sql(raw, "sql-delete-all"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hbm::context::HbmBindingContext;
    use crate::reader::hbm::HbmTokenReader;
    use crate::reader::stream::XmlTokenReader;

    fn bind(xml: &str) -> HbmMapping {
        let context = HbmBindingContext::compile().unwrap();
        let raw = context
            .bind_tree(HbmTokenReader::new(XmlTokenReader::from_bytes(xml.as_bytes())), true)
            .unwrap();
        HbmMapping::from_raw(&raw)
    }

    const ORDER: &str = r#"<hibernate-mapping package="com.acme" default-lazy="false">
        <typedef name="money" class="com.acme.MoneyType"><param name="currency">EUR</param></typedef>
        <import class="com.acme.Order" rename="PurchaseOrder"/>
        <class name="Order" table="ORDERS">
            <id name="id" column="ORDER_ID" type="long">
                <generator class="sequence"><param name="sequence_name">order_seq</param></generator>
            </id>
            <version name="revision"/>
            <property name="total" type="money"><column name="TOTAL" not-null="true"/></property>
            <many-to-one name="customer" class="Customer" column="CUSTOMER_ID"/>
            <component name="address" class="Address">
                <property name="city"/>
            </component>
            <list name="lines" inverse="true">
                <key column="ORDER_ID"/>
                <list-index column="POS"/>
                <one-to-many class="OrderLine"/>
            </list>
            <map name="notes">
                <key column="ORDER_ID"/>
                <composite-index class="NoteKey"/>
                <element type="string" column="NOTE"/>
            </map>
            <subclass name="RushOrder" discriminator-value="R"/>
        </class>
        <joined-subclass name="GiftOrder" extends="Order" table="GIFT_ORDERS">
            <key column="ORDER_ID"/>
        </joined-subclass>
        <query name="openOrders">from Order o where o.open = true</query>
    </hibernate-mapping>"#;

    #[test]
    fn test_mapping_root() {
        let mapping = bind(ORDER);
        assert_eq!(mapping.package.as_deref(), Some("com.acme"));
        assert_eq!(mapping.default_access, "property");
        assert_eq!(mapping.default_cascade, "none");
        assert!(!mapping.default_lazy);
        assert!(mapping.auto_import);
        assert_eq!(mapping.imports[0].rename.as_deref(), Some("PurchaseOrder"));
        assert_eq!(
            mapping.type_defs[0].params,
            vec![HbmParam {
                name: "currency".to_string(),
                value: "EUR".to_string()
            }]
        );
        assert_eq!(mapping.queries[0].query, "from Order o where o.open = true");
        assert!(!mapping.queries[0].native);
    }

    #[test]
    fn test_class_identity_and_version() {
        let mapping = bind(ORDER);
        let order = mapping.find_class("com.acme.Order").unwrap();
        assert_eq!(order.table.as_deref(), Some("ORDERS"));
        assert!(order.mutable);

        let id = order.id.as_ref().unwrap();
        assert_eq!(id.columns[0].name, "ORDER_ID");
        let generator = id.generator.as_ref().unwrap();
        assert_eq!(generator.class, "sequence");
        assert_eq!(generator.params[0].value, "order_seq");

        let version = order.version.as_ref().unwrap();
        assert_eq!(version.name, "revision");
        assert_eq!(version.type_name, "integer");
    }

    #[test]
    fn test_attributes_in_order() {
        let mapping = bind(ORDER);
        let order = &mapping.classes[0];
        let names: Vec<_> = order.attributes.iter().map(HbmAttribute::name).collect();
        assert_eq!(names, vec!["total", "customer", "address", "lines", "notes"]);

        match &order.attributes[0] {
            HbmAttribute::Property(total) => {
                assert_eq!(total.columns[0].not_null, Some(true));
                assert_eq!(total.type_name.as_deref(), Some("money"));
            }
            other => panic!("unexpected attribute {:?}", other),
        }
        match &order.attributes[2] {
            HbmAttribute::Component(address) => assert_eq!(address.attributes.len(), 1),
            other => panic!("unexpected attribute {:?}", other),
        }
    }

    #[test]
    fn test_collections() {
        let mapping = bind(ORDER);
        let order = &mapping.classes[0];
        let HbmAttribute::Collection(lines) = &order.attributes[3] else {
            panic!("lines is not a collection");
        };
        assert_eq!(lines.kind, CollectionKind::List);
        assert!(lines.inverse);
        assert!(matches!(lines.index, Some(HbmCollectionIndex::Column { base: 0, .. })));
        assert_eq!(
            lines.element,
            Some(HbmCollectionElement::OneToMany {
                class: Some("OrderLine".to_string())
            })
        );

        let HbmAttribute::Collection(notes) = &order.attributes[4] else {
            panic!("notes is not a collection");
        };
        assert_eq!(
            notes.index,
            Some(HbmCollectionIndex::Composite {
                class: "NoteKey".to_string(),
                keys: Vec::new(),
            })
        );
    }

    #[test]
    fn test_subclasses() {
        let mapping = bind(ORDER);
        let nested = &mapping.classes[0].subclasses[0];
        assert_eq!(nested.kind, SubclassKind::Discriminated);
        assert_eq!(nested.discriminator_value.as_deref(), Some("R"));

        let top = &mapping.subclasses[0];
        assert_eq!(top.kind, SubclassKind::Joined);
        assert_eq!(top.extends.as_deref(), Some("Order"));
        assert_eq!(top.key.as_ref().unwrap().columns[0].name, "ORDER_ID");
    }

    const LEGACY: &str = r#"<hibernate-mapping package="com.acme">
        <meta attribute="generated-by">audit-tool</meta>
        <filter-def name="tenant" condition="TENANT_ID = :tenant">
            <filter-param name="tenant" type="string"/>
        </filter-def>
        <class name="LineItem" table="LINE_ITEMS" polymorphism="explicit" optimistic-lock="all" proxy="LineItem">
            <meta attribute="scope-class" inherit="false">public</meta>
            <composite-id name="key" class="LineItemKey">
                <key-property name="lineNo" column="LINE_NO" type="integer"/>
                <key-many-to-one name="order" class="Order" column="ORDER_ID"/>
            </composite-id>
            <natural-id mutable="true">
                <property name="sku" column="SKU"/>
            </natural-id>
            <timestamp name="updated" column="UPDATED_AT" source="db"/>
            <property name="price" column="PRICE" precision="12" scale="2"/>
            <many-to-one name="product" class="Product" not-found="ignore" property-ref="sku" formula="SKU"/>
            <dynamic-component name="extras">
                <property name="colour" type="string"/>
            </dynamic-component>
            <properties name="skuKey" unique="true">
                <property name="vendor"/>
            </properties>
            <any name="owner" id-type="long" meta-type="string">
                <meta-value value="C" class="Customer"/>
                <column name="OWNER_TYPE"/>
                <column name="OWNER_ID"/>
            </any>
            <idbag name="tags" table="LINE_TAGS">
                <collection-id column="TAG_ID" type="long"><generator class="increment"/></collection-id>
                <key column="LINE_ID"/>
                <element column="TAG" type="string"/>
            </idbag>
            <array name="discounts" element-class="Discount">
                <key column="LINE_ID"/>
                <list-index column="POS" base="1"/>
                <composite-element class="Discount">
                    <parent name="line"/>
                    <property name="percent"/>
                </composite-element>
            </array>
            <primitive-array name="weights">
                <key column="LINE_ID"/>
                <index column="POS"/>
                <element column="WEIGHT" type="double"/>
            </primitive-array>
            <join table="LINE_NOTES" optional="true">
                <key column="LINE_ID"/>
                <property name="note"/>
            </join>
            <sql-insert callable="true">{call insert_line(?, ?)}</sql-insert>
            <filter name="tenant"/>
        </class>
        <resultset name="lineRows">
            <return alias="l" class="LineItem">
                <return-property name="price" column="PRICE"/>
            </return>
            <return-scalar column="TOTAL" type="big_decimal"/>
        </resultset>
        <sql-query name="lines" resultset-ref="lineRows">select * from LINE_ITEMS<synchronize table="LINE_ITEMS"/></sql-query>
        <fetch-profile name="withProduct">
            <fetch entity="LineItem" association="product"/>
        </fetch-profile>
        <database-object>
            <create>create index LINE_SKU on LINE_ITEMS (SKU)</create>
            <drop>drop index LINE_SKU</drop>
            <dialect-scope name="org.hibernate.dialect.H2Dialect"/>
        </database-object>
    </hibernate-mapping>"#;

    #[test]
    fn test_composite_id_and_versioning() {
        let mapping = bind(LEGACY);
        let line = &mapping.classes[0];
        assert!(line.id.is_none());
        assert_eq!(line.polymorphism, "explicit");
        assert_eq!(line.optimistic_lock, "all");
        assert_eq!(line.proxy.as_deref(), Some("LineItem"));

        let key = line.composite_id.as_ref().unwrap();
        assert_eq!(key.class.as_deref(), Some("LineItemKey"));
        assert_eq!(key.unsaved_value, "undefined");
        assert_eq!(key.keys.len(), 2);
        assert!(matches!(&key.keys[0], HbmKeyPart::Property { name, columns, .. }
            if name == "lineNo" && columns[0].name == "LINE_NO"));
        assert!(matches!(&key.keys[1], HbmKeyPart::ManyToOne { class: Some(class), .. } if class == "Order"));

        let timestamp = line.timestamp.as_ref().unwrap();
        assert_eq!(timestamp.source, "db");
        assert_eq!(timestamp.generated, "never");
        assert_eq!(timestamp.columns[0].name, "UPDATED_AT");

        let natural = line.natural_id.as_ref().unwrap();
        assert!(natural.mutable);
        assert_eq!(natural.attributes[0].name(), "sku");
    }

    #[test]
    fn test_meta_and_filters() {
        let mapping = bind(LEGACY);
        assert_eq!(
            mapping.metas,
            vec![HbmMeta {
                attribute: "generated-by".to_string(),
                value: "audit-tool".to_string(),
                inherit: true,
            }]
        );
        let line = &mapping.classes[0];
        assert!(!line.metas[0].inherit);

        let tenant = &mapping.filter_defs[0];
        assert_eq!(tenant.condition.as_deref(), Some("TENANT_ID = :tenant"));
        assert_eq!(tenant.params[0].type_name, "string");
        assert_eq!(line.filters[0].name, "tenant");
        assert!(line.filters[0].auto_alias_injection);
        assert!(line.filters[0].condition.is_none());

        let insert = line.sql_insert.as_ref().unwrap();
        assert!(insert.callable);
        assert_eq!(insert.sql, "{call insert_line(?, ?)}");
    }

    #[test]
    fn test_extended_attributes() {
        let mapping = bind(LEGACY);
        let line = &mapping.classes[0];
        let names: Vec<_> = line.attributes.iter().map(HbmAttribute::name).collect();
        assert_eq!(
            names,
            vec!["price", "product", "extras", "skuKey", "owner", "tags", "discounts", "weights"]
        );

        let HbmAttribute::Property(price) = &line.attributes[0] else {
            panic!("price is not a property");
        };
        assert_eq!(price.columns[0].precision, Some(12));
        assert_eq!(price.columns[0].scale, Some(2));

        let HbmAttribute::ManyToOne(product) = &line.attributes[1] else {
            panic!("product is not a many-to-one");
        };
        assert_eq!(product.not_found, "ignore");
        assert_eq!(product.property_ref.as_deref(), Some("sku"));
        assert_eq!(product.formula.as_deref(), Some("SKU"));

        assert!(matches!(&line.attributes[2], HbmAttribute::DynamicComponent(c) if c.class.is_none()));
        assert!(matches!(&line.attributes[3], HbmAttribute::Properties(p) if p.unique));

        let HbmAttribute::Any(owner) = &line.attributes[4] else {
            panic!("owner is not an any");
        };
        assert_eq!(owner.id_type, "long");
        assert_eq!(owner.meta_values[0].class, "Customer");
        assert_eq!(owner.columns.len(), 2);
    }

    #[test]
    fn test_extended_collections() {
        let mapping = bind(LEGACY);
        let line = &mapping.classes[0];

        let HbmAttribute::Collection(tags) = &line.attributes[5] else {
            panic!("tags is not a collection");
        };
        assert_eq!(tags.kind, CollectionKind::IdBag);
        let id = tags.collection_id.as_ref().unwrap();
        assert_eq!(id.columns[0].name, "TAG_ID");
        assert_eq!(id.generator.as_ref().unwrap().class, "increment");

        let HbmAttribute::Collection(discounts) = &line.attributes[6] else {
            panic!("discounts is not a collection");
        };
        assert_eq!(discounts.kind, CollectionKind::Array);
        assert_eq!(discounts.element_class.as_deref(), Some("Discount"));
        assert!(matches!(discounts.index, Some(HbmCollectionIndex::Column { base: 1, .. })));
        let Some(HbmCollectionElement::Composite(discount)) = &discounts.element else {
            panic!("discounts do not hold composite elements");
        };
        assert_eq!(discount.parent.as_deref(), Some("line"));
        assert_eq!(discount.attributes[0].name(), "percent");

        let HbmAttribute::Collection(weights) = &line.attributes[7] else {
            panic!("weights is not a collection");
        };
        assert_eq!(weights.kind, CollectionKind::PrimitiveArray);
        assert!(matches!(weights.index, Some(HbmCollectionIndex::Column { base: 0, .. })));
    }

    #[test]
    fn test_joins_and_document_level_extras() {
        let mapping = bind(LEGACY);
        let join = &mapping.classes[0].joins[0];
        assert_eq!(join.table, "LINE_NOTES");
        assert!(join.optional);
        assert_eq!(join.fetch, "join");
        assert_eq!(join.attributes[0].name(), "note");

        let rows = &mapping.result_sets[0];
        assert!(matches!(&rows.returns[0], HbmReturn::Entity { alias: Some(alias), properties, .. }
            if alias == "l" && properties[0].columns == vec!["PRICE".to_string()]));
        assert!(matches!(&rows.returns[1], HbmReturn::Scalar { column, .. } if column == "TOTAL"));

        let query = &mapping.queries[0];
        assert!(query.native);
        assert_eq!(query.query, "select * from LINE_ITEMS");
        assert_eq!(query.result_set_ref.as_deref(), Some("lineRows"));
        assert_eq!(query.synchronized_tables, vec!["LINE_ITEMS".to_string()]);

        let profile = &mapping.fetch_profiles[0];
        assert_eq!(profile.fetches[0].association, "product");
        assert_eq!(profile.fetches[0].style, "join");

        let object = &mapping.database_objects[0];
        assert_eq!(object.drop.as_deref(), Some("drop index LINE_SKU"));
        assert_eq!(object.dialect_scopes, vec!["org.hibernate.dialect.H2Dialect".to_string()]);
        assert!(object.definition.is_none());
    }
}
