//! Hierarchical Mapping Binding
//!
//! Typed binding of hbm.xml documents:
//! - Context: the schema table, its compiled form and the unmarshaller
//! - Model: the typed mapping structures the unmarshaller produces

pub mod context;
pub mod model;

pub use context::{AttrKind, AttributeDecl, ElementDecl, HbmBindingContext, HBM_SCHEMA};
pub use model::{
    CollectionKind, HbmAny, HbmAttribute, HbmCache, HbmClass, HbmCollection, HbmCollectionElement,
    HbmCollectionId, HbmCollectionIndex, HbmColumn, HbmComponent, HbmCompositeElement, HbmCompositeId,
    HbmCustomSql, HbmDatabaseObject, HbmDiscriminator, HbmFetch, HbmFetchProfile, HbmFilter, HbmFilterDef,
    HbmFilterParam, HbmGenerator, HbmId, HbmIdentifierGenerator, HbmImport, HbmJoin, HbmKey, HbmKeyPart,
    HbmManyToOne, HbmMapping, HbmMeta, HbmMetaValue, HbmNaturalId, HbmOneToOne, HbmParam, HbmProperties,
    HbmProperty, HbmQuery, HbmResultSet, HbmReturn, HbmReturnProperty, HbmSubclass, HbmTimestamp,
    HbmTypeDef, HbmVersion, SubclassKind,
};
