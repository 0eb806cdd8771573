//! Layered Mapping Defaults
//!
//! A `MappingDefault` is a patch: every field is optional and applying one
//! patch onto another copies only the fields it sets. The override context
//! layers them global < mapping unit < class.

use std::fmt;

use crate::error::{Error, Result};

/// How the persistence provider reaches mapped state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessType {
    Field,
    Property,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Field => "FIELD",
            AccessType::Property => "PROPERTY",
        }
    }

    /// Parse an access value as written in a mapping document
    ///
    /// Empty values mean "not set". Anything other than `FIELD` or
    /// `PROPERTY` is rejected, naming `context` in the error.
    pub fn parse(value: &str, context: &str) -> Result<Option<AccessType>> {
        match value {
            "" => Ok(None),
            "FIELD" => Ok(Some(AccessType::Field)),
            "PROPERTY" => Ok(Some(AccessType::Property)),
            other => Err(Error::InvalidAccessType {
                value: other.to_string(),
                context: context.to_string(),
            }),
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default values patch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingDefault {
    pub access: Option<AccessType>,
    pub package_name: Option<String>,
    pub schema: Option<String>,
    pub catalog: Option<String>,
    pub metadata_complete: Option<bool>,
    pub cascade_persist: Option<bool>,
    pub delimited_identifiers: Option<bool>,
}

impl MappingDefault {
    /// Apply every field `other` sets onto `self`; unset fields leave `self` untouched
    pub fn override_with(&mut self, other: Option<&MappingDefault>) {
        let Some(other) = other else {
            return;
        };
        if other.access.is_some() {
            self.access = other.access;
        }
        if other.package_name.is_some() {
            self.package_name.clone_from(&other.package_name);
        }
        if other.schema.is_some() {
            self.schema.clone_from(&other.schema);
        }
        if other.catalog.is_some() {
            self.catalog.clone_from(&other.catalog);
        }
        if other.delimited_identifiers.is_some() {
            self.delimited_identifiers = other.delimited_identifiers;
        }
        if other.metadata_complete.is_some() {
            self.metadata_complete = other.metadata_complete;
        }
        if other.cascade_persist.is_some() {
            self.cascade_persist = other.cascade_persist;
        }
    }

    /// Builder form of `override_with`
    pub fn overridden_by(mut self, other: &MappingDefault) -> Self {
        self.override_with(Some(other));
        self
    }

    /// Annotations may be consulted unless the mapping is declared complete
    pub fn can_use_annotations(&self) -> bool {
        self.metadata_complete != Some(true)
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        *self == MappingDefault::default()
    }
}
