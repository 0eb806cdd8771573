//! Attribute Converter Resolution
//!
//! Converter classes named in mapping documents are resolved through a
//! `ClassLoader`, the seam to whatever class-loading service the host
//! provides. `ClassRegistry` is an in-memory implementation.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ConverterFailure, Error, Result};

/// An instantiated converter, opaque to this crate
pub type ConverterInstance = Arc<dyn Any + Send + Sync>;

/// Failure reported by a class loader
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassLoadingError {
    #[error("class {0} not found")]
    NotFound(String),
    #[error("{0}")]
    Other(String),
}

/// A class located by a `ClassLoader`
pub trait LoadedClass: Send + Sync {
    /// Fully qualified class name
    fn name(&self) -> &str;

    /// Create a new instance
    fn new_instance(&self) -> std::result::Result<ConverterInstance, String>;
}

/// Class-loading service
pub trait ClassLoader {
    fn load_class(&self, name: &str) -> std::result::Result<Arc<dyn LoadedClass>, ClassLoadingError>;
}

impl<L: ClassLoader + ?Sized> ClassLoader for &L {
    fn load_class(&self, name: &str) -> std::result::Result<Arc<dyn LoadedClass>, ClassLoadingError> {
        (**self).load_class(name)
    }
}

impl<L: ClassLoader + ?Sized> ClassLoader for Arc<L> {
    fn load_class(&self, name: &str) -> std::result::Result<Arc<dyn LoadedClass>, ClassLoadingError> {
        (**self).load_class(name)
    }
}

type Factory = Box<dyn Fn() -> std::result::Result<ConverterInstance, String> + Send + Sync>;

/// A class whose instances come from a constructor closure
pub struct FactoryClass {
    name: String,
    factory: Factory,
}

impl FactoryClass {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> std::result::Result<ConverterInstance, String> + Send + Sync + 'static,
    {
        FactoryClass {
            name: name.into(),
            factory: Box::new(factory),
        }
    }
}

impl LoadedClass for FactoryClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn new_instance(&self) -> std::result::Result<ConverterInstance, String> {
        (self.factory)()
    }
}

/// In-memory class loader keyed by fully qualified name
#[derive(Default)]
pub struct ClassRegistry {
    classes: HashMap<String, Arc<dyn LoadedClass>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class under its own name, replacing any previous one
    pub fn register(&mut self, class: Arc<dyn LoadedClass>) {
        self.classes.insert(class.name().to_string(), class);
    }

    /// Register a class built from a constructor closure
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> std::result::Result<ConverterInstance, String> + Send + Sync + 'static,
    {
        self.register(Arc::new(FactoryClass::new(name, factory)));
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassLoader for ClassRegistry {
    fn load_class(&self, name: &str) -> std::result::Result<Arc<dyn LoadedClass>, ClassLoadingError> {
        self.classes
            .get(name)
            .cloned()
            .ok_or_else(|| ClassLoadingError::NotFound(name.to_string()))
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A converter declared by a mapping document, ready for the metadata builder
#[derive(Clone)]
pub struct ConverterDescriptor {
    class_name: String,
    instance: ConverterInstance,
    auto_apply: bool,
}

impl ConverterDescriptor {
    pub fn new(class_name: impl Into<String>, instance: ConverterInstance, auto_apply: bool) -> Self {
        ConverterDescriptor {
            class_name: class_name.into(),
            instance,
            auto_apply,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn instance(&self) -> &ConverterInstance {
        &self.instance
    }

    /// Whether the converter applies to every attribute of its type
    pub fn auto_apply(&self) -> bool {
        self.auto_apply
    }
}

impl fmt::Debug for ConverterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterDescriptor")
            .field("class_name", &self.class_name)
            .field("auto_apply", &self.auto_apply)
            .finish_non_exhaustive()
    }
}

/// Locate and instantiate a converter class
pub fn resolve_converter<L: ClassLoader + ?Sized>(
    loader: &L,
    class_name: &str,
    auto_apply: bool,
) -> Result<ConverterDescriptor> {
    let class = loader
        .load_class(class_name)
        .map_err(|e| Error::ConverterResolution {
            class_name: class_name.to_string(),
            kind: ConverterFailure::Locate,
            reason: e.to_string(),
        })?;
    let instance = class
        .new_instance()
        .map_err(|reason| Error::ConverterResolution {
            class_name: class_name.to_string(),
            kind: ConverterFailure::Instantiate,
            reason,
        })?;
    Ok(ConverterDescriptor::new(class_name, instance, auto_apply))
}
