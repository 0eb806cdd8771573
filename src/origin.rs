//! Document Origin
//!
//! Diagnostic metadata describing where a mapping document came from.

use std::fmt;

/// Kind of source a document was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// Classpath-style resource
    Resource,
    /// File on disk
    File,
    /// URL
    Url,
    /// Raw input stream handed in by the caller
    InputStream,
    /// Generated by another subsystem
    Other,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Resource => "resource",
            SourceType::File => "file",
            SourceType::Url => "url",
            SourceType::InputStream => "input stream",
            SourceType::Other => "other",
        }
    }
}

/// Where a document came from; attached to every binding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    source_type: SourceType,
    name: String,
}

impl Origin {
    pub fn new(source_type: SourceType, name: impl Into<String>) -> Self {
        Origin {
            source_type,
            name: name.into(),
        }
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.source_type.as_str(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let origin = Origin::new(SourceType::Other, "generated");
        assert_eq!(origin.to_string(), "other(generated)");
        assert_eq!(origin.name(), "generated");
    }
}
