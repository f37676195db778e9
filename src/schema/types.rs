//! Core schema type variants and their structural metadata
//!
//! Types are built once when metadata is loaded, wrapped in `Arc`, and
//! shared read-only by every reconcile and completion pass afterwards.
//! Structural queries that need to follow named references live on
//! [`crate::schema::SchemaRegistry`], which owns the name table.

use std::fmt;
use std::sync::Arc;

use crate::index::relaxed_names;

use super::values::ValueParser;

/// Shared handle to an immutable schema type.
pub type SchemaTypeRef = Arc<SchemaType>;

/// A schema shape.
///
/// `Ref` is a lazily-resolved named reference; it is what allows bean
/// types to refer to themselves (directly or through containers) without
/// the type graph needing interior mutability.
#[derive(Debug)]
pub enum SchemaType {
    Atomic(AtomicType),
    Bean(BeanType),
    Map {
        key: SchemaTypeRef,
        value: SchemaTypeRef,
    },
    Sequence {
        elem: SchemaTypeRef,
    },
    Union {
        alternatives: Vec<SchemaTypeRef>,
    },
    Ref(String),
}

impl SchemaType {
    pub fn atomic(name: impl Into<String>, parser: ValueParser) -> SchemaTypeRef {
        Arc::new(SchemaType::Atomic(AtomicType {
            name: name.into(),
            parser,
            hints: Vec::new(),
        }))
    }

    pub fn reference(name: impl Into<String>) -> SchemaTypeRef {
        Arc::new(SchemaType::Ref(name.into()))
    }

    /// Display name used in problem messages and hover text.
    pub fn type_name(&self) -> String {
        match self {
            SchemaType::Atomic(a) => a.name.clone(),
            SchemaType::Bean(b) => b.name.clone(),
            SchemaType::Map { key, value } => {
                format!("map<{},{}>", key.type_name(), value.type_name())
            }
            SchemaType::Sequence { elem } => format!("list<{}>", elem.type_name()),
            SchemaType::Union { alternatives } => {
                let names: Vec<String> = alternatives.iter().map(|a| a.type_name()).collect();
                format!("union<{}>", names.join(","))
            }
            SchemaType::Ref(name) => name.clone(),
        }
    }
}

/// Leaf type with an attached value grammar and optional static hints.
#[derive(Debug)]
pub struct AtomicType {
    pub name: String,
    pub parser: ValueParser,
    /// Enum-like value hints declared with the type itself.
    pub hints: Vec<StaticHint>,
}

/// Object/record shape: named, individually-typed sub-properties.
///
/// Property names are stored in canonical hyphenated form; rendering under
/// other conventions goes through [`BeanType::properties_map`].
#[derive(Debug)]
pub struct BeanType {
    pub name: String,
    pub properties: Vec<TypedProperty>,
}

impl BeanType {
    /// Look up a declared property under relaxed-name rules: the segment as
    /// typed, its camelCase→hyphen form, and its snake_case→hyphen form are
    /// tried in order against the canonical property names.
    pub fn property(&self, segment: &str) -> Option<&TypedProperty> {
        for alias in relaxed_names::segment_aliases(segment) {
            if let Some(p) = self.properties.iter().find(|p| p.name == alias) {
                return Some(p);
            }
        }
        None
    }

    /// Declared properties keyed by name rendered under `mode`.
    ///
    /// Iteration order follows declaration order.
    pub fn properties_map(&self, mode: NameMode) -> Vec<(String, &TypedProperty)> {
        self.properties
            .iter()
            .map(|p| (relaxed_names::render(&p.name, mode), p))
            .collect()
    }
}

/// One declared property of a bean type.
#[derive(Debug)]
pub struct TypedProperty {
    /// Canonical hyphenated name.
    pub name: String,
    pub ty: SchemaTypeRef,
    pub description: Option<String>,
    pub deprecation: Option<Deprecation>,
}

/// Naming convention used when rendering property names to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMode {
    Hyphenated,
    Camel,
    Snake,
}

/// Deprecation metadata carried by properties and typed-properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecation {
    pub level: DeprecationLevel,
    pub reason: Option<String>,
    pub replacement: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeprecationLevel {
    #[default]
    Warning,
    Error,
}

impl fmt::Display for DeprecationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeprecationLevel::Warning => write!(f, "warning"),
            DeprecationLevel::Error => write!(f, "error"),
        }
    }
}

/// A single proposed value with optional documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticHint {
    pub value: String,
    pub description: Option<String>,
}

impl StaticHint {
    pub fn new(value: impl Into<String>) -> Self {
        StaticHint {
            value: value.into(),
            description: None,
        }
    }

    pub fn with_description(value: impl Into<String>, description: impl Into<String>) -> Self {
        StaticHint {
            value: value.into(),
            description: Some(description.into()),
        }
    }
}

/// External collaborator producing additional value hints for an atomic
/// type, e.g. values discovered by scanning a project. Invoked
/// synchronously from completion, so implementations are expected to be
/// fast or to sit behind a `CachingValueProvider`.
pub trait HintProvider: Send + Sync {
    fn hints(&self, query: &str) -> Vec<StaticHint>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(name: &str) -> TypedProperty {
        TypedProperty {
            name: name.to_string(),
            ty: SchemaType::atomic("string", ValueParser::Any),
            description: None,
            deprecation: None,
        }
    }

    #[test]
    fn test_bean_property_relaxed_lookup() {
        let bean = BeanType {
            name: "Server".to_string(),
            properties: vec![prop("context-path"), prop("port")],
        };

        assert!(bean.property("context-path").is_some());
        assert!(bean.property("contextPath").is_some());
        assert!(bean.property("context_path").is_some());
        assert!(bean.property("basePath").is_none());
    }

    #[test]
    fn test_properties_map_rendering() {
        let bean = BeanType {
            name: "Server".to_string(),
            properties: vec![prop("context-path")],
        };

        let camel = bean.properties_map(NameMode::Camel);
        assert_eq!(camel[0].0, "contextPath");

        let snake = bean.properties_map(NameMode::Snake);
        assert_eq!(snake[0].0, "context_path");

        let hyphen = bean.properties_map(NameMode::Hyphenated);
        assert_eq!(hyphen[0].0, "context-path");
    }

    #[test]
    fn test_type_name_rendering() {
        let map = Arc::new(SchemaType::Map {
            key: SchemaType::atomic("string", ValueParser::Any),
            value: SchemaType::reference("LogLevel"),
        });
        assert_eq!(map.type_name(), "map<string,LogLevel>");
    }
}
