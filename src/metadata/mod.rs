//! Metadata source adapter
//!
//! The external metadata document is JSON describing properties, bean
//! type definitions, enum types and per-property value hints. One
//! document builds one [`ProjectSession`] (property index plus type
//! registry); when the document changes the host builds a fresh session
//! and swaps it in.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::index::relaxed_names::canonical_id;
use crate::index::{PropertyIndex, PropertyInfo};
use crate::schema::registry::bean_type;
use crate::schema::{
    parse_type_name, AtomicType, Deprecation, DeprecationLevel, SchemaError, SchemaRegistry,
    SchemaType, StaticHint, TypedProperty, ValueParser,
};
use crate::session::ProjectSession;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("cannot read metadata: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed metadata document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct MetadataDocument {
    pub properties: Vec<PropertyMeta>,
    pub types: Vec<TypeMeta>,
    pub enums: Vec<EnumMeta>,
    pub hints: Vec<HintMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deprecation: Option<DeprecationMeta>,
}

#[derive(Debug, Deserialize)]
pub struct TypeMeta {
    pub name: String,
    pub properties: Vec<PropertyMeta>,
}

#[derive(Debug, Deserialize)]
pub struct EnumMeta {
    pub name: String,
    pub values: Vec<HintValueMeta>,
}

#[derive(Debug, Deserialize)]
pub struct HintMeta {
    pub name: String,
    pub values: Vec<HintValueMeta>,
}

#[derive(Debug, Deserialize)]
pub struct HintValueMeta {
    pub value: serde_json::Value,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct DeprecationMeta {
    pub level: Option<String>,
    pub replacement: Option<String>,
    pub reason: Option<String>,
}

impl DeprecationMeta {
    fn to_deprecation(&self) -> Deprecation {
        let level = match self.level.as_deref() {
            Some(level) if level.eq_ignore_ascii_case("error") => DeprecationLevel::Error,
            _ => DeprecationLevel::Warning,
        };
        Deprecation {
            level,
            reason: self.reason.clone(),
            replacement: self.replacement.clone(),
        }
    }
}

pub fn parse_document(json: &str) -> Result<MetadataDocument, MetadataError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_file(path: &Path) -> Result<ProjectSession, MetadataError> {
    let json = std::fs::read_to_string(path)?;
    build_session(parse_document(&json)?)
}

/// Build the per-project session: enum and bean types go into the
/// registry (validated for ambiguous unions), properties into the index,
/// hints onto their property ids.
pub fn build_session(doc: MetadataDocument) -> Result<ProjectSession, MetadataError> {
    let mut registry = SchemaRegistry::new();

    for enum_meta in &doc.enums {
        let values: Vec<String> = enum_meta
            .values
            .iter()
            .map(|v| value_text(&v.value))
            .collect();
        let hints = enum_meta
            .values
            .iter()
            .map(|v| StaticHint {
                value: value_text(&v.value),
                description: v.description.clone(),
            })
            .collect();
        registry.register(
            &enum_meta.name,
            Arc::new(SchemaType::Atomic(AtomicType {
                name: enum_meta.name.clone(),
                parser: ValueParser::Enum { values },
                hints,
            })),
        );
    }

    for type_meta in &doc.types {
        let mut properties = Vec::with_capacity(type_meta.properties.len());
        for prop in &type_meta.properties {
            properties.push(TypedProperty {
                name: canonical_id(&prop.name),
                ty: parse_type_name(&prop.type_name)?,
                description: prop.description.clone(),
                deprecation: prop.deprecation.as_ref().map(DeprecationMeta::to_deprecation),
            });
        }
        registry.register(&type_meta.name, bean_type(&type_meta.name, properties));
    }

    registry.validate()?;

    // Property-declared types are schema-authoring input too: ambiguous
    // unions in them fail the build here instead of surfacing at first
    // use. Malformed names stay tolerated (they degrade to unchecked
    // values with a warning at resolution time).
    for prop in &doc.properties {
        if let Ok(ty) = parse_type_name(&prop.type_name) {
            registry.validate_declared(&prop.name, &ty)?;
        }
    }

    let mut index = PropertyIndex::new();
    for prop in doc.properties {
        let mut info = PropertyInfo::new(prop.name, prop.type_name);
        if let Some(default) = prop.default_value {
            info = info.with_default(default);
        }
        if let Some(description) = prop.description {
            info = info.with_description(description);
        }
        if let Some(deprecation) = prop.deprecation {
            info = info.with_deprecation(deprecation.to_deprecation());
        }
        index.insert(info);
    }

    let mut session = ProjectSession::new(index, registry);
    for hint in doc.hints {
        let hints: Vec<StaticHint> = hint
            .values
            .iter()
            .map(|v| StaticHint {
                value: value_text(&v.value),
                description: v.description.clone(),
            })
            .collect();
        session.set_property_hints(canonical_id(&hint.name), hints);
    }

    Ok(session)
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const FIXTURE: &str = indoc! {r#"
        {
          "properties": [
            {"name": "server.port", "type": "port", "defaultValue": 8080,
             "description": "Port the server listens on."},
            {"name": "logging.level", "type": "map<string,LogLevel>",
             "deprecation": {"level": "warning", "replacement": "logging.level.root"}}
          ],
          "types": [
            {"name": "Server", "properties": [
              {"name": "contextPath", "type": "string"},
              {"name": "port", "type": "port"}
            ]}
          ],
          "enums": [
            {"name": "LogLevel", "values": [
              {"value": "INFO"}, {"value": "DEBUG", "description": "verbose"}
            ]}
          ],
          "hints": [
            {"name": "server.port", "values": [{"value": 8080}, {"value": 8443}]}
          ]
        }
    "#};

    #[test]
    fn test_build_session_from_document() {
        let session = build_session(parse_document(FIXTURE).unwrap()).unwrap();

        assert_eq!(session.index.len(), 2);
        let port = session.index.exact("server.port").unwrap();
        assert_eq!(port.type_name, "port");
        assert!(port.description.is_some());

        let level = session.index.exact("logging.level").unwrap();
        let dep = level.deprecation.as_ref().unwrap();
        assert_eq!(dep.replacement.as_deref(), Some("logging.level.root"));

        // Enum registered as an atomic with value hints.
        let log_level = session.registry.get("LogLevel").unwrap();
        match &*log_level {
            SchemaType::Atomic(atomic) => {
                assert!(matches!(&atomic.parser, ValueParser::Enum { values } if values.len() == 2));
                assert_eq!(atomic.hints.len(), 2);
            }
            other => panic!("expected atomic enum, got {:?}", other),
        }

        // Bean property names are canonicalized.
        let server = session.registry.get("Server").unwrap();
        match &*server {
            SchemaType::Bean(bean) => {
                assert!(bean.property("context-path").is_some());
                assert!(bean.property("contextPath").is_some());
            }
            other => panic!("expected bean, got {:?}", other),
        }

        assert_eq!(session.property_hints("server.port").len(), 2);
    }

    #[test]
    fn test_empty_sections_default() {
        let doc = parse_document(r#"{"properties": []}"#).unwrap();
        assert!(doc.types.is_empty());
        let session = build_session(doc).unwrap();
        assert!(session.index.is_empty());
    }

    #[test]
    fn test_malformed_type_name_fails_build() {
        let json = r#"{"types": [{"name": "Bad", "properties": [{"name": "x", "type": "map<string"}]}]}"#;
        let doc = parse_document(json).unwrap();
        assert!(matches!(
            build_session(doc),
            Err(MetadataError::Schema(_))
        ));
    }

    #[test]
    fn test_ambiguous_union_fails_build() {
        let json = r#"{"types": [{"name": "Bad", "properties": [{"name": "x", "type": "union<int,string>"}]}]}"#;
        let doc = parse_document(json).unwrap();
        assert!(matches!(
            build_session(doc),
            Err(MetadataError::Schema(SchemaError::AmbiguousUnion { .. }))
        ));
    }

    #[test]
    fn test_property_level_ambiguous_union_fails_build() {
        let json = r#"{"properties": [{"name": "a.b", "type": "union<int,string>"}]}"#;
        let doc = parse_document(json).unwrap();
        assert!(matches!(
            build_session(doc),
            Err(MetadataError::Schema(SchemaError::AmbiguousUnion { .. }))
        ));
    }
}
