//! Indexed property metadata

use once_cell::sync::OnceCell;

use crate::schema::{parse_type_name, Deprecation, SchemaRegistry, SchemaTypeRef};

/// One canonical property as supplied by the metadata source.
///
/// Never mutated after insertion into the index; relaxed-prefix matches
/// produce a re-keyed copy via [`PropertyInfo::with_id`]. The declared
/// type name resolves into a schema type lazily, the first time a
/// reconcile or completion pass actually needs it.
#[derive(Debug)]
pub struct PropertyInfo {
    /// Canonical dotted id (hyphenated, lower-case).
    pub id: String,
    /// Declared type name, e.g. `int` or `map<string,LogLevel>`.
    pub type_name: String,
    pub default_value: Option<serde_json::Value>,
    pub description: Option<String>,
    pub deprecation: Option<Deprecation>,
    resolved: OnceCell<Option<SchemaTypeRef>>,
}

impl PropertyInfo {
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        PropertyInfo {
            id: id.into(),
            type_name: type_name.into(),
            default_value: None,
            description: None,
            deprecation: None,
            resolved: OnceCell::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default_value = Some(default);
        self
    }

    pub fn with_deprecation(mut self, deprecation: Deprecation) -> Self {
        self.deprecation = Some(deprecation);
        self
    }

    /// Copy of this property under a different id, used when a relaxed
    /// spelling matched: the copy carries the traversed spelling while
    /// sharing all other metadata.
    pub fn with_id(&self, id: impl Into<String>) -> PropertyInfo {
        PropertyInfo {
            id: id.into(),
            type_name: self.type_name.clone(),
            default_value: self.default_value.clone(),
            description: self.description.clone(),
            deprecation: self.deprecation.clone(),
            resolved: OnceCell::new(),
        }
    }

    /// The schema type this property's declared type name denotes, parsed
    /// on first use. A malformed type name logs once and degrades to
    /// `None`, which callers treat as "skip value checking".
    pub fn resolved_type(&self, registry: &SchemaRegistry) -> Option<SchemaTypeRef> {
        self.resolved
            .get_or_init(|| match parse_type_name(&self.type_name) {
                Ok(ty) => match registry.deref(&ty) {
                    Ok(resolved) => Some(resolved),
                    Err(err) => {
                        tracing::warn!(
                            "property `{}`: cannot resolve type `{}`: {}",
                            self.id,
                            self.type_name,
                            err
                        );
                        None
                    }
                },
                Err(err) => {
                    tracing::warn!(
                        "property `{}`: malformed type name `{}`: {}",
                        self.id,
                        self.type_name,
                        err
                    );
                    None
                }
            })
            .clone()
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecation.is_some()
    }
}
