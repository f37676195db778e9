//! Per-project engine state
//!
//! One `ProjectSession` owns one property index and one type registry,
//! built from one metadata snapshot. Sessions are immutable; a metadata
//! change builds a fresh session and the host swaps the `Arc`. There are
//! no process-wide schema registries.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::index::PropertyIndex;
use crate::schema::{HintProvider, SchemaRegistry, StaticHint};

pub struct ProjectSession {
    pub index: Arc<PropertyIndex>,
    pub registry: SchemaRegistry,
    /// Static value hints attached to property ids by the metadata
    /// document's `hints` section.
    property_hints: FxHashMap<String, Vec<StaticHint>>,
    /// Dynamic hint providers keyed by atomic type name.
    dynamic_hints: FxHashMap<String, Arc<dyn HintProvider>>,
}

impl ProjectSession {
    pub fn new(index: PropertyIndex, registry: SchemaRegistry) -> Self {
        ProjectSession {
            index: Arc::new(index),
            registry,
            property_hints: FxHashMap::default(),
            dynamic_hints: FxHashMap::default(),
        }
    }

    /// Session with nothing indexed; documents reconcile without schema
    /// knowledge (everything is an unknown property) until metadata is
    /// loaded.
    pub fn empty() -> Self {
        ProjectSession::new(PropertyIndex::new(), SchemaRegistry::new())
    }

    pub fn set_property_hints(&mut self, property_id: impl Into<String>, hints: Vec<StaticHint>) {
        self.property_hints.insert(property_id.into(), hints);
    }

    pub fn property_hints(&self, property_id: &str) -> &[StaticHint] {
        self.property_hints
            .get(property_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Attach a dynamic hint provider for values of the named atomic
    /// type.
    pub fn register_hint_provider(
        &mut self,
        type_name: impl Into<String>,
        provider: Arc<dyn HintProvider>,
    ) {
        self.dynamic_hints.insert(type_name.into(), provider);
    }

    pub fn hint_provider(&self, type_name: &str) -> Option<&Arc<dyn HintProvider>> {
        self.dynamic_hints.get(type_name)
    }
}

impl std::fmt::Debug for ProjectSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectSession")
            .field("indexed_properties", &self.index.len())
            .field("property_hints", &self.property_hints.len())
            .field("dynamic_hint_types", &self.dynamic_hints.len())
            .finish()
    }
}
