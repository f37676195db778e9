//! Named-type table and structural queries
//!
//! The registry owns every named (bean/enum) type for one project session
//! and is the only place `SchemaType::Ref` nodes can be resolved. One
//! registry is constructed per metadata build and handed to reconcile and
//! completion by reference; there are no process-wide schema singletons.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::types::{SchemaType, SchemaTypeRef};
use super::SchemaError;

/// Structural shape of a document node, used for union resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Mapping,
    Sequence,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => write!(f, "scalar"),
            Shape::Mapping => write!(f, "mapping"),
            Shape::Sequence => write!(f, "sequence"),
        }
    }
}

/// Table of named types for one project session.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    types: FxHashMap<String, SchemaTypeRef>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, ty: SchemaTypeRef) {
        self.types.insert(name.into(), ty);
    }

    pub fn get(&self, name: &str) -> Option<SchemaTypeRef> {
        self.types.get(name).cloned()
    }

    /// Follow `Ref` links until a structural type is reached.
    ///
    /// Errors on unknown names and on pure alias cycles (`A -> B -> A`
    /// with no structure in between). Cycles through structure (a bean
    /// property referring back to its owner) are fine and terminate here
    /// because only `Ref` links are followed.
    pub fn deref(&self, ty: &SchemaTypeRef) -> Result<SchemaTypeRef, SchemaError> {
        let mut current = ty.clone();
        let mut seen: HashSet<String> = HashSet::new();
        loop {
            match &*current {
                SchemaType::Ref(name) => {
                    if !seen.insert(name.clone()) {
                        return Err(SchemaError::AliasCycle(name.clone()));
                    }
                    current = self
                        .get(name)
                        .ok_or_else(|| SchemaError::UnknownType(name.clone()))?;
                }
                _ => return Ok(current),
            }
        }
    }

    pub fn is_atomic(&self, ty: &SchemaTypeRef) -> bool {
        matches!(
            self.deref(ty).as_deref(),
            Ok(SchemaType::Atomic(_))
        )
    }

    pub fn is_map(&self, ty: &SchemaTypeRef) -> bool {
        matches!(self.deref(ty).as_deref(), Ok(SchemaType::Map { .. }))
    }

    /// True when sequence nodes are acceptable under `ty`: the type is a
    /// sequence, or a union carrying a sequence alternative.
    pub fn is_sequenceable(&self, ty: &SchemaTypeRef) -> bool {
        match self.deref(ty) {
            Ok(resolved) => match &*resolved {
                SchemaType::Sequence { .. } => true,
                SchemaType::Union { alternatives } => alternatives
                    .iter()
                    .any(|alt| self.shape_of(alt) == Some(Shape::Sequence)),
                _ => false,
            },
            Err(_) => false,
        }
    }

    /// Key type of a map-shaped type.
    pub fn key_type(&self, ty: &SchemaTypeRef) -> Option<SchemaTypeRef> {
        match self.deref(ty).ok().as_deref() {
            Some(SchemaType::Map { key, .. }) => Some(key.clone()),
            _ => None,
        }
    }

    /// Element type of a sequence, or value type of a map.
    pub fn domain_type(&self, ty: &SchemaTypeRef) -> Option<SchemaTypeRef> {
        match self.deref(ty).ok().as_deref() {
            Some(SchemaType::Sequence { elem }) => Some(elem.clone()),
            Some(SchemaType::Map { value, .. }) => Some(value.clone()),
            _ => None,
        }
    }

    /// Structural shape of a type, or `None` when it cannot be determined
    /// (unknown reference, nested union).
    pub fn shape_of(&self, ty: &SchemaTypeRef) -> Option<Shape> {
        match self.deref(ty).ok().as_deref() {
            Some(SchemaType::Atomic(_)) => Some(Shape::Scalar),
            Some(SchemaType::Bean(_)) | Some(SchemaType::Map { .. }) => Some(Shape::Mapping),
            Some(SchemaType::Sequence { .. }) => Some(Shape::Sequence),
            _ => None,
        }
    }

    /// First union alternative whose structural shape matches `shape`.
    ///
    /// First-match, not best-match: ambiguous unions were rejected when
    /// the registry was validated, so at most one alternative can match.
    pub fn resolve_union_alternative(
        &self,
        alternatives: &[SchemaTypeRef],
        shape: Shape,
    ) -> Option<SchemaTypeRef> {
        alternatives
            .iter()
            .find(|alt| self.shape_of(alt) == Some(shape))
            .cloned()
    }

    /// Reject schemas where first-match union resolution could mask an
    /// alternative. Runs once at registry build time; reconcile never
    /// sees an ambiguous union.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut visited: HashSet<String> = HashSet::new();
        for (name, ty) in &self.types {
            self.validate_type(name, ty, &mut visited)?;
        }
        Ok(())
    }

    /// Validate a type declared outside the registry (a property's
    /// declared type) under the same rules as registered types.
    pub fn validate_declared(&self, context: &str, ty: &SchemaTypeRef) -> Result<(), SchemaError> {
        let mut visited: HashSet<String> = HashSet::new();
        self.validate_type(context, ty, &mut visited)
    }

    fn validate_type(
        &self,
        context: &str,
        ty: &SchemaTypeRef,
        visited: &mut HashSet<String>,
    ) -> Result<(), SchemaError> {
        match &**ty {
            SchemaType::Atomic(_) => Ok(()),
            SchemaType::Bean(bean) => {
                if !visited.insert(bean.name.clone()) {
                    return Ok(());
                }
                for prop in &bean.properties {
                    self.validate_type(&format!("{}.{}", bean.name, prop.name), &prop.ty, visited)?;
                }
                Ok(())
            }
            SchemaType::Map { key, value } => {
                self.validate_type(context, key, visited)?;
                self.validate_type(context, value, visited)
            }
            SchemaType::Sequence { elem } => self.validate_type(context, elem, visited),
            SchemaType::Union { alternatives } => {
                let mut seen_shapes: HashSet<Shape> = HashSet::new();
                for alt in alternatives {
                    let shape = self.shape_of(alt).ok_or_else(|| SchemaError::AmbiguousUnion {
                        context: context.to_string(),
                        shape: "nested-union".to_string(),
                    })?;
                    if !seen_shapes.insert(shape) {
                        return Err(SchemaError::AmbiguousUnion {
                            context: context.to_string(),
                            shape: shape.to_string(),
                        });
                    }
                    self.validate_type(context, alt, visited)?;
                }
                Ok(())
            }
            SchemaType::Ref(name) => match self.deref(ty) {
                Ok(resolved) => self.validate_type(name, &resolved, visited),
                // Unknown names are tolerated here; they degrade to
                // unchecked values at resolution time with a warning.
                Err(SchemaError::UnknownType(_)) => Ok(()),
                Err(err) => Err(err),
            },
        }
    }
}

/// Convenience for tests and metadata building: a bean type wrapped for
/// registration.
pub fn bean_type(name: &str, properties: Vec<super::types::TypedProperty>) -> SchemaTypeRef {
    Arc::new(SchemaType::Bean(super::types::BeanType {
        name: name.to_string(),
        properties,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::TypedProperty;
    use crate::schema::values::ValueParser;

    fn prop(name: &str, ty: SchemaTypeRef) -> TypedProperty {
        TypedProperty {
            name: name.to_string(),
            ty,
            description: None,
            deprecation: None,
        }
    }

    #[test]
    fn test_deref_follows_references() {
        let mut reg = SchemaRegistry::new();
        reg.register("Level", SchemaType::atomic("Level", ValueParser::Any));

        let resolved = reg.deref(&SchemaType::reference("Level")).unwrap();
        assert!(matches!(&*resolved, SchemaType::Atomic(_)));
    }

    #[test]
    fn test_deref_unknown_and_cycles() {
        let mut reg = SchemaRegistry::new();
        assert!(matches!(
            reg.deref(&SchemaType::reference("Nope")),
            Err(SchemaError::UnknownType(_))
        ));

        reg.register("A", SchemaType::reference("B"));
        reg.register("B", SchemaType::reference("A"));
        assert!(matches!(
            reg.deref(&SchemaType::reference("A")),
            Err(SchemaError::AliasCycle(_))
        ));
    }

    #[test]
    fn test_self_referential_bean_terminates() {
        let mut reg = SchemaRegistry::new();
        let tree = bean_type(
            "Tree",
            vec![
                prop("label", SchemaType::atomic("string", ValueParser::Any)),
                prop(
                    "children",
                    Arc::new(SchemaType::Sequence {
                        elem: SchemaType::reference("Tree"),
                    }),
                ),
            ],
        );
        reg.register("Tree", tree);

        reg.validate().unwrap();
        let ty = reg.get("Tree").unwrap();
        assert_eq!(reg.shape_of(&ty), Some(Shape::Mapping));
    }

    #[test]
    fn test_union_first_match_resolution() {
        let mut reg = SchemaRegistry::new();
        let union = Arc::new(SchemaType::Union {
            alternatives: vec![
                SchemaType::atomic("string", ValueParser::Any),
                Arc::new(SchemaType::Sequence {
                    elem: SchemaType::atomic("string", ValueParser::Any),
                }),
            ],
        });
        reg.register("StringOrList", union.clone());
        reg.validate().unwrap();

        assert!(reg.is_sequenceable(&union));
        let alt = match &*union {
            SchemaType::Union { alternatives } => reg
                .resolve_union_alternative(alternatives, Shape::Scalar)
                .unwrap(),
            _ => unreachable!(),
        };
        assert_eq!(reg.shape_of(&alt), Some(Shape::Scalar));
    }

    #[test]
    fn test_ambiguous_union_rejected() {
        let mut reg = SchemaRegistry::new();
        reg.register(
            "Bad",
            Arc::new(SchemaType::Union {
                alternatives: vec![
                    SchemaType::atomic("string", ValueParser::Any),
                    SchemaType::atomic("int", ValueParser::integer()),
                ],
            }),
        );
        assert!(matches!(
            reg.validate(),
            Err(SchemaError::AmbiguousUnion { .. })
        ));
    }
}
