//! Schema model for configuration documents
//!
//! A schema is a graph of [`SchemaType`] values: atomic leaf types with an
//! attached value grammar, bean types listing named sub-properties, map and
//! sequence containers, and unions resolved by structural shape. The graph
//! may be cyclic through named references, so every traversal carries a
//! visited set.

pub mod registry;
pub mod type_parser;
pub mod types;
pub mod values;

pub use registry::SchemaRegistry;
pub use type_parser::parse_type_name;
pub use types::{
    AtomicType, BeanType, Deprecation, DeprecationLevel, HintProvider, NameMode, SchemaType,
    SchemaTypeRef, StaticHint, TypedProperty,
};
pub use values::{contains_placeholder, ValueParser};

use thiserror::Error;

/// Errors raised while building or resolving a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("malformed type name `{name}`: {reason}")]
    BadTypeName { name: String, reason: String },

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("type alias cycle involving `{0}`")]
    AliasCycle(String),

    /// Two union alternatives share a structural shape, so first-match
    /// resolution could never reach the second one.
    #[error("ambiguous union in `{context}`: more than one {shape} alternative")]
    AmbiguousUnion { context: String, shape: String },
}
