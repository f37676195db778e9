//! Parsed document tree
//!
//! The reconciler and completion engine operate on [`DocNode`] trees with
//! byte spans; they never look at raw text layout. Two front ends produce
//! the tree: a block-style YAML subset parser (anchors, aliases and merge
//! keys included) and a `.properties`-style key-value parser.

pub mod node;
pub mod properties;
pub mod yaml;

pub use node::{DocNode, KeyNode, MapEntry, Mapping, NodeKind, Scalar, ScalarStyle, Span};

use thiserror::Error;

/// Structural parse failure. Reported once per reconcile pass and fatal
/// for that pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        ParseError {
            message: message.into(),
            offset,
        }
    }
}

/// Document flavor, chosen from the file extension by the host layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Yaml,
    Properties,
}

impl Dialect {
    /// `.properties` files get the key-value front end; everything else
    /// is treated as YAML.
    pub fn for_path(path: &str) -> Dialect {
        if path.ends_with(".properties") {
            Dialect::Properties
        } else {
            Dialect::Yaml
        }
    }

    pub fn parse(&self, text: &str) -> Result<DocNode, ParseError> {
        match self {
            Dialect::Yaml => yaml::parse(text),
            Dialect::Properties => Ok(properties::parse(text)),
        }
    }
}
