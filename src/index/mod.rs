//! Canonical property index and name reconciliation
//!
//! The index maps canonical dotted property ids (hyphenated, lower-case)
//! to property metadata. Everything that touches user-typed names goes
//! through [`relaxed_names`], so the three tolerated spelling conventions
//! (camelCase, hyphen-case, snake_case) reconcile to the same entries for
//! both validation and completion.

pub mod fuzzy;
pub mod navigator;
pub mod property_index;
pub mod property_info;
pub mod relaxed_names;

pub use navigator::{IndexNavigator, NavOutcome};
pub use property_index::PropertyIndex;
pub use property_info::PropertyInfo;
