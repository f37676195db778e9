//! Context-aware completion and hover
//!
//! Shares the relaxation and navigation machinery with the reconciler, so
//! any property the reconciler accepts is also proposable at the same
//! position, and vice versa.

pub mod engine;
pub mod hover;
pub mod proposal;

pub use engine::{complete, hover};
pub use hover::HoverDoc;
pub use proposal::{Proposal, ProposalKind};
