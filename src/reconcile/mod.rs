//! Schema-directed document validation

pub mod problems;
pub mod reconciler;

pub use problems::{ProblemKind, QuickFix, ReconcileProblem, Severity};
pub use reconciler::{reconcile_node, reconcile_text};
