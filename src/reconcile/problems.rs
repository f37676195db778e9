//! Typed reconcile problems

use url::Url;

use crate::docmodel::Span;
use crate::schema::DeprecationLevel;

/// Closed problem taxonomy. Syntax errors are fatal for a pass; every
/// other kind accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    SyntaxError,
    UnknownProperty,
    TypeMismatch,
    DuplicateKey,
    Deprecation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl From<DeprecationLevel> for Severity {
    fn from(level: DeprecationLevel) -> Self {
        match level {
            DeprecationLevel::Warning => Severity::Warning,
            DeprecationLevel::Error => Severity::Error,
        }
    }
}

/// Replacement edit attached to a problem. Consumed by the host's
/// quick-fix applier; this system never applies edits itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickFix {
    pub title: String,
    pub uri: Url,
    pub span: Span,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileProblem {
    pub kind: ProblemKind,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub quick_fixes: Vec<QuickFix>,
}

impl ReconcileProblem {
    pub fn new(
        kind: ProblemKind,
        severity: Severity,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        ReconcileProblem {
            kind,
            severity,
            message: message.into(),
            span,
            quick_fixes: Vec::new(),
        }
    }

    pub fn with_fix(mut self, fix: QuickFix) -> Self {
        self.quick_fixes.push(fix);
        self
    }
}
