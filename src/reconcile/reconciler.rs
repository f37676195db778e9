//! Depth-first document walk against the schema
//!
//! The walk starts index-directed (consulting the property index for
//! dotted keys) and switches to type-directed once a key resolves to a
//! property with a known type. Problems accumulate; nothing but a syntax
//! error aborts a pass, and every reachable node is visited exactly once,
//! so reconciling unchanged input twice yields identical problem lists.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::warn;
use url::Url;

use crate::docmodel::{Dialect, DocNode, KeyNode, Mapping, NodeKind, Span};
use crate::index::navigator::NavOutcome;
use crate::index::relaxed_names::canonical_id;
use crate::index::{IndexNavigator, PropertyInfo};
use crate::schema::registry::Shape;
use crate::schema::{
    contains_placeholder, Deprecation, SchemaType, SchemaTypeRef, TypedProperty,
};
use crate::session::ProjectSession;

use super::problems::{ProblemKind, QuickFix, ReconcileProblem, Severity};

/// Parse and reconcile `text`. A structural parse failure yields a single
/// syntax-error problem and short-circuits the walk.
pub fn reconcile_text(
    session: &ProjectSession,
    uri: &Url,
    text: &str,
    dialect: Dialect,
) -> Vec<ReconcileProblem> {
    match dialect.parse(text) {
        Ok(root) => reconcile_node(session, uri, &root),
        Err(err) => vec![ReconcileProblem::new(
            ProblemKind::SyntaxError,
            Severity::Error,
            err.message,
            Span::point(err.offset),
        )],
    }
}

/// Reconcile an already-parsed document tree.
pub fn reconcile_node(
    session: &ProjectSession,
    uri: &Url,
    root: &DocNode,
) -> Vec<ReconcileProblem> {
    // Without an index there is nothing to check against; stay silent
    // instead of flagging every key as unknown.
    if session.index.is_empty() {
        return Vec::new();
    }

    let mut walker = Walker {
        session,
        uri,
        problems: Vec::new(),
    };
    walker.walk_root(root);
    walker.problems
}

struct Walker<'a> {
    session: &'a ProjectSession,
    uri: &'a Url,
    problems: Vec<ReconcileProblem>,
}

impl<'a> Walker<'a> {
    fn walk_root(&mut self, root: &DocNode) {
        let nav = IndexNavigator::root(self.session.index.clone());
        match &root.kind {
            NodeKind::Empty => {}
            NodeKind::Mapping(_) | NodeKind::Scalar(_) => self.walk_index(root, nav),
            NodeKind::Sequence(_) => self.problem(
                ProblemKind::TypeMismatch,
                Severity::Error,
                "a sequence is not allowed at the document root",
                root.span,
            ),
        }
    }

    // ----- index-directed mode -------------------------------------------

    fn walk_index(&mut self, node: &DocNode, nav: IndexNavigator) {
        match &node.kind {
            NodeKind::Empty => {}
            NodeKind::Scalar(scalar) => {
                // Mid-keystroke key text where a property group was
                // expected; resolve it as a key path with no value.
                let key = KeyNode {
                    text: scalar.value.clone(),
                    span: node.span,
                    alias: false,
                    incomplete: true,
                };
                self.resolve_entry(&key, None, &nav);
            }
            NodeKind::Sequence(_) => self.problem(
                ProblemKind::TypeMismatch,
                Severity::Error,
                format!(
                    "a sequence is not allowed under `{}`; expected configuration properties",
                    display_prefix(&nav)
                ),
                node.span,
            ),
            NodeKind::Mapping(mapping) => {
                self.check_duplicates(mapping);
                for entry in &mapping.entries {
                    self.resolve_entry(&entry.key, Some(&entry.value), &nav);
                }
            }
        }
    }

    /// Walk a dotted key segment-by-segment through the navigator, then
    /// dispatch the value under whatever the path resolved to.
    fn resolve_entry(&mut self, key: &KeyNode, value: Option<&DocNode>, nav: &IndexNavigator) {
        let segments: Vec<&str> = key.text.split('.').collect();
        let mut cursor = nav.clone();

        for (i, segment) in segments.iter().enumerate() {
            cursor = cursor.select_sub_property(segment);
            match cursor.outcome() {
                // Simultaneously a leaf and a group: neither reading is
                // authoritative, so validation of this node is skipped.
                NavOutcome::Ambiguous => return,
                NavOutcome::Extendable => continue,
                NavOutcome::Dead => {
                    if !key.alias {
                        self.unknown_property(key);
                    }
                    return;
                }
                NavOutcome::Exact(info) => {
                    let info = info.clone();
                    self.check_property_deprecation(&info, key);
                    let Some(ty) = info.resolved_type(&self.session.registry) else {
                        // Unresolvable declared type: value checks are
                        // skipped for this property.
                        return;
                    };
                    let remaining = &segments[i + 1..];
                    let ty = if remaining.is_empty() {
                        Some(ty)
                    } else {
                        self.descend_type(ty, remaining, key)
                    };
                    if let (Some(ty), Some(value)) = (ty, value) {
                        self.walk_type(value, ty);
                    }
                    return;
                }
            }
        }

        // Path exhausted while still a valid prefix: stay index-directed.
        if let Some(value) = value {
            self.walk_index(value, cursor);
        }
    }

    // ----- type-directed mode --------------------------------------------

    /// Navigate `segments` into a resolved type (bean properties and map
    /// keys), returning the type the final segment's value must satisfy.
    fn descend_type(
        &mut self,
        ty: SchemaTypeRef,
        segments: &[&str],
        key: &KeyNode,
    ) -> Option<SchemaTypeRef> {
        let mut current = ty;
        for segment in segments {
            let resolved = self.deref(&current)?;
            current = match &*resolved {
                SchemaType::Bean(bean) => match bean.property(segment) {
                    Some(prop) => {
                        self.check_typed_property_deprecation(prop, key);
                        prop.ty.clone()
                    }
                    None => {
                        if !key.alias {
                            self.problem(
                                ProblemKind::UnknownProperty,
                                Severity::Warning,
                                format!(
                                    "unknown property `{}` for type `{}`",
                                    segment, bean.name
                                ),
                                key.span,
                            );
                        }
                        return None;
                    }
                },
                SchemaType::Map { key: key_ty, value } => {
                    self.check_map_key(segment, key_ty, key.span);
                    value.clone()
                }
                other => {
                    self.problem(
                        ProblemKind::TypeMismatch,
                        Severity::Error,
                        format!(
                            "cannot navigate into `{}` with `{}`",
                            other.type_name(),
                            segment
                        ),
                        key.span,
                    );
                    return None;
                }
            };
        }
        Some(current)
    }

    fn walk_type(&mut self, node: &DocNode, ty: SchemaTypeRef) {
        let Some(resolved) = self.deref(&ty) else {
            return;
        };

        if let NodeKind::Empty = node.kind {
            return;
        }

        // Unions resolve structurally before anything else: the first
        // alternative matching the node's shape takes over.
        if let SchemaType::Union { alternatives } = &*resolved {
            let shape = node_shape(node);
            match self
                .session
                .registry
                .resolve_union_alternative(alternatives, shape)
            {
                Some(alt) => self.walk_type(node, alt),
                None => self.problem(
                    ProblemKind::TypeMismatch,
                    Severity::Error,
                    format!(
                        "expected `{}`, found a {}",
                        resolved.type_name(),
                        shape
                    ),
                    node.span,
                ),
            }
            return;
        }

        match (&node.kind, &*resolved) {
            (NodeKind::Empty, _) => {}

            (NodeKind::Scalar(scalar), SchemaType::Atomic(atomic)) => {
                // Placeholder expressions resolve at runtime; always
                // accepted unchecked.
                if contains_placeholder(&scalar.value) {
                    return;
                }
                if let Err(reason) = atomic.parser.check(&scalar.value) {
                    self.problem(
                        ProblemKind::TypeMismatch,
                        Severity::Error,
                        format!("invalid `{}`: {}", atomic.name, reason),
                        node.span,
                    );
                }
            }
            (NodeKind::Scalar(scalar), _) => {
                if contains_placeholder(&scalar.value) {
                    return;
                }
                self.problem(
                    ProblemKind::TypeMismatch,
                    Severity::Error,
                    format!(
                        "expected `{}`, found a scalar",
                        resolved.type_name()
                    ),
                    node.span,
                );
            }

            (NodeKind::Sequence(items), SchemaType::Sequence { elem }) => {
                for item in items {
                    self.walk_type(item, elem.clone());
                }
            }
            (NodeKind::Sequence(_), _) => self.problem(
                ProblemKind::TypeMismatch,
                Severity::Error,
                format!(
                    "expected `{}`, found a sequence",
                    resolved.type_name()
                ),
                node.span,
            ),

            (NodeKind::Mapping(mapping), SchemaType::Map { key, value }) => {
                self.check_duplicates(mapping);
                for entry in &mapping.entries {
                    // Map keys are opaque; dotted text is a single key.
                    if !entry.key.incomplete && !entry.key.alias {
                        self.check_map_key(&entry.key.text, key, entry.key.span);
                    }
                    self.walk_type(&entry.value, value.clone());
                }
            }
            (NodeKind::Mapping(mapping), SchemaType::Bean(_)) => {
                self.check_duplicates(mapping);
                for entry in &mapping.entries {
                    if entry.key.alias {
                        continue;
                    }
                    let segments: Vec<&str> = entry.key.text.split('.').collect();
                    if let Some(value_ty) =
                        self.descend_type(resolved.clone(), &segments, &entry.key)
                    {
                        self.walk_type(&entry.value, value_ty);
                    }
                }
            }
            (NodeKind::Mapping(mapping), _) => {
                self.check_duplicates(mapping);
                self.problem(
                    ProblemKind::TypeMismatch,
                    Severity::Error,
                    format!(
                        "expected `{}`, found a mapping",
                        resolved.type_name()
                    ),
                    node.span,
                );
            }
        }
    }

    // ----- shared checks --------------------------------------------------

    /// Same-level invariant: no two sibling entries may resolve to the
    /// same key string. All violators are reported, in document order.
    /// Merge-flattened entries participate like explicit ones.
    fn check_duplicates(&mut self, mapping: &Mapping) {
        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        for entry in &mapping.entries {
            *counts.entry(entry.key.text.as_str()).or_default() += 1;
        }
        for entry in &mapping.entries {
            if counts[entry.key.text.as_str()] > 1 {
                self.problem(
                    ProblemKind::DuplicateKey,
                    Severity::Error,
                    format!("duplicate key `{}`", entry.key.text),
                    entry.key.span,
                );
            }
        }
    }

    fn check_map_key(&mut self, key_text: &str, key_ty: &SchemaTypeRef, span: Span) {
        let Some(resolved) = self.deref(key_ty) else {
            return;
        };
        if let SchemaType::Atomic(atomic) = &*resolved {
            if contains_placeholder(key_text) {
                return;
            }
            if let Err(reason) = atomic.parser.check(key_text) {
                self.problem(
                    ProblemKind::TypeMismatch,
                    Severity::Error,
                    format!("invalid map key: {}", reason),
                    span,
                );
            }
        }
    }

    fn check_property_deprecation(&mut self, info: &Arc<PropertyInfo>, key: &KeyNode) {
        if let Some(dep) = &info.deprecation {
            let problem = self.deprecation_problem(&info.id, dep, key);
            self.problems.push(problem);
        }
    }

    fn check_typed_property_deprecation(&mut self, prop: &TypedProperty, key: &KeyNode) {
        if let Some(dep) = &prop.deprecation {
            let problem = self.deprecation_problem(&prop.name, dep, key);
            self.problems.push(problem);
        }
    }

    fn deprecation_problem(
        &self,
        name: &str,
        dep: &Deprecation,
        key: &KeyNode,
    ) -> ReconcileProblem {
        let mut message = format!("`{}` is deprecated", name);
        if let Some(replacement) = &dep.replacement {
            message.push_str(&format!("; use `{}` instead", replacement));
        }
        if let Some(reason) = &dep.reason {
            message.push_str(&format!(" ({})", reason));
        }
        let mut problem = ReconcileProblem::new(
            ProblemKind::Deprecation,
            Severity::from(dep.level),
            message,
            key.span,
        );
        if let Some(replacement) = &dep.replacement {
            problem = problem.with_fix(QuickFix {
                title: format!("Replace with `{}`", replacement),
                uri: self.uri.clone(),
                span: key.span,
                replacement: replacement.clone(),
            });
        }
        problem
    }

    fn unknown_property(&mut self, key: &KeyNode) {
        let mut problem = ReconcileProblem::new(
            ProblemKind::UnknownProperty,
            Severity::Warning,
            format!("unknown property `{}`", key.text),
            key.span,
        );
        // Best-effort canonical spelling of the typed key, for quick-fix
        // metadata.
        let canonical = canonical_id(&key.text);
        if canonical != key.text {
            problem = problem.with_fix(QuickFix {
                title: format!("Change to `{}`", canonical),
                uri: self.uri.clone(),
                span: key.span,
                replacement: canonical,
            });
        }
        self.problems.push(problem);
    }

    fn deref(&self, ty: &SchemaTypeRef) -> Option<SchemaTypeRef> {
        match self.session.registry.deref(ty) {
            Ok(resolved) => Some(resolved),
            Err(err) => {
                warn!("skipping value checks: {}", err);
                None
            }
        }
    }

    fn problem(
        &mut self,
        kind: ProblemKind,
        severity: Severity,
        message: impl Into<String>,
        span: Span,
    ) {
        self.problems
            .push(ReconcileProblem::new(kind, severity, message, span));
    }
}

fn node_shape(node: &DocNode) -> Shape {
    match &node.kind {
        NodeKind::Scalar(_) | NodeKind::Empty => Shape::Scalar,
        NodeKind::Sequence(_) => Shape::Sequence,
        NodeKind::Mapping(_) => Shape::Mapping,
    }
}

fn display_prefix(nav: &IndexNavigator) -> String {
    let prefix = nav.spelled_prefix();
    if prefix.is_empty() {
        "the document root".to_string()
    } else {
        prefix.to_string()
    }
}
