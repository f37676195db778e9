//! Proposal computation for a cursor offset
//!
//! The engine finds the innermost node at the offset, derives the dotted
//! path leading to it, and resolves that path with the same navigator the
//! reconciler uses. Two proposal families come out: property names (for a
//! partially-typed key) and property values (once the expected type is
//! known).

use std::sync::Arc;

use crate::docmodel::{DocNode, NodeKind, Span};
use crate::index::navigator::NavOutcome;
use crate::index::relaxed_names::canonical_id;
use crate::index::{fuzzy, IndexNavigator, PropertyInfo};
use crate::schema::registry::Shape;
use crate::schema::{
    AtomicType, Deprecation, SchemaType, SchemaTypeRef, StaticHint, ValueParser,
};
use crate::session::ProjectSession;

use super::hover::{render_property_info, render_typed_property, HoverDoc};
use super::proposal::{sort_proposals, Proposal, ProposalKind};

/// Deprecated proposals stay listed but sink in the ranking.
const DEPRECATION_DEMOTION: f64 = 0.25;

/// Ranked proposals for the document position `offset`.
pub fn complete(
    session: &ProjectSession,
    root: &DocNode,
    text: &str,
    offset: usize,
) -> Vec<Proposal> {
    // An empty document completes root-level keys.
    if matches!(root.kind, NodeKind::Empty) {
        let mut proposals = complete_key(session, &[], "", Span::point(offset));
        sort_proposals(&mut proposals);
        return proposals;
    }

    let mut path = Vec::new();
    let Some(target) = locate(root, text, offset, &mut path, false) else {
        return Vec::new();
    };

    let mut proposals = match target {
        CursorTarget::Key {
            path,
            fragment,
            span,
            ..
        } => complete_key(session, &path, &fragment, span),
        CursorTarget::Value {
            path,
            fragment,
            span,
            in_sequence,
        } => complete_value(session, &path, &fragment, span, in_sequence),
    };

    sort_proposals(&mut proposals);
    proposals
}

/// Hover documentation for the key at `offset`, if it resolves.
pub fn hover(
    session: &ProjectSession,
    root: &DocNode,
    text: &str,
    offset: usize,
) -> Option<HoverDoc> {
    let mut path = Vec::new();
    let target = locate(root, text, offset, &mut path, false)?;
    let CursorTarget::Key {
        path,
        full_text,
        span,
        ..
    } = target
    else {
        return None;
    };

    let mut segments = path;
    segments.extend(split_dotted(&full_text));

    // Hover needs the property itself, so resolve the ancestors and look
    // at the final step explicitly.
    let (ancestors, last) = segments.split_at(segments.len().saturating_sub(1));
    let last = last.first()?;
    match resolve_path(session, &segments) {
        PathContext::Property { info, .. } => Some(HoverDoc {
            markdown: render_property_info(&info),
            span,
        }),
        _ => match resolve_path(session, ancestors) {
            PathContext::Typed(ty) | PathContext::Property { ty: Some(ty), .. } => {
                let resolved = session.registry.deref(&ty).ok()?;
                match &*resolved {
                    SchemaType::Bean(bean) => bean.property(last).map(|prop| HoverDoc {
                        markdown: render_typed_property(&bean.name, prop),
                        span,
                    }),
                    _ => None,
                }
            }
            _ => None,
        },
    }
}

// ----- cursor location ----------------------------------------------------

#[derive(Debug)]
enum CursorTarget {
    Key {
        path: Vec<String>,
        /// Typed text from the key start to the cursor.
        fragment: String,
        /// The whole key token (for hover).
        full_text: String,
        span: Span,
    },
    Value {
        path: Vec<String>,
        fragment: String,
        span: Span,
        in_sequence: bool,
    },
}

fn locate(
    node: &DocNode,
    text: &str,
    offset: usize,
    path: &mut Vec<String>,
    in_sequence: bool,
) -> Option<CursorTarget> {
    match &node.kind {
        NodeKind::Empty => Some(CursorTarget::Value {
            path: path.clone(),
            fragment: String::new(),
            span: Span::point(offset),
            in_sequence,
        }),
        NodeKind::Scalar(_) => {
            let upto = offset.clamp(node.span.start, node.span.end);
            Some(CursorTarget::Value {
                path: path.clone(),
                fragment: text[node.span.start..upto].to_string(),
                span: node.span,
                in_sequence,
            })
        }
        NodeKind::Sequence(items) => {
            for item in items {
                if item.span.contains(offset) {
                    return locate(item, text, offset, path, true);
                }
            }
            Some(CursorTarget::Value {
                path: path.clone(),
                fragment: String::new(),
                span: Span::point(offset),
                in_sequence: true,
            })
        }
        NodeKind::Mapping(mapping) => {
            // Merge-flattened entries alias spans at the anchor site; the
            // anchor's own mapping handles those offsets.
            let own_entries = || mapping.entries.iter().filter(|e| !e.from_merge);

            for entry in own_entries() {
                if entry.key.span.contains(offset) {
                    let upto = offset.clamp(entry.key.span.start, entry.key.span.end);
                    return Some(CursorTarget::Key {
                        path: path.clone(),
                        fragment: text[entry.key.span.start..upto].to_string(),
                        full_text: entry.key.text.clone(),
                        span: entry.key.span,
                    });
                }
                if matches!(entry.value.kind, NodeKind::Empty)
                    && offset > entry.key.span.end
                    && is_value_position(text, entry.key.span.end, offset)
                {
                    path.extend(split_dotted(&entry.key.text));
                    return Some(CursorTarget::Value {
                        path: path.clone(),
                        fragment: String::new(),
                        span: Span::point(offset),
                        in_sequence: false,
                    });
                }
                if entry.value.span.contains(offset)
                    && !matches!(entry.value.kind, NodeKind::Empty)
                {
                    path.extend(split_dotted(&entry.key.text));
                    return locate(&entry.value, text, offset, path, false);
                }
            }

            // Nothing contains the offset exactly, but a cursor still on
            // the same line as an entry's value end belongs to that
            // entry (e.g. right after `key: `).
            if let Some(entry) = own_entries()
                .filter(|e| {
                    !matches!(e.value.kind, NodeKind::Empty)
                        && offset > e.value.span.end
                        && same_line(text, e.value.span.end, offset)
                })
                .last()
            {
                path.extend(split_dotted(&entry.key.text));
                return locate(&entry.value, text, offset, path, false);
            }

            // A fresh key is being started at this level.
            Some(CursorTarget::Key {
                path: path.clone(),
                fragment: String::new(),
                full_text: String::new(),
                span: Span::point(offset),
            })
        }
    }
}

/// True when everything between the key end and the cursor is the
/// key/value separator and whitespace, i.e. the cursor sits in the value
/// slot of `key: `.
fn is_value_position(text: &str, key_end: usize, offset: usize) -> bool {
    let between = &text[key_end..offset.min(text.len())];
    !between.is_empty()
        && between
            .chars()
            .all(|c| matches!(c, ':' | '=' | ' ' | '\t'))
        && between.contains([':', '='])
}

/// No line break between the two offsets.
fn same_line(text: &str, from: usize, to: usize) -> bool {
    let from = from.min(text.len());
    let to = to.min(text.len());
    from <= to && !text[from..to].contains('\n')
}

fn split_dotted(key_text: &str) -> Vec<String> {
    key_text
        .split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ----- path resolution ----------------------------------------------------

enum PathContext {
    /// Still inside the index: completion proposes indexed properties.
    Index(IndexNavigator),
    /// The path crossed into a resolved type.
    Typed(SchemaTypeRef),
    /// The path names a property exactly.
    Property {
        info: Arc<PropertyInfo>,
        ty: Option<SchemaTypeRef>,
    },
    Dead,
}

fn resolve_path(session: &ProjectSession, segments: &[impl AsRef<str>]) -> PathContext {
    let mut nav = IndexNavigator::root(session.index.clone());
    for (i, segment) in segments.iter().enumerate() {
        nav = nav.select_sub_property(segment.as_ref());
        match nav.outcome() {
            // For completion an ambiguous prefix still narrows the
            // sub-index; proposals are harmless where validation must
            // stay silent.
            NavOutcome::Extendable | NavOutcome::Ambiguous => continue,
            NavOutcome::Dead => return PathContext::Dead,
            NavOutcome::Exact(info) => {
                let info = info.clone();
                let ty = info.resolved_type(&session.registry);
                let remaining = &segments[i + 1..];
                if remaining.is_empty() {
                    return PathContext::Property { info, ty };
                }
                let Some(mut ty) = ty else {
                    return PathContext::Dead;
                };
                for segment in remaining {
                    match descend_one(session, &ty, segment.as_ref()) {
                        Some(next) => ty = next,
                        None => return PathContext::Dead,
                    }
                }
                return PathContext::Typed(ty);
            }
        }
    }
    PathContext::Index(nav)
}

fn descend_one(session: &ProjectSession, ty: &SchemaTypeRef, segment: &str) -> Option<SchemaTypeRef> {
    let resolved = session.registry.deref(ty).ok()?;
    match &*resolved {
        SchemaType::Bean(bean) => bean.property(segment).map(|p| p.ty.clone()),
        SchemaType::Map { value, .. } => Some(value.clone()),
        _ => None,
    }
}

// ----- property-name proposals --------------------------------------------

fn complete_key(
    session: &ProjectSession,
    path: &[String],
    fragment: &str,
    span: Span,
) -> Vec<Proposal> {
    // A dotted fragment chains through the schema: everything before the
    // last dot navigates, the tail is the fuzzy query.
    let (head, partial) = match fragment.rsplit_once('.') {
        Some((head, partial)) => (head, partial),
        None => ("", fragment),
    };

    let mut segments: Vec<String> = path.to_vec();
    segments.extend(split_dotted(head));

    let head_prefix = if head.is_empty() {
        String::new()
    } else {
        format!("{}.", head)
    };

    match resolve_path(session, &segments) {
        PathContext::Index(nav) => nav
            .fuzzy(partial)
            .into_iter()
            .map(|(info, score)| {
                let relative = relative_id(&info.id, nav.canonical_prefix());
                property_proposal(&info, &head_prefix, &relative, score, span)
            })
            .collect(),
        PathContext::Typed(ty) | PathContext::Property { ty: Some(ty), .. } => {
            complete_bean_keys(session, &ty, partial, &head_prefix, span)
        }
        PathContext::Property { ty: None, .. } | PathContext::Dead => Vec::new(),
    }
}

fn complete_bean_keys(
    session: &ProjectSession,
    ty: &SchemaTypeRef,
    partial: &str,
    head_prefix: &str,
    span: Span,
) -> Vec<Proposal> {
    let Ok(resolved) = session.registry.deref(ty) else {
        return Vec::new();
    };
    match &*resolved {
        SchemaType::Bean(bean) => bean
            .properties
            .iter()
            .filter_map(|prop| {
                fuzzy::score(partial, &prop.name).map(|score| {
                    let (score, deprecated, detail) = match &prop.deprecation {
                        Some(dep) => (
                            score * DEPRECATION_DEMOTION,
                            true,
                            Some(deprecation_detail(dep)),
                        ),
                        None => (score, false, Some(prop.ty.type_name())),
                    };
                    Proposal {
                        label: prop.name.clone(),
                        filter_text: prop.name.clone(),
                        kind: ProposalKind::Property,
                        score,
                        detail,
                        documentation: Some(render_typed_property(&bean.name, prop)),
                        edit_span: span,
                        new_text: format!("{}{}", head_prefix, prop.name),
                        deprecated,
                    }
                })
            })
            .collect(),
        // Map keys with an enum-like key type complete from its values.
        SchemaType::Map { key, .. } => atomic_hints(session, key, None, partial)
            .into_iter()
            .filter_map(|hint| {
                fuzzy::score(partial, &hint.value).map(|score| Proposal {
                    label: hint.value.clone(),
                    filter_text: hint.value.clone(),
                    kind: ProposalKind::Property,
                    score,
                    detail: None,
                    documentation: hint.description.clone(),
                    edit_span: span,
                    new_text: format!("{}{}", head_prefix, hint.value),
                    deprecated: false,
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn property_proposal(
    info: &Arc<PropertyInfo>,
    head_prefix: &str,
    relative: &str,
    score: f64,
    span: Span,
) -> Proposal {
    let (score, deprecated, label, detail) = match &info.deprecation {
        Some(dep) => (
            score * DEPRECATION_DEMOTION,
            true,
            match &dep.replacement {
                Some(replacement) => format!("{} → {}", relative, replacement),
                None => relative.to_string(),
            },
            Some(deprecation_detail(dep)),
        ),
        None => (
            score,
            false,
            relative.to_string(),
            Some(info.type_name.clone()),
        ),
    };
    Proposal {
        label,
        filter_text: relative.to_string(),
        kind: ProposalKind::Property,
        score,
        detail,
        documentation: Some(render_property_info(info)),
        edit_span: span,
        new_text: format!("{}{}", head_prefix, relative),
        deprecated,
    }
}

fn deprecation_detail(dep: &Deprecation) -> String {
    match &dep.replacement {
        Some(replacement) => format!("deprecated → {}", replacement),
        None => "deprecated".to_string(),
    }
}

/// Id suffix below a canonical prefix; the whole id at the root.
fn relative_id(id: &str, canonical_prefix: &str) -> String {
    if canonical_prefix.is_empty() {
        return id.to_string();
    }
    id.strip_prefix(canonical_prefix)
        .and_then(|rest| rest.strip_prefix('.'))
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string())
}

// ----- property-value proposals -------------------------------------------

fn complete_value(
    session: &ProjectSession,
    path: &[String],
    fragment: &str,
    span: Span,
    in_sequence: bool,
) -> Vec<Proposal> {
    let (ty, property_id) = match resolve_path(session, path) {
        PathContext::Property { info, ty } => {
            (ty, Some(canonical_id(&info.id)))
        }
        PathContext::Typed(ty) => (Some(ty), None),
        // Still inside the index: what sits in "value position" is an
        // unfinished key, same as the reconciler treats it.
        PathContext::Index(_) => {
            return complete_key(session, path, fragment, span);
        }
        PathContext::Dead => return Vec::new(),
    };
    let Some(ty) = ty else {
        return Vec::new();
    };
    let Ok(mut resolved) = session.registry.deref(&ty) else {
        return Vec::new();
    };

    // A mapping-shaped expectation means keys are being typed, not
    // values.
    if !in_sequence
        && matches!(&*resolved, SchemaType::Bean(_) | SchemaType::Map { .. })
    {
        return complete_key(session, path, fragment, span);
    }

    // Inside a sequence item the element type carries the hints.
    if in_sequence {
        match &*resolved.clone() {
            SchemaType::Sequence { elem } => match session.registry.deref(elem) {
                Ok(elem) => resolved = elem,
                Err(_) => return Vec::new(),
            },
            SchemaType::Union { alternatives } => {
                match session
                    .registry
                    .resolve_union_alternative(alternatives, Shape::Sequence)
                {
                    Some(alt) => match session.registry.domain_type(&alt) {
                        Some(elem) => match session.registry.deref(&elem) {
                            Ok(elem) => resolved = elem,
                            Err(_) => return Vec::new(),
                        },
                        None => return Vec::new(),
                    },
                    None => return Vec::new(),
                }
            }
            _ => {}
        }
    } else if let SchemaType::Union { alternatives } = &*resolved.clone() {
        // Scalar position: the scalar-shaped alternative provides hints.
        match session
            .registry
            .resolve_union_alternative(alternatives, Shape::Scalar)
        {
            Some(alt) => match session.registry.deref(&alt) {
                Ok(alt) => resolved = alt,
                Err(_) => return Vec::new(),
            },
            None => return Vec::new(),
        }
    }

    atomic_hints(session, &resolved, property_id.as_deref(), fragment)
        .into_iter()
        .filter_map(|hint| {
            fuzzy::score(fragment, &hint.value).map(|score| Proposal {
                label: hint.value.clone(),
                filter_text: hint.value.clone(),
                kind: ProposalKind::Value,
                score,
                detail: None,
                documentation: hint.description.clone(),
                edit_span: span,
                new_text: hint.value.clone(),
                deprecated: false,
            })
        })
        .collect()
}

/// Static hints of an atomic type, merged with property-level hints and
/// anything a registered dynamic provider contributes. Duplicate values
/// keep their first occurrence.
fn atomic_hints(
    session: &ProjectSession,
    ty: &SchemaTypeRef,
    property_id: Option<&str>,
    query: &str,
) -> Vec<StaticHint> {
    let Ok(resolved) = session.registry.deref(ty) else {
        return Vec::new();
    };
    let SchemaType::Atomic(atomic) = &*resolved else {
        return Vec::new();
    };

    let mut hints: Vec<StaticHint> = Vec::new();
    let mut push = |hint: StaticHint, hints: &mut Vec<StaticHint>| {
        if !hints.iter().any(|h| h.value == hint.value) {
            hints.push(hint);
        }
    };

    for hint in parser_hints(atomic) {
        push(hint, &mut hints);
    }
    for hint in &atomic.hints {
        push(hint.clone(), &mut hints);
    }
    if let Some(id) = property_id {
        for hint in session.property_hints(id) {
            push(hint.clone(), &mut hints);
        }
    }
    if let Some(provider) = session.hint_provider(&atomic.name) {
        for hint in provider.hints(query) {
            push(hint, &mut hints);
        }
    }
    hints
}

/// Hints implied by the value grammar itself.
fn parser_hints(atomic: &AtomicType) -> Vec<StaticHint> {
    match &atomic.parser {
        ValueParser::Boolean => vec![StaticHint::new("true"), StaticHint::new("false")],
        ValueParser::Enum { values } => values.iter().map(StaticHint::new).collect(),
        _ => Vec::new(),
    }
}
