//! Conversions between property naming conventions
//!
//! Canonical form is hyphenated lower-case (`server.context-path`). A
//! user may spell the same property `server.contextPath` or
//! `server.context_path`; each segment therefore gets a small fixed alias
//! set that callers try in order.

use crate::schema::NameMode;

/// `contextPath` → `context-path`. Lower-cases as it goes.
pub fn camel_to_hyphen(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 2);
    for c in segment.chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `context_path` → `context-path`.
pub fn snake_to_hyphen(segment: &str) -> String {
    segment.replace('_', "-")
}

/// Canonical form of one path segment.
pub fn canonical_segment(segment: &str) -> String {
    snake_to_hyphen(&camel_to_hyphen(segment)).to_ascii_lowercase()
}

/// Canonical form of a dotted name.
pub fn canonical_id(dotted: &str) -> String {
    dotted
        .split('.')
        .map(canonical_segment)
        .collect::<Vec<_>>()
        .join(".")
}

/// The fixed alias set for one segment: as typed, camelCase→hyphen,
/// snake_case→hyphen. Duplicates collapse, order is preserved, and the
/// caller stops at the first alias that matches anything.
pub fn segment_aliases(segment: &str) -> Vec<String> {
    let mut aliases = vec![segment.to_string()];
    for candidate in [camel_to_hyphen(segment), snake_to_hyphen(segment)] {
        if !aliases.contains(&candidate) {
            aliases.push(candidate);
        }
    }
    aliases
}

/// Render a canonical hyphenated segment (or dotted name) under another
/// naming convention.
pub fn render(canonical: &str, mode: NameMode) -> String {
    match mode {
        NameMode::Hyphenated => canonical.to_string(),
        NameMode::Snake => canonical.replace('-', "_"),
        NameMode::Camel => canonical
            .split('.')
            .map(hyphen_segment_to_camel)
            .collect::<Vec<_>>()
            .join("."),
    }
}

fn hyphen_segment_to_camel(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut upper_next = false;
    for c in segment.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
