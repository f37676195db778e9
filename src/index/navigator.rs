//! Dotted-path cursor over the property index
//!
//! A navigator is created per reconcile or completion request, advanced
//! one path segment at a time with [`IndexNavigator::select_sub_property`],
//! and discarded afterwards. Each step tries the segment's relaxed alias
//! spellings in order and stops at the first alias that yields an exact
//! match or an extension candidate; alias results are never accumulated,
//! so a name cannot match twice under different spellings.

use std::sync::Arc;

use super::property_index::PropertyIndex;
use super::property_info::PropertyInfo;
use super::relaxed_names::{canonical_segment, segment_aliases};

/// Authoritative answer a cursor position gives its caller.
#[derive(Debug, Clone)]
pub enum NavOutcome {
    /// The accumulated prefix names an indexed property exactly. Carries
    /// the property re-keyed to the traversed spelling.
    Exact(Arc<PropertyInfo>),
    /// The prefix is a strict prefix of at least one indexed property.
    Extendable,
    /// Both of the above hold at once: the prefix is simultaneously a
    /// leaf property and a navigable group. Neither interpretation is
    /// surfaced as authoritative; callers skip validation of the node
    /// rather than guessing.
    Ambiguous,
    /// No match and no extensions: the path names nothing.
    Dead,
}

/// Cursor over the property index, positioned at a dotted prefix.
#[derive(Debug, Clone)]
pub struct IndexNavigator {
    index: Arc<PropertyIndex>,
    /// Prefix as the user spelled it (casing preserved).
    spelled: String,
    /// Canonical hyphenated prefix used against the index.
    canonical: String,
    outcome: NavOutcome,
}

impl IndexNavigator {
    /// Cursor at the document root: nothing matched yet, the whole index
    /// is reachable.
    pub fn root(index: Arc<PropertyIndex>) -> Self {
        let outcome = if index.is_empty() {
            NavOutcome::Dead
        } else {
            NavOutcome::Extendable
        };
        IndexNavigator {
            index,
            spelled: String::new(),
            canonical: String::new(),
            outcome,
        }
    }

    /// Advance into `segment`, producing the next cursor.
    pub fn select_sub_property(&self, segment: &str) -> IndexNavigator {
        let spelled = join(&self.spelled, segment);

        if matches!(self.outcome, NavOutcome::Dead) {
            let canonical = join(&self.canonical, &canonical_segment(segment));
            return self.child(spelled, canonical, NavOutcome::Dead);
        }

        for alias in segment_aliases(segment) {
            let candidate = join(&self.canonical, &alias);
            let exact = self.index.exact(&candidate);
            let extendable = self.index.has_extensions(&candidate);

            let outcome = match (exact, extendable) {
                (Some(info), false) => NavOutcome::Exact(Arc::new(info.with_id(&spelled))),
                (None, true) => NavOutcome::Extendable,
                (Some(_), true) => NavOutcome::Ambiguous,
                (None, false) => continue,
            };
            return self.child(spelled, candidate, outcome);
        }

        // No alias matched anything; keep a best-effort canonical prefix
        // so unknown-property quick fixes can offer the canonical spelling.
        let canonical = join(&self.canonical, &canonical_segment(segment));
        self.child(spelled, canonical, NavOutcome::Dead)
    }

    fn child(&self, spelled: String, canonical: String, outcome: NavOutcome) -> IndexNavigator {
        IndexNavigator {
            index: self.index.clone(),
            spelled,
            canonical,
            outcome,
        }
    }

    pub fn outcome(&self) -> &NavOutcome {
        &self.outcome
    }

    /// The matched property, unless the position is ambiguous or dead.
    pub fn exact_match(&self) -> Option<Arc<PropertyInfo>> {
        match &self.outcome {
            NavOutcome::Exact(info) => Some(info.clone()),
            _ => None,
        }
    }

    /// Extension sentinel: navigation can continue below this prefix.
    /// False for ambiguous positions, which surface neither answer.
    pub fn extension_candidate(&self) -> bool {
        matches!(self.outcome, NavOutcome::Extendable)
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self.outcome, NavOutcome::Ambiguous)
    }

    pub fn is_dead(&self) -> bool {
        matches!(self.outcome, NavOutcome::Dead)
    }

    /// Prefix as typed by the user.
    pub fn spelled_prefix(&self) -> &str {
        &self.spelled
    }

    /// Canonical hyphenated prefix.
    pub fn canonical_prefix(&self) -> &str {
        &self.canonical
    }

    /// Properties reachable below the current prefix, for completion. At
    /// the root this is the entire index.
    pub fn reachable(&self) -> Vec<Arc<PropertyInfo>> {
        if self.canonical.is_empty() {
            self.index.iter().cloned().collect()
        } else {
            let prefix = format!("{}.", self.canonical);
            self.index.in_prefix(&prefix).cloned().collect()
        }
    }

    /// Fuzzy search under the current prefix (see
    /// [`PropertyIndex::fuzzy`]).
    pub fn fuzzy(&self, query: &str) -> Vec<(Arc<PropertyInfo>, f64)> {
        if self.canonical.is_empty() {
            self.index.fuzzy(query, "")
        } else {
            self.index.fuzzy(query, &format!("{}.", self.canonical))
        }
    }
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::property_info::PropertyInfo;

    fn navigator() -> IndexNavigator {
        IndexNavigator::root(Arc::new(PropertyIndex::from_infos(vec![
            PropertyInfo::new("server.port", "port"),
            PropertyInfo::new("server.servlet.context-path", "string"),
            PropertyInfo::new("logging.level", "map<string,LogLevel>"),
            // Both a leaf and a group: `spring.profiles` is a property
            // and `spring.profiles.active` extends it.
            PropertyInfo::new("spring.profiles", "list<string>"),
            PropertyInfo::new("spring.profiles.active", "list<string>"),
        ])))
    }

    #[test]
    fn test_exact_match_through_segments() {
        let nav = navigator()
            .select_sub_property("server")
            .select_sub_property("port");
        let info = nav.exact_match().expect("exact match");
        assert_eq!(info.id, "server.port");
        assert_eq!(info.type_name, "port");
    }

    #[test]
    fn test_exact_match_preserves_typed_spelling() {
        let nav = navigator()
            .select_sub_property("server")
            .select_sub_property("servlet")
            .select_sub_property("contextPath");
        let info = nav.exact_match().expect("exact match");
        assert_eq!(info.id, "server.servlet.contextPath");
        assert_eq!(info.type_name, "string");
    }

    #[test]
    fn test_extension_candidate() {
        let nav = navigator().select_sub_property("server");
        assert!(nav.extension_candidate());
        assert!(nav.exact_match().is_none());
    }

    #[test]
    fn test_dead_path_stays_dead() {
        let nav = navigator()
            .select_sub_property("server")
            .select_sub_property("bogus");
        assert!(nav.is_dead());
        assert_eq!(nav.canonical_prefix(), "server.bogus");

        let deeper = nav.select_sub_property("more");
        assert!(deeper.is_dead());
    }

    #[test]
    fn test_ambiguous_surfaces_neither() {
        let nav = navigator()
            .select_sub_property("spring")
            .select_sub_property("profiles");
        assert!(nav.is_ambiguous());
        assert!(nav.exact_match().is_none());
        assert!(!nav.extension_candidate());
    }

    #[test]
    fn test_dead_canonicalizes_for_quick_fix() {
        let nav = navigator()
            .select_sub_property("server")
            .select_sub_property("bogusName");
        assert_eq!(nav.canonical_prefix(), "server.bogus-name");
    }

    #[test]
    fn test_reachable_scopes_to_prefix() {
        let root = navigator();
        assert_eq!(root.reachable().len(), 5);

        let nav = root.select_sub_property("server");
        let ids: Vec<String> = nav.reachable().iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["server.port", "server.servlet.context-path"]);
    }
}
