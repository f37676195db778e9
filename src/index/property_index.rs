//! Ordered, prefix-searchable property index

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use tracing::warn;

use super::fuzzy;
use super::property_info::PropertyInfo;
use super::relaxed_names::canonical_id;

/// Ordered collection of [`PropertyInfo`] keyed by canonical dotted id.
///
/// Built once per metadata snapshot and then immutable; a metadata change
/// swaps in a freshly built index rather than mutating this one.
#[derive(Debug, Default)]
pub struct PropertyIndex {
    map: BTreeMap<String, Arc<PropertyInfo>>,
}

impl PropertyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_infos(infos: impl IntoIterator<Item = PropertyInfo>) -> Self {
        let mut index = Self::new();
        for info in infos {
            index.insert(info);
        }
        index
    }

    /// Insert under the canonical form of the property's id. A duplicate
    /// id replaces the earlier entry (last metadata source wins).
    pub fn insert(&mut self, mut info: PropertyInfo) {
        let key = canonical_id(&info.id);
        info.id = key.clone();
        if self.map.insert(key.clone(), Arc::new(info)).is_some() {
            warn!("duplicate property id `{}` in metadata; keeping the later entry", key);
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PropertyInfo>> {
        self.map.values()
    }

    /// Exact lookup on the canonical hyphenated id. The caller supplies
    /// candidate spellings; no relaxation happens here.
    pub fn exact(&self, id: &str) -> Option<Arc<PropertyInfo>> {
        self.map.get(id).cloned()
    }

    /// All entries whose id starts with `prefix` (plain string prefix, so
    /// a partial trailing segment narrows too).
    pub fn in_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a Arc<PropertyInfo>> + 'a {
        self.map
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(_, v)| v)
    }

    /// True when `dotted_prefix` is a strict dotted prefix of at least one
    /// indexed property, i.e. navigation can continue below it.
    pub fn has_extensions(&self, dotted_prefix: &str) -> bool {
        let with_dot = format!("{}.", dotted_prefix);
        self.in_prefix(&with_dot).next().is_some()
    }

    /// Longest valid property prefix of `name`.
    ///
    /// Trailing `.segment` groups are stripped one at a time (never
    /// mid-segment), canonicalizing at each step, until an exact hit is
    /// found. Returns the matched property and the stripped remainder, so
    /// `server.servlet.context-path.extra` resolves to the
    /// `server.servlet.context-path` property with remainder `extra`.
    pub fn longest_prefix(&self, name: &str) -> Option<(Arc<PropertyInfo>, String)> {
        let segments: Vec<&str> = name.split('.').collect();
        for cut in (1..=segments.len()).rev() {
            let candidate = canonical_id(&segments[..cut].join("."));
            if let Some(info) = self.exact(&candidate) {
                return Some((info, segments[cut..].join(".")));
            }
        }
        None
    }

    /// Fuzzy subsequence search for completion: scores `query` against the
    /// trailing segments of each property below `within_prefix` (the whole
    /// id when the prefix is empty). Results are unordered; ranking
    /// happens in the proposal layer.
    pub fn fuzzy(&self, query: &str, within_prefix: &str) -> Vec<(Arc<PropertyInfo>, f64)> {
        self.in_prefix(within_prefix)
            .filter_map(|info| {
                let relative = info.id.strip_prefix(within_prefix).unwrap_or(&info.id);
                fuzzy::score(query, relative).map(|s| (info.clone(), s))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> PropertyIndex {
        PropertyIndex::from_infos(vec![
            PropertyInfo::new("server.port", "port"),
            PropertyInfo::new("server.servlet.context-path", "string"),
            PropertyInfo::new("server.servlet.session-timeout", "duration"),
            PropertyInfo::new("logging.level", "map<string,LogLevel>"),
        ])
    }

    #[test]
    fn test_exact_lookup() {
        let index = sample_index();
        assert!(index.exact("server.port").is_some());
        assert!(index.exact("server.Port").is_none());
        assert!(index.exact("server").is_none());
    }

    #[test]
    fn test_insert_canonicalizes() {
        let index = PropertyIndex::from_infos(vec![PropertyInfo::new(
            "server.contextPath",
            "string",
        )]);
        assert!(index.exact("server.context-path").is_some());
    }

    #[test]
    fn test_has_extensions_respects_segment_boundary() {
        let index = sample_index();
        assert!(index.has_extensions("server"));
        assert!(index.has_extensions("server.servlet"));
        assert!(!index.has_extensions("server.port"));
        // `serv` is a string prefix but not a dotted prefix.
        assert!(!index.has_extensions("serv"));
    }

    #[test]
    fn test_longest_prefix() {
        let index = sample_index();

        let (info, rest) = index
            .longest_prefix("server.servlet.context-path.extra")
            .unwrap();
        assert_eq!(info.id, "server.servlet.context-path");
        assert_eq!(rest, "extra");

        // CamelCase resolves through canonicalization.
        let (info, rest) = index.longest_prefix("server.servlet.contextPath").unwrap();
        assert_eq!(info.id, "server.servlet.context-path");
        assert_eq!(rest, "");

        assert!(index.longest_prefix("nothing.here").is_none());
    }

    #[test]
    fn test_fuzzy_search_scopes_to_prefix() {
        let index = sample_index();

        let all = index.fuzzy("", "");
        assert_eq!(all.len(), 4);

        let scoped = index.fuzzy("", "server.servlet.");
        assert_eq!(scoped.len(), 2);

        let hits = index.fuzzy("cp", "server.");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, "server.servlet.context-path");
    }
}
