//! Subsequence scoring for completion queries
//!
//! A property matches a query when the query's characters appear as a
//! subsequence of the candidate, case-insensitively. Contiguous runs and
//! characters anchored at segment boundaries (start of the candidate, or
//! following `.`, `-` or `_`) score higher, so `scp` prefers
//! `servlet.context-path` over incidental scattered matches.

const BASE_SCORE: f64 = 1.0;
const CONTIGUOUS_BONUS: f64 = 2.0;
const BOUNDARY_BONUS: f64 = 3.0;

/// Score `query` against `candidate`, or `None` when the query is not a
/// subsequence. An empty query matches everything with score zero.
///
/// Matching is greedy left-to-right, which keeps scores deterministic for
/// a given (query, candidate) pair.
pub fn score(query: &str, candidate: &str) -> Option<f64> {
    if query.is_empty() {
        return Some(0.0);
    }

    let mut total = 0.0;
    let mut query_chars = query.chars().map(|c| c.to_ascii_lowercase());
    let mut needle = query_chars.next();
    let mut prev_matched = false;
    let mut at_boundary = true;

    for c in candidate.chars() {
        let Some(n) = needle else { break };
        let lower = c.to_ascii_lowercase();
        if lower == n {
            total += BASE_SCORE;
            if at_boundary {
                total += BOUNDARY_BONUS;
            } else if prev_matched {
                total += CONTIGUOUS_BONUS;
            }
            prev_matched = true;
            needle = query_chars.next();
        } else {
            prev_matched = false;
        }
        at_boundary = matches!(c, '.' | '-' | '_');
    }

    if needle.is_none() {
        Some(total)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_subsequence_rejected() {
        assert!(score("xyz", "context-path").is_none());
        assert!(score("portx", "port").is_none());
    }

    #[test]
    fn test_empty_query_matches_all() {
        assert_eq!(score("", "anything"), Some(0.0));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(score("PORT", "port").is_some());
        assert!(score("cp", "contextPath").is_some());
    }

    #[test]
    fn test_contiguous_beats_scattered() {
        // "pat" appears contiguously in "path" but scattered in
        // "pre-attempt".
        let contiguous = score("pat", "path").unwrap();
        let scattered = score("pat", "planet").unwrap();
        assert!(contiguous > scattered);
    }

    #[test]
    fn test_boundary_anchoring_beats_mid_segment() {
        // "cp" anchored at segment starts of "context-path" vs buried in
        // "scope".
        let anchored = score("cp", "context-path").unwrap();
        let buried = score("cp", "scoped").unwrap();
        assert!(anchored > buried);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(score("ctx", "context"), score("ctx", "context"));
    }
}
