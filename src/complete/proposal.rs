//! Scored completion proposals

use std::cmp::Ordering;

use crate::docmodel::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalKind {
    Property,
    Value,
}

/// One ranked completion. Ordering is by descending score, then shorter
/// label, then lexical order, which keeps result lists deterministic.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub label: String,
    pub filter_text: String,
    pub kind: ProposalKind,
    pub score: f64,
    pub detail: Option<String>,
    /// Markdown documentation shown alongside the proposal.
    pub documentation: Option<String>,
    /// Range the completion replaces.
    pub edit_span: Span,
    pub new_text: String,
    pub deprecated: bool,
}

impl Proposal {
    pub fn cmp_rank(&self, other: &Proposal) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.label.len().cmp(&other.label.len()))
            .then_with(|| self.label.cmp(&other.label))
    }
}

pub fn sort_proposals(proposals: &mut [Proposal]) {
    proposals.sort_by(Proposal::cmp_rank);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(label: &str, score: f64) -> Proposal {
        Proposal {
            label: label.to_string(),
            filter_text: label.to_string(),
            kind: ProposalKind::Property,
            score,
            detail: None,
            documentation: None,
            edit_span: Span::point(0),
            new_text: label.to_string(),
            deprecated: false,
        }
    }

    #[test]
    fn test_rank_by_score_then_length_then_lexical() {
        let mut proposals = vec![
            proposal("bbb", 1.0),
            proposal("aa", 1.0),
            proposal("zz", 2.0),
            proposal("aaa", 1.0),
        ];
        sort_proposals(&mut proposals);
        let labels: Vec<&str> = proposals.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["zz", "aa", "aaa", "bbb"]);
    }

    #[test]
    fn test_sort_is_deterministic() {
        let make = || {
            vec![
                proposal("b", 1.0),
                proposal("a", 1.0),
                proposal("c", 1.0),
            ]
        };
        let mut first = make();
        let mut second = make();
        sort_proposals(&mut first);
        sort_proposals(&mut second);
        let labels = |v: &[Proposal]| v.iter().map(|p| p.label.clone()).collect::<Vec<_>>();
        assert_eq!(labels(&first), labels(&second));
    }
}
