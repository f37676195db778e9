//! Node tree shared by both document front ends

/// Byte range within the document text; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn point(at: usize) -> Self {
        Span { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset <= self.end
    }
}

/// One node of the parsed document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocNode {
    pub span: Span,
    pub kind: NodeKind,
}

impl DocNode {
    pub fn empty(at: usize) -> Self {
        DocNode {
            span: Span::point(at),
            kind: NodeKind::Empty,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match &self.kind {
            NodeKind::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.kind {
            NodeKind::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

/// Closed set of node kinds; the reconciler matches exhaustively over
/// this instead of probing subtypes.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Key present, value absent (nothing after the colon).
    Empty,
    Scalar(Scalar),
    Sequence(Vec<DocNode>),
    Mapping(Mapping),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub value: String,
    pub style: ScalarStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    /// Resolved from a `*name` alias; content was cloned from the anchor.
    Alias,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    pub entries: Vec<MapEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: KeyNode,
    pub value: DocNode,
    /// True when this entry was flattened in from a `<<: *anchor` merge.
    pub from_merge: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyNode {
    /// Key text with quotes stripped.
    pub text: String,
    pub span: Span,
    /// The key itself is an alias reference (`*name`), exempt from
    /// unknown-property checks.
    pub alias: bool,
    /// The line had no colon yet; the user is mid-keystroke.
    pub incomplete: bool,
}

impl KeyNode {
    pub fn plain(text: impl Into<String>, span: Span) -> Self {
        KeyNode {
            text: text.into(),
            span,
            alias: false,
            incomplete: false,
        }
    }
}
