//! `.properties`-style key-value front end
//!
//! Produces a single flat mapping whose keys are full dotted property
//! paths, so the reconciler walks `.properties` documents through exactly
//! the same machinery as YAML ones. `=` and `:` both separate key from
//! value; `#` and `!` start comment lines. Never fails: any line shape
//! degrades to an entry or is skipped.

use super::node::{DocNode, KeyNode, MapEntry, Mapping, NodeKind, Scalar, ScalarStyle, Span};

pub fn parse(text: &str) -> DocNode {
    let mut entries = Vec::new();
    let mut offset = 0;
    let mut start = None;
    let mut end = 0;

    for raw in text.split_inclusive('\n') {
        let line_start = offset;
        offset += raw.len();

        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let line = line.strip_suffix('\r').unwrap_or(line);

        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        let indent = line.len() - trimmed.len();
        let content_start = line_start + indent;
        let content = trimmed.trim_end();
        let content_end = content_start + content.len();

        start.get_or_insert(content_start);
        end = content_end;

        match content.find(['=', ':']) {
            Some(sep) => {
                let raw_key = content[..sep].trim_end();
                let key_span = Span::new(content_start, content_start + raw_key.len());

                let rest = &content[sep + 1..];
                let value_start =
                    content_start + sep + 1 + (rest.len() - rest.trim_start().len());
                let value = rest.trim();
                let value_node = if value.is_empty() {
                    DocNode::empty(content_end)
                } else {
                    DocNode {
                        span: Span::new(value_start, value_start + value.len()),
                        kind: NodeKind::Scalar(Scalar {
                            value: value.to_string(),
                            style: ScalarStyle::Plain,
                        }),
                    }
                };

                entries.push(MapEntry {
                    key: KeyNode::plain(raw_key, key_span),
                    value: value_node,
                    from_merge: false,
                });
            }
            None => {
                // Separator not typed yet.
                entries.push(MapEntry {
                    key: KeyNode {
                        text: content.to_string(),
                        span: Span::new(content_start, content_end),
                        alias: false,
                        incomplete: true,
                    },
                    value: DocNode::empty(content_end),
                    from_merge: false,
                });
            }
        }
    }

    if entries.is_empty() {
        return DocNode::empty(text.len());
    }
    DocNode {
        span: Span::new(start.unwrap_or(0), end),
        kind: NodeKind::Mapping(Mapping { entries }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_basic_entries() {
        let text = indoc! {"
            # comment
            server.port=8080
            server.servlet.context-path: /api
            ! another comment
        "};
        let root = parse(text);
        let mapping = root.as_mapping().unwrap();
        assert_eq!(mapping.entries.len(), 2);
        assert_eq!(mapping.entries[0].key.text, "server.port");
        assert_eq!(
            mapping.entries[0].value.as_scalar().unwrap().value,
            "8080"
        );
        assert_eq!(mapping.entries[1].key.text, "server.servlet.context-path");
    }

    #[test]
    fn test_value_span() {
        let text = "server.port=8080\n";
        let root = parse(text);
        let span = root.as_mapping().unwrap().entries[0].value.span;
        assert_eq!(&text[span.start..span.end], "8080");
    }

    #[test]
    fn test_missing_separator_is_incomplete() {
        let root = parse("server.po\n");
        let mapping = root.as_mapping().unwrap();
        assert!(mapping.entries[0].key.incomplete);
        assert_eq!(mapping.entries[0].key.text, "server.po");
    }

    #[test]
    fn test_empty_value() {
        let root = parse("server.port=\n");
        let mapping = root.as_mapping().unwrap();
        assert!(matches!(mapping.entries[0].value.kind, NodeKind::Empty));
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(parse("").kind, NodeKind::Empty));
        assert!(matches!(parse("# nothing\n").kind, NodeKind::Empty));
    }
}
