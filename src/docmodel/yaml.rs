//! Block-style YAML front end
//!
//! Covers the subset application configuration actually uses: nested
//! block mappings and sequences, plain and quoted scalars, comments,
//! flow collections in value position, anchors (`&name`), aliases
//! (`*name`) and merge keys (`<<: *name`). Merge entries are flattened
//! into their constituent key-value pairs at parse time, so the
//! reconciler's duplicate-key check sees the post-merge entry list.
//!
//! The parser is editor-tolerant: a line without a colon inside a mapping
//! becomes an entry with an empty value, flagged incomplete, instead of a
//! parse error. Completion depends on this while the user is
//! mid-keystroke.

use rustc_hash::FxHashMap;

use super::node::{DocNode, KeyNode, MapEntry, Mapping, NodeKind, Scalar, ScalarStyle, Span};
use super::ParseError;

pub fn parse(text: &str) -> Result<DocNode, ParseError> {
    let lines = scan_lines(text)?;
    if lines.is_empty() {
        return Ok(DocNode::empty(text.len()));
    }
    let mut parser = Parser {
        text,
        lines,
        pos: 0,
        anchors: FxHashMap::default(),
    };
    let root = parser.parse_block(BlockCtx::Root)?;
    if parser.pos < parser.lines.len() {
        let line = parser.lines[parser.pos];
        return Err(ParseError::new(
            "unexpected content after the end of the document structure",
            line.content_start,
        ));
    }
    Ok(root)
}

#[derive(Debug, Clone, Copy)]
struct Line {
    indent: usize,
    content_start: usize,
    content_end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockCtx {
    /// Document root: mapping-biased, colon-less lines become incomplete
    /// entries.
    Root,
    /// Value position under a key.
    Value,
    /// Content of a `- ` sequence item.
    SeqItem,
}

struct Parser<'a> {
    text: &'a str,
    lines: Vec<Line>,
    pos: usize,
    anchors: FxHashMap<String, DocNode>,
}

impl<'a> Parser<'a> {
    fn content(&self, line: Line) -> &'a str {
        &self.text[line.content_start..line.content_end]
    }

    fn parse_block(&mut self, ctx: BlockCtx) -> Result<DocNode, ParseError> {
        let line = self.lines[self.pos];
        let content = self.content(line);

        if is_dash(content) {
            return self.parse_sequence(line.indent);
        }

        let mapping_like = match ctx {
            BlockCtx::Root => true,
            BlockCtx::Value | BlockCtx::SeqItem => {
                find_key_colon(content).is_some() || {
                    // A colon-less line followed by a sibling at the same
                    // indent is a mapping being typed, not a scalar.
                    ctx == BlockCtx::Value
                        && self
                            .lines
                            .get(self.pos + 1)
                            .is_some_and(|next| next.indent == line.indent)
                }
            }
        };

        if mapping_like {
            self.parse_mapping(line.indent)
        } else {
            self.pos += 1;
            self.parse_flow(line.content_start, line.content_end)
        }
    }

    fn parse_sequence(&mut self, indent: usize) -> Result<DocNode, ParseError> {
        let start = self.lines[self.pos].content_start;
        let mut end = start;
        let mut items = Vec::new();

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(ParseError::new("invalid indentation", line.content_start));
            }
            let content = self.content(line);
            if !is_dash(content) {
                break;
            }

            let rest_off = {
                let after_dash = line.content_start + 1;
                let rest = &self.text[after_dash..line.content_end];
                after_dash + (rest.len() - rest.trim_start().len())
            };

            if rest_off >= line.content_end {
                // Bare dash: the item is a nested block on deeper lines,
                // or empty.
                self.pos += 1;
                let item = match self.lines.get(self.pos) {
                    Some(next) if next.indent > indent => self.parse_block(BlockCtx::SeqItem)?,
                    _ => DocNode::empty(line.content_end),
                };
                end = end.max(item.span.end.max(line.content_end));
                items.push(item);
            } else {
                // Inline content: re-slice the line so the remainder acts
                // as its own line, then parse it as a block (this is what
                // makes `- name: x` compact mappings work).
                let rest_col = line.indent + (rest_off - line.content_start);
                self.lines[self.pos] = Line {
                    indent: rest_col,
                    content_start: rest_off,
                    content_end: line.content_end,
                };
                let item = self.parse_block(BlockCtx::SeqItem)?;
                end = end.max(item.span.end);
                items.push(item);
            }
        }

        Ok(DocNode {
            span: Span::new(start, end),
            kind: NodeKind::Sequence(items),
        })
    }

    fn parse_mapping(&mut self, indent: usize) -> Result<DocNode, ParseError> {
        let start = self.lines[self.pos].content_start;
        let mut end = start;
        let mut entries: Vec<MapEntry> = Vec::new();

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(ParseError::new("invalid indentation", line.content_start));
            }
            let content = self.content(line);
            if is_dash(content) {
                return Err(ParseError::new(
                    "sequence entry not allowed inside a mapping",
                    line.content_start,
                ));
            }

            match find_key_colon(content) {
                None => {
                    // Mid-keystroke line: key without a colon.
                    let key_text = content.trim_end().to_string();
                    let key_span =
                        Span::new(line.content_start, line.content_start + key_text.len());
                    entries.push(MapEntry {
                        key: KeyNode {
                            text: key_text,
                            span: key_span,
                            alias: false,
                            incomplete: true,
                        },
                        value: DocNode::empty(line.content_end),
                        from_merge: false,
                    });
                    end = end.max(line.content_end);
                    self.pos += 1;
                }
                Some(colon) => {
                    let raw_key = content[..colon].trim_end();
                    let key_span = Span::new(
                        line.content_start,
                        line.content_start + raw_key.len(),
                    );
                    let key = self.make_key(raw_key, key_span);

                    let value_rel = colon + 1;
                    let rest = &content[value_rel..];
                    let rest_off =
                        line.content_start + value_rel + (rest.len() - rest.trim_start().len());
                    let rest = rest.trim();

                    let value = if rest.is_empty() {
                        self.pos += 1;
                        self.parse_nested_value(indent, line.content_end)?
                    } else if let Some(anchor) = rest.strip_prefix('&') {
                        let (name, after) = split_token(anchor);
                        if name.is_empty() {
                            return Err(ParseError::new("anchor name missing", rest_off));
                        }
                        let node = if after.trim().is_empty() {
                            self.pos += 1;
                            self.parse_nested_value(indent, line.content_end)?
                        } else {
                            let after_off = line.content_end - after.len();
                            self.pos += 1;
                            self.parse_flow(
                                after_off + (after.len() - after.trim_start().len()),
                                line.content_end,
                            )?
                        };
                        self.anchors.insert(name.to_string(), node.clone());
                        node
                    } else {
                        self.pos += 1;
                        self.parse_flow(rest_off, line.content_end)?
                    };

                    end = end.max(value.span.end.max(line.content_end));

                    if key.text == "<<" {
                        self.flatten_merge(&value, key_span, &mut entries)?;
                    } else {
                        entries.push(MapEntry {
                            key,
                            value,
                            from_merge: false,
                        });
                    }
                }
            }
        }

        Ok(DocNode {
            span: Span::new(start, end),
            kind: NodeKind::Mapping(Mapping { entries }),
        })
    }

    /// Value after a `key:` with nothing on the line: a deeper block, a
    /// sequence at the same indent (a YAML oddity worth supporting), or
    /// nothing at all.
    fn parse_nested_value(
        &mut self,
        indent: usize,
        line_end: usize,
    ) -> Result<DocNode, ParseError> {
        match self.lines.get(self.pos) {
            Some(next) if next.indent > indent => self.parse_block(BlockCtx::Value),
            Some(next) if next.indent == indent && is_dash(self.content(*next)) => {
                self.parse_sequence(indent)
            }
            _ => Ok(DocNode::empty(line_end)),
        }
    }

    fn make_key(&self, raw_key: &str, span: Span) -> KeyNode {
        if let Some(name) = raw_key.strip_prefix('*') {
            // Alias key: resolve to the anchored scalar's text when
            // possible so duplicate detection compares resolved strings.
            let resolved = self
                .anchors
                .get(name.trim())
                .and_then(|n| n.as_scalar())
                .map(|s| s.value.clone())
                .unwrap_or_else(|| raw_key.to_string());
            return KeyNode {
                text: resolved,
                span,
                alias: true,
                incomplete: false,
            };
        }
        KeyNode::plain(unquote(raw_key), span)
    }

    fn flatten_merge(
        &self,
        value: &DocNode,
        key_span: Span,
        entries: &mut Vec<MapEntry>,
    ) -> Result<(), ParseError> {
        match &value.kind {
            NodeKind::Mapping(m) => {
                for entry in &m.entries {
                    entries.push(MapEntry {
                        key: entry.key.clone(),
                        value: entry.value.clone(),
                        from_merge: true,
                    });
                }
                Ok(())
            }
            NodeKind::Sequence(items) => {
                for item in items {
                    self.flatten_merge(item, key_span, entries)?;
                }
                Ok(())
            }
            _ => Err(ParseError::new(
                "merge key value must be a mapping or a sequence of mappings",
                key_span.start,
            )),
        }
    }

    /// Scalar, alias or flow collection occupying `[start, end)` of the
    /// text.
    fn parse_flow(&mut self, start: usize, end: usize) -> Result<DocNode, ParseError> {
        let raw = self.text[start..end].trim_end();
        let end = start + raw.len();
        let span = Span::new(start, end);

        if raw.is_empty() {
            return Ok(DocNode::empty(start));
        }

        if let Some(name) = raw.strip_prefix('*') {
            let name = name.trim();
            let mut node = self
                .anchors
                .get(name)
                .cloned()
                .ok_or_else(|| ParseError::new(format!("unknown anchor `{}`", name), start))?;
            node.span = span;
            if let NodeKind::Scalar(scalar) = &mut node.kind {
                scalar.style = ScalarStyle::Alias;
            }
            return Ok(node);
        }

        if raw.starts_with('[') {
            return self.parse_flow_sequence(start, raw, span);
        }
        if raw.starts_with('{') {
            return self.parse_flow_mapping(start, raw, span);
        }

        let (value, style) = match raw.as_bytes()[0] {
            b'"' => {
                if raw.len() < 2 || !raw.ends_with('"') {
                    return Err(ParseError::new("unclosed double quote", start));
                }
                (unescape_double(&raw[1..raw.len() - 1]), ScalarStyle::DoubleQuoted)
            }
            b'\'' => {
                if raw.len() < 2 || !raw.ends_with('\'') {
                    return Err(ParseError::new("unclosed single quote", start));
                }
                (raw[1..raw.len() - 1].replace("''", "'"), ScalarStyle::SingleQuoted)
            }
            _ => (raw.to_string(), ScalarStyle::Plain),
        };

        Ok(DocNode {
            span,
            kind: NodeKind::Scalar(Scalar { value, style }),
        })
    }

    fn parse_flow_sequence(
        &mut self,
        start: usize,
        raw: &str,
        span: Span,
    ) -> Result<DocNode, ParseError> {
        let inner = flow_body(raw, '[', ']', start)?;
        let mut items = Vec::new();
        for (item_off, item_raw) in split_flow_items(inner, start + 1) {
            if item_raw.trim().is_empty() {
                continue;
            }
            let trimmed_off = item_off + (item_raw.len() - item_raw.trim_start().len());
            items.push(self.parse_flow(trimmed_off, item_off + item_raw.len())?);
        }
        Ok(DocNode {
            span,
            kind: NodeKind::Sequence(items),
        })
    }

    fn parse_flow_mapping(
        &mut self,
        start: usize,
        raw: &str,
        span: Span,
    ) -> Result<DocNode, ParseError> {
        let inner = flow_body(raw, '{', '}', start)?;
        let mut entries = Vec::new();
        for (item_off, item_raw) in split_flow_items(inner, start + 1) {
            if item_raw.trim().is_empty() {
                continue;
            }
            let colon = find_key_colon(item_raw).ok_or_else(|| {
                ParseError::new("expected `key: value` inside flow mapping", item_off)
            })?;
            let raw_key = item_raw[..colon].trim();
            let key_rel = item_raw[..colon].len() - item_raw[..colon].trim_start().len();
            let key_span = Span::new(item_off + key_rel, item_off + key_rel + raw_key.len());
            let rest = &item_raw[colon + 1..];
            let rest_off = item_off + colon + 1 + (rest.len() - rest.trim_start().len());
            let value = if rest.trim().is_empty() {
                DocNode::empty(item_off + item_raw.len())
            } else {
                self.parse_flow(rest_off, item_off + item_raw.len())?
            };
            entries.push(MapEntry {
                key: self.make_key(raw_key, key_span),
                value,
                from_merge: false,
            });
        }
        Ok(DocNode {
            span,
            kind: NodeKind::Mapping(Mapping { entries }),
        })
    }
}

fn is_dash(content: &str) -> bool {
    content == "-" || content.starts_with("- ")
}

/// Position of the colon separating key from value, respecting quoting.
/// A colon only separates when followed by whitespace or end of content.
fn find_key_colon(content: &str) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' && q == b'"' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b':' if i + 1 >= bytes.len() || bytes[i + 1].is_ascii_whitespace() => {
                    return Some(i);
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// First whitespace-delimited token and the remainder.
fn split_token(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(at) => (&s[..at], &s[at..]),
        None => (s, ""),
    }
}

fn flow_body<'a>(raw: &'a str, open: char, close: char, start: usize) -> Result<&'a str, ParseError> {
    debug_assert!(raw.starts_with(open));
    if raw.len() < 2 || !raw.ends_with(close) {
        return Err(ParseError::new(
            format!("unclosed `{}` collection", open),
            start,
        ));
    }
    Ok(&raw[1..raw.len() - 1])
}

/// Split a flow collection body on top-level commas, yielding
/// (absolute offset, raw item) pairs.
fn split_flow_items(body: &str, base: usize) -> Vec<(usize, &str)> {
    let bytes = body.as_bytes();
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut item_start = 0usize;

    for (i, &b) in bytes.iter().enumerate() {
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'[' | b'{' => depth += 1,
                b']' | b'}' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => {
                    items.push((base + item_start, &body[item_start..i]));
                    item_start = i + 1;
                }
                _ => {}
            },
        }
    }
    items.push((base + item_start, &body[item_start..]));
    items
}

fn unescape_double(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2 {
        if s.starts_with('"') && s.ends_with('"') {
            return unescape_double(&s[1..s.len() - 1]);
        }
        if s.starts_with('\'') && s.ends_with('\'') {
            return s[1..s.len() - 1].replace("''", "'");
        }
    }
    s.to_string()
}

/// Split the text into logical lines, stripping comments and blank lines
/// and validating indentation.
fn scan_lines(text: &str) -> Result<Vec<Line>, ParseError> {
    let mut lines = Vec::new();
    let mut offset = 0;

    for raw in text.split_inclusive('\n') {
        let line_start = offset;
        offset += raw.len();

        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let line = line.strip_suffix('\r').unwrap_or(line);

        let trimmed = line.trim_start_matches(' ');
        let indent = line.len() - trimmed.len();
        if trimmed.starts_with('\t') {
            return Err(ParseError::new(
                "tabs are not allowed in indentation",
                line_start + indent,
            ));
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        // Document framing: directives and a leading separator are
        // ignored; a separator after content would start a second
        // document, which this front end does not model.
        if trimmed.starts_with('%') && lines.is_empty() {
            continue;
        }
        if trimmed == "---" {
            if lines.is_empty() {
                continue;
            }
            return Err(ParseError::new(
                "multiple documents are not supported",
                line_start + indent,
            ));
        }

        let content_start = line_start + indent;
        let content_end = content_start + content_width(trimmed);
        if content_end > content_start {
            lines.push(Line {
                indent,
                content_start,
                content_end,
            });
        }
    }

    Ok(lines)
}

/// Width of the line content once a trailing comment and trailing
/// whitespace are stripped. Comments only start at `#` preceded by
/// whitespace (or at content start) outside quotes.
fn content_width(content: &str) -> usize {
    let bytes = content.as_bytes();
    let mut quote: Option<u8> = None;
    let mut end = bytes.len();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' && q == b'"' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'#' if i == 0 || bytes[i - 1].is_ascii_whitespace() => {
                    end = i;
                    break;
                }
                _ => {}
            },
        }
        i += 1;
    }
    content[..end].trim_end().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn mapping(node: &DocNode) -> &Mapping {
        node.as_mapping().expect("expected a mapping")
    }

    fn scalar_value(node: &DocNode) -> &str {
        &node.as_scalar().expect("expected a scalar").value
    }

    #[test]
    fn test_nested_mappings_and_spans() {
        let text = indoc! {"
            server:
              port: 8080
              servlet:
                context-path: /api
        "};
        let root = parse(text).unwrap();
        let top = mapping(&root);
        assert_eq!(top.entries.len(), 1);
        assert_eq!(top.entries[0].key.text, "server");

        let server = mapping(&top.entries[0].value);
        assert_eq!(server.entries.len(), 2);
        assert_eq!(server.entries[0].key.text, "port");
        assert_eq!(scalar_value(&server.entries[0].value), "8080");

        // The scalar's span covers exactly `8080`.
        let span = server.entries[0].value.span;
        assert_eq!(&text[span.start..span.end], "8080");

        let servlet = mapping(&server.entries[1].value);
        assert_eq!(scalar_value(&servlet.entries[0].value), "/api");
    }

    #[test]
    fn test_sequences_indented_and_sibling() {
        let indented = indoc! {"
            hosts:
              - alpha
              - beta
        "};
        let root = parse(indented).unwrap();
        let hosts = &mapping(&root).entries[0].value;
        match &hosts.kind {
            NodeKind::Sequence(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(scalar_value(&items[0]), "alpha");
            }
            other => panic!("expected sequence, got {:?}", other),
        }

        // Sequence at the same indent as its key is also accepted.
        let sibling = indoc! {"
            hosts:
            - alpha
            - beta
            after: x
        "};
        let root = parse(sibling).unwrap();
        let top = mapping(&root);
        assert_eq!(top.entries.len(), 2);
        assert!(matches!(top.entries[0].value.kind, NodeKind::Sequence(_)));
        assert_eq!(top.entries[1].key.text, "after");
    }

    #[test]
    fn test_compact_mapping_in_sequence() {
        let text = indoc! {"
            users:
              - name: ada
                admin: true
              - name: grace
        "};
        let root = parse(text).unwrap();
        let users = &mapping(&root).entries[0].value;
        let NodeKind::Sequence(items) = &users.kind else {
            panic!("expected sequence");
        };
        assert_eq!(items.len(), 2);
        let first = mapping(&items[0]);
        assert_eq!(first.entries.len(), 2);
        assert_eq!(first.entries[0].key.text, "name");
        assert_eq!(scalar_value(&first.entries[1].value), "true");
    }

    #[test]
    fn test_comments_and_quotes() {
        let text = indoc! {r##"
            # header comment
            name: "hello # not a comment"  # trailing
            quoted: 'it''s fine'
        "##};
        let root = parse(text).unwrap();
        let top = mapping(&root);
        assert_eq!(scalar_value(&top.entries[0].value), "hello # not a comment");
        assert_eq!(scalar_value(&top.entries[1].value), "it's fine");
    }

    #[test]
    fn test_flow_collections() {
        let text = indoc! {"
            profiles: [dev, 'staging', prod]
            limits: {cpu: 2, memory: 512}
        "};
        let root = parse(text).unwrap();
        let top = mapping(&root);

        let NodeKind::Sequence(items) = &top.entries[0].value.kind else {
            panic!("expected flow sequence");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(scalar_value(&items[1]), "staging");

        let limits = mapping(&top.entries[1].value);
        assert_eq!(limits.entries.len(), 2);
        assert_eq!(limits.entries[1].key.text, "memory");
        assert_eq!(scalar_value(&limits.entries[1].value), "512");
    }

    #[test]
    fn test_anchor_alias_and_merge() {
        let text = indoc! {"
            defaults: &base
              retries: 3
              timeout: 10s
            service:
              <<: *base
              timeout: 30s
        "};
        let root = parse(text).unwrap();
        let top = mapping(&root);
        let service = mapping(&top.entries[1].value);

        // Merge flattened before the explicit entry: retries, timeout
        // (merged), timeout (explicit).
        let keys: Vec<(&str, bool)> = service
            .entries
            .iter()
            .map(|e| (e.key.text.as_str(), e.from_merge))
            .collect();
        assert_eq!(
            keys,
            vec![("retries", true), ("timeout", true), ("timeout", false)]
        );
    }

    #[test]
    fn test_scalar_alias() {
        let text = indoc! {"
            original: &port 8080
            copied: *port
        "};
        let root = parse(text).unwrap();
        let top = mapping(&root);
        let copied = top.entries[1].value.as_scalar().unwrap();
        assert_eq!(copied.value, "8080");
        assert_eq!(copied.style, ScalarStyle::Alias);
        // The alias node's span points at the usage site.
        assert_eq!(top.entries[1].value.span.start, text.find("*port").unwrap());
    }

    #[test]
    fn test_incomplete_key_line() {
        let text = indoc! {"
            server:
              po
              port: 8080
        "};
        let root = parse(text).unwrap();
        let server = mapping(&mapping(&root).entries[0].value);
        assert_eq!(server.entries.len(), 2);
        assert!(server.entries[0].key.incomplete);
        assert_eq!(server.entries[0].key.text, "po");
        assert!(!server.entries[1].key.incomplete);
    }

    #[test]
    fn test_empty_document() {
        let root = parse("").unwrap();
        assert!(matches!(root.kind, NodeKind::Empty));

        let root = parse("# only a comment\n").unwrap();
        assert!(matches!(root.kind, NodeKind::Empty));
    }

    #[test]
    fn test_leading_document_separator() {
        let root = parse("---\nport: 1\n").unwrap();
        assert_eq!(mapping(&root).entries[0].key.text, "port");
    }

    #[test]
    fn test_errors() {
        assert!(parse("\tport: 1\n").is_err());
        assert!(parse("a: 1\n   b: 2\n").is_err());
        assert!(parse("a: *nope\n").is_err());
        assert!(parse("a: \"unclosed\n").is_err());
        assert!(parse("a: 1\n---\nb: 2\n").is_err());
        assert!(parse("a: [1, 2\n").is_err());
    }

    #[test]
    fn test_error_offset_points_at_problem() {
        let err = parse("ok: 1\nbad: *missing\n").unwrap_err();
        assert_eq!(err.offset, "ok: 1\nbad: ".len());
    }
}
