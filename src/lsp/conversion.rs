//! Offset/position mapping and problem-to-diagnostic conversion

use serde_json::json;
use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticSeverity, DiagnosticTag, NumberOrString, Position, Range,
};

use crate::docmodel::Span;
use crate::reconcile::{ProblemKind, ReconcileProblem, Severity};

/// Convert an LSP position to a byte offset in the text. Positions past
/// the end of a line or of the document clamp to the nearest valid
/// offset.
pub fn position_to_offset(text: &str, position: Position) -> usize {
    let mut offset = 0;
    let mut line = 0;
    let mut character = 0;

    for c in text.chars() {
        if line == position.line && character == position.character {
            return offset;
        }
        if line > position.line {
            return offset;
        }
        if c == '\n' {
            if line == position.line {
                // Position is past this line's end.
                return offset;
            }
            line += 1;
            character = 0;
        } else if line == position.line {
            character += 1;
        }
        offset += c.len_utf8();
    }
    offset
}

/// Convert a byte offset to an LSP position.
pub fn offset_to_position(text: &str, offset: usize) -> Position {
    let mut line = 0u32;
    let mut character = 0u32;
    let mut current = 0;

    for c in text.chars() {
        if current >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            character = 0;
        } else {
            character += 1;
        }
        current += c.len_utf8();
    }
    Position { line, character }
}

pub fn span_to_range(text: &str, span: Span) -> Range {
    Range {
        start: offset_to_position(text, span.start),
        end: offset_to_position(text, span.end),
    }
}

pub fn problem_to_diagnostic(text: &str, problem: &ReconcileProblem) -> Diagnostic {
    let severity = match problem.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
    };
    let code = match problem.kind {
        ProblemKind::SyntaxError => "syntax-error",
        ProblemKind::UnknownProperty => "unknown-property",
        ProblemKind::TypeMismatch => "type-mismatch",
        ProblemKind::DuplicateKey => "duplicate-key",
        ProblemKind::Deprecation => "deprecation",
    };
    let tags = match problem.kind {
        ProblemKind::Deprecation => Some(vec![DiagnosticTag::DEPRECATED]),
        _ => None,
    };

    // Quick-fix payloads ride along for clients that apply edits
    // themselves; the code-action handler serves the same data.
    let data = if problem.quick_fixes.is_empty() {
        None
    } else {
        Some(json!(problem
            .quick_fixes
            .iter()
            .map(|fix| {
                json!({
                    "title": fix.title,
                    "uri": fix.uri.as_str(),
                    "range": span_to_range(text, fix.span),
                    "replacement": fix.replacement,
                })
            })
            .collect::<Vec<_>>()))
    };

    Diagnostic {
        range: span_to_range(text, problem.span),
        severity: Some(severity),
        code: Some(NumberOrString::String(code.to_string())),
        source: Some("appconfig".to_string()),
        message: problem.message.clone(),
        tags,
        data,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "server:\n  port: 8080\n";

    #[test]
    fn test_offset_position_round_trip() {
        let offset = TEXT.find("8080").unwrap();
        let position = offset_to_position(TEXT, offset);
        assert_eq!(position, Position { line: 1, character: 8 });
        assert_eq!(position_to_offset(TEXT, position), offset);
    }

    #[test]
    fn test_position_past_line_end_clamps() {
        let position = Position { line: 0, character: 99 };
        assert_eq!(position_to_offset(TEXT, position), "server:".len());
    }

    #[test]
    fn test_position_past_document_end_clamps() {
        let position = Position { line: 99, character: 0 };
        assert_eq!(position_to_offset(TEXT, position), TEXT.len());
    }
}
