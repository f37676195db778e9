//! Parser for declared type names
//!
//! Property metadata declares types as strings (`int`, `list<string>`,
//! `map<string,LogLevel>`, `union<string,list<string>>`, or the name of a
//! bean/enum type). Resolution into a [`SchemaType`] is lazy: the string
//! is parsed the first time a property's type is actually needed.
//!
//! Grammar:
//!
//! ```text
//! type  := name | name '<' type (',' type)* '>'
//! name  := [A-Za-z0-9_.$-]+
//! ```

use std::sync::Arc;

use super::types::{SchemaType, SchemaTypeRef};
use super::values::ValueParser;
use super::SchemaError;

/// Parse a declared type name into an unresolved [`SchemaType`].
///
/// Names that are neither builtins nor parameterized containers become
/// [`SchemaType::Ref`] and are resolved against the registry later.
pub fn parse_type_name(name: &str) -> Result<SchemaTypeRef, SchemaError> {
    let mut parser = TypeNameParser {
        input: name,
        pos: 0,
    };
    let ty = parser.parse_type()?;
    parser.skip_ws();
    if parser.pos != parser.input.len() {
        return Err(SchemaError::BadTypeName {
            name: name.to_string(),
            reason: format!("unexpected trailing input at byte {}", parser.pos),
        });
    }
    Ok(ty)
}

struct TypeNameParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> TypeNameParser<'a> {
    fn parse_type(&mut self) -> Result<SchemaTypeRef, SchemaError> {
        self.skip_ws();
        let ident = self.parse_ident()?;
        self.skip_ws();

        if !self.eat('<') {
            return Ok(builtin(&ident).unwrap_or_else(|| SchemaType::reference(ident)));
        }

        let mut args = vec![self.parse_type()?];
        self.skip_ws();
        while self.eat(',') {
            args.push(self.parse_type()?);
            self.skip_ws();
        }
        if !self.eat('>') {
            return Err(self.error("expected `>`"));
        }

        match (ident.as_str(), args.len()) {
            ("list" | "set", 1) => Ok(Arc::new(SchemaType::Sequence {
                elem: args.remove(0),
            })),
            ("map", 2) => {
                let value = args.remove(1);
                let key = args.remove(0);
                Ok(Arc::new(SchemaType::Map { key, value }))
            }
            ("union", n) if n >= 2 => Ok(Arc::new(SchemaType::Union { alternatives: args })),
            ("union", _) => Err(self.error("union needs at least two alternatives")),
            ("list" | "set", _) => Err(self.error("list takes exactly one type argument")),
            ("map", _) => Err(self.error("map takes exactly two type arguments")),
            _ => Err(self.error("only list, set, map and union take type arguments")),
        }
    }

    fn parse_ident(&mut self) -> Result<String, SchemaError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-') {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error("expected a type name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, reason: &str) -> SchemaError {
        SchemaError::BadTypeName {
            name: self.input.to_string(),
            reason: format!("{} at byte {}", reason, self.pos),
        }
    }
}

/// The fixed atomic vocabulary understood without registry support.
fn builtin(name: &str) -> Option<SchemaTypeRef> {
    let parser = match name {
        "string" | "str" | "text" => ValueParser::Any,
        "int" | "integer" | "long" => ValueParser::integer(),
        "port" => ValueParser::port(),
        "float" | "double" | "number" => ValueParser::Float,
        "boolean" | "bool" => ValueParser::Boolean,
        "duration" => ValueParser::Duration,
        "any" => ValueParser::Any,
        _ => return None,
    };
    Some(SchemaType::atomic(canonical_builtin_name(name), parser))
}

fn canonical_builtin_name(name: &str) -> &'static str {
    match name {
        "string" | "str" | "text" => "string",
        "int" | "integer" | "long" => "int",
        "port" => "port",
        "float" | "double" | "number" => "float",
        "boolean" | "bool" => "boolean",
        "duration" => "duration",
        _ => "any",
    }
}
