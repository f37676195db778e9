//! Value grammars for atomic types
//!
//! Each atomic type carries a [`ValueParser`] that accepts or rejects the
//! textual form of a scalar. Parsers are a closed variant set so the
//! reconciler can match exhaustively instead of dispatching through
//! callbacks.

/// Grammar attached to an atomic type.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueParser {
    /// Accepts any text (string-like types and unresolvable type names).
    Any,
    /// Signed integer, optionally restricted to a closed range.
    Integer { min: i64, max: i64 },
    Float,
    Boolean,
    /// `<number><unit>` with units ns/us/ms/s/m/h/d; a bare number is
    /// taken as milliseconds.
    Duration,
    /// Closed value set, compared case-insensitively.
    Enum { values: Vec<String> },
}

impl ValueParser {
    pub fn integer() -> Self {
        ValueParser::Integer {
            min: i64::MIN,
            max: i64::MAX,
        }
    }

    pub fn port() -> Self {
        ValueParser::Integer { min: 0, max: 65535 }
    }

    /// Check a scalar's textual form, returning a human-readable reason on
    /// rejection.
    pub fn check(&self, raw: &str) -> Result<(), String> {
        let text = raw.trim();
        match self {
            ValueParser::Any => Ok(()),
            ValueParser::Integer { min, max } => match text.parse::<i64>() {
                Ok(n) if n >= *min && n <= *max => Ok(()),
                Ok(n) => Err(format!("{} is outside the range {}..={}", n, min, max)),
                Err(_) => Err(format!("`{}` is not an integer", text)),
            },
            ValueParser::Float => text
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| format!("`{}` is not a number", text)),
            ValueParser::Boolean => {
                match text.to_ascii_lowercase().as_str() {
                    "true" | "false" | "on" | "off" | "yes" | "no" => Ok(()),
                    _ => Err(format!("`{}` is not a boolean", text)),
                }
            }
            ValueParser::Duration => check_duration(text),
            ValueParser::Enum { values } => {
                if values.iter().any(|v| v.eq_ignore_ascii_case(text)) {
                    Ok(())
                } else {
                    Err(format!(
                        "`{}` is not one of: {}",
                        text,
                        values.join(", ")
                    ))
                }
            }
        }
    }
}

const DURATION_UNITS: [&str; 7] = ["ns", "us", "ms", "s", "m", "h", "d"];

fn check_duration(text: &str) -> Result<(), String> {
    if text.is_empty() {
        return Err("empty duration".to_string());
    }
    let unit_start = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(unit_start);
    if number.is_empty() || number.parse::<f64>().is_err() {
        return Err(format!("`{}` is not a duration", text));
    }
    if unit.is_empty() || DURATION_UNITS.contains(&unit) {
        Ok(())
    } else {
        Err(format!(
            "`{}` has unknown duration unit `{}` (expected one of {})",
            text,
            unit,
            DURATION_UNITS.join(", ")
        ))
    }
}

/// True when the scalar contains a `${...}` placeholder expression. Such
/// values are resolved at runtime outside this system's visibility, so
/// they are always accepted unchecked.
pub fn contains_placeholder(raw: &str) -> bool {
    if let Some(open) = raw.find("${") {
        raw[open..].contains('}')
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_range() {
        let port = ValueParser::port();
        assert!(port.check("8080").is_ok());
        assert!(port.check("0").is_ok());
        assert!(port.check("65535").is_ok());
        assert!(port.check("65536").is_err());
        assert!(port.check("-1").is_err());
        assert!(port.check("notanumber").is_err());
    }

    #[test]
    fn test_boolean_forms() {
        let b = ValueParser::Boolean;
        for ok in ["true", "false", "ON", "off", "Yes", "no"] {
            assert!(b.check(ok).is_ok(), "{} should parse", ok);
        }
        assert!(b.check("enabled").is_err());
    }

    #[test]
    fn test_duration_grammar() {
        let d = ValueParser::Duration;
        for ok in ["10s", "500ms", "2h", "1.5m", "250", "30d"] {
            assert!(d.check(ok).is_ok(), "{} should parse", ok);
        }
        for bad in ["10sec", "fast", "", "s"] {
            assert!(d.check(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_enum_case_insensitive() {
        let e = ValueParser::Enum {
            values: vec!["INFO".to_string(), "DEBUG".to_string()],
        };
        assert!(e.check("info").is_ok());
        assert!(e.check("DEBUG").is_ok());
        assert!(e.check("chatty").is_err());
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(contains_placeholder("${server.port}"));
        assert!(contains_placeholder("prefix-${env.HOME}-suffix"));
        assert!(!contains_placeholder("$HOME"));
        assert!(!contains_placeholder("${unterminated"));
        assert!(!contains_placeholder("plain"));
    }
}
