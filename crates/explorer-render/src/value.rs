//! Prop and state values.

use std::collections::BTreeMap;

/// A literal value carried in props or component state.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
}

/// Component props, keyed by name.
pub type Props = BTreeMap<String, Value>;

impl Value {
    /// Text rendered for this value as a child node.
    ///
    /// Booleans and null render nothing, as in React.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Number(n) => Some(format_number(*n)),
            Value::Bool(_) | Value::Null => None,
        }
    }

    /// Parse a JavaScript literal (string, template without substitutions,
    /// number, boolean, `null` or `undefined`).
    pub fn parse_literal(text: &str) -> Option<Value> {
        let text = text.trim();
        match text {
            "true" => return Some(Value::Bool(true)),
            "false" => return Some(Value::Bool(false)),
            "null" | "undefined" => return Some(Value::Null),
            _ => {}
        }

        let first = text.chars().next()?;
        if matches!(first, '\'' | '"' | '`') && text.len() >= 2 && text.ends_with(first) {
            let inner = &text[1..text.len() - 1];
            if first == '`' && inner.contains("${") {
                return None;
            }
            return Some(Value::Str(unescape(inner)));
        }

        let numeric = text.strip_prefix('-').unwrap_or(text);
        if numeric.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            let parsed: f64 = text.replace('_', "").parse().ok()?;
            return Some(Value::Number(parsed));
        }

        None
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_literals() {
        assert_eq!(Value::parse_literal("'Hello!'"), Some(Value::Str("Hello!".into())));
        assert_eq!(Value::parse_literal("\"it\\'s\""), Some(Value::Str("it's".into())));
        assert_eq!(Value::parse_literal("`plain`"), Some(Value::Str("plain".into())));
        assert_eq!(Value::parse_literal("42"), Some(Value::Number(42.0)));
        assert_eq!(Value::parse_literal("-1.5"), Some(Value::Number(-1.5)));
        assert_eq!(Value::parse_literal("true"), Some(Value::Bool(true)));
        assert_eq!(Value::parse_literal("undefined"), Some(Value::Null));
    }

    #[test]
    fn rejects_non_literals() {
        assert_eq!(Value::parse_literal("`a ${b}`"), None);
        assert_eq!(Value::parse_literal("this.state.x"), None);
        assert_eq!(Value::parse_literal("f()"), None);
    }

    #[test]
    fn text_rendering() {
        assert_eq!(Value::Number(3.0).as_text(), Some("3".to_string()));
        assert_eq!(Value::Number(0.25).as_text(), Some("0.25".to_string()));
        assert_eq!(Value::Bool(true).as_text(), None);
        assert_eq!(Value::Null.as_text(), None);
    }
}
