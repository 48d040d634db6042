//! Constant values: directive arguments and default values.
//!
//! Two sources produce [`ConstValue`]s. Directive applications in doc
//! comments are written in GraphQL constant-value syntax and parsed by
//! [`parse_arguments`]. Default values are host-language expressions and are
//! evaluated by [`evaluate`], which only accepts literal shapes.

use crate::model::{Expr, ExprKind, ObjectEntry, Span};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Enum(String),
    List(Vec<ConstValue>),
    Object(BTreeMap<String, ConstValue>),
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Null => write!(f, "null"),
            ConstValue::Int(value) => write!(f, "{}", value),
            ConstValue::Float(value) => {
                if value.fract() == 0.0 && value.is_finite() {
                    write!(f, "{:.1}", value)
                } else {
                    write!(f, "{}", value)
                }
            }
            ConstValue::String(value) => write!(f, "{:?}", value),
            ConstValue::Boolean(value) => write!(f, "{}", value),
            ConstValue::Enum(value) => write!(f, "{}", value),
            ConstValue::List(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ConstValue::Object(fields) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Serialized as GraphQL literal text so enum values and strings stay distinct.
impl Serialize for ConstValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A literal that failed to parse, with the byte offset of the problem
/// relative to the parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// One `name: value` pair of a directive application.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentLiteral {
    pub name: String,
    pub value: ConstValue,
    /// Byte offset of the argument name in the parsed text.
    pub offset: usize,
}

/// Parses the inside of a directive argument list: `credits: 10, tags: ["a"]`.
pub fn parse_arguments(text: &str) -> Result<Vec<ArgumentLiteral>, LiteralError> {
    let mut parser = LiteralParser::new(text);
    let mut arguments = Vec::new();
    parser.skip_ignored();
    while !parser.at_end() {
        let offset = parser.pos;
        let name = parser.name()?;
        parser.skip_ignored();
        parser.expect(':')?;
        parser.skip_ignored();
        let value = parser.value()?;
        arguments.push(ArgumentLiteral {
            name,
            value,
            offset,
        });
        parser.skip_ignored();
    }
    Ok(arguments)
}

/// Parses a single GraphQL constant value.
pub fn parse_const_value(text: &str) -> Result<ConstValue, LiteralError> {
    let mut parser = LiteralParser::new(text);
    parser.skip_ignored();
    let value = parser.value()?;
    parser.skip_ignored();
    if !parser.at_end() {
        return Err(parser.error("Unexpected trailing characters after value."));
    }
    Ok(value)
}

struct LiteralParser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    // Commas are insignificant in GraphQL.
    fn skip_ignored(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == ',' {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.bump();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("Expected `{}`, found `{}`.", expected, ch))),
            None => Err(self.error(format!("Expected `{}`, found end of input.", expected))),
        }
    }

    fn name(&mut self) -> Result<String, LiteralError> {
        let start = self.pos;
        match self.peek() {
            Some(ch) if ch == '_' || ch.is_ascii_alphabetic() => {
                self.bump();
            }
            _ => return Err(self.error("Expected a name.")),
        }
        while let Some(ch) = self.peek() {
            if ch == '_' || ch.is_ascii_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn value(&mut self) -> Result<ConstValue, LiteralError> {
        match self.peek() {
            None => Err(self.error("Expected a value, found end of input.")),
            Some('$') => Err(self.error(
                "Expected a literal value. Variables are not allowed in directive arguments.",
            )),
            Some('"') => self.string().map(ConstValue::String),
            Some('[') => self.list(),
            Some('{') => self.object(),
            Some(ch) if ch == '-' || ch.is_ascii_digit() => self.number(),
            Some(ch) if ch == '_' || ch.is_ascii_alphabetic() => {
                let start = self.pos;
                let name = self.name()?;
                self.skip_whitespace_only();
                if self.peek() == Some('(') {
                    return Err(LiteralError {
                        offset: start,
                        message: format!(
                            "Expected a literal value, found a call to `{}`.",
                            name
                        ),
                    });
                }
                Ok(match name.as_str() {
                    "true" => ConstValue::Boolean(true),
                    "false" => ConstValue::Boolean(false),
                    "null" => ConstValue::Null,
                    _ => ConstValue::Enum(name),
                })
            }
            Some(ch) => Err(self.error(format!("Expected a literal value, found `{}`.", ch))),
        }
    }

    fn skip_whitespace_only(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.bump();
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        self.expect('"')?;
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated string literal.")),
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('/') => value.push('/'),
                    Some(other) => {
                        return Err(self.error(format!("Unknown escape sequence `\\{}`.", other)))
                    }
                    None => return Err(self.error("Unterminated string literal.")),
                },
                Some(ch) => value.push(ch),
            }
        }
    }

    fn number(&mut self) -> Result<ConstValue, LiteralError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        let mut is_float = false;
        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' => {}
                '.' | 'e' | 'E' => is_float = true,
                '+' | '-' if is_float => {}
                _ => break,
            }
            self.bump();
        }
        let raw = &self.text[start..self.pos];
        parse_number(raw).map_err(|message| LiteralError {
            offset: start,
            message: message.to_string(),
        })
    }

    fn list(&mut self) -> Result<ConstValue, LiteralError> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_ignored();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(ConstValue::List(items));
            }
            if self.at_end() {
                return Err(self.error("Unterminated list literal."));
            }
            items.push(self.value()?);
        }
    }

    fn object(&mut self) -> Result<ConstValue, LiteralError> {
        self.expect('{')?;
        let mut fields = BTreeMap::new();
        loop {
            self.skip_ignored();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(ConstValue::Object(fields));
            }
            if self.at_end() {
                return Err(self.error("Unterminated object literal."));
            }
            let name = self.name()?;
            self.skip_ignored();
            self.expect(':')?;
            self.skip_ignored();
            let value = self.value()?;
            fields.insert(name, value);
        }
    }
}

fn parse_number(raw: &str) -> Result<ConstValue, &'static str> {
    let digits = raw.replace('_', "");
    if digits.contains(['.', 'e', 'E']) {
        digits
            .parse::<f64>()
            .map(ConstValue::Float)
            .map_err(|_| "Invalid float literal.")
    } else {
        digits
            .parse::<i64>()
            .map(ConstValue::Int)
            .map_err(|_| "Invalid integer literal.")
    }
}

/// An expression that is not a compile-time literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonConstant {
    pub span: Span,
    pub message: String,
}

/// Evaluates a default-value expression.
///
/// Accepted: strings, numbers, booleans, null, arrays and objects of
/// accepted values, and enum member access. Everything else (identifiers,
/// calls, spreads, interpolated templates) is rejected at the offending
/// sub-expression.
pub fn evaluate(expr: &Expr) -> Result<ConstValue, NonConstant> {
    let reject = |what: &str| NonConstant {
        span: expr.span,
        message: format!(
            "Expected a literal default value, found {}. Default values must be constant expressions.",
            what
        ),
    };

    match &expr.kind {
        ExprKind::String(value) => Ok(ConstValue::String(value.clone())),
        ExprKind::Number(raw) => parse_number(raw).map_err(|message| NonConstant {
            span: expr.span,
            message: message.to_string(),
        }),
        ExprKind::Bool(value) => Ok(ConstValue::Boolean(*value)),
        ExprKind::Null => Ok(ConstValue::Null),
        ExprKind::Array(items) => items
            .iter()
            .map(evaluate)
            .collect::<Result<Vec<_>, _>>()
            .map(ConstValue::List),
        ExprKind::Object(entries) => {
            let mut fields = BTreeMap::new();
            for ObjectEntry { key, value } in entries {
                fields.insert(key.clone(), evaluate(value)?);
            }
            Ok(ConstValue::Object(fields))
        }
        ExprKind::EnumMember { member, .. } => Ok(ConstValue::Enum(member.clone())),
        ExprKind::Template {
            value,
            interpolated: false,
        } => Ok(ConstValue::String(value.clone())),
        ExprKind::Template {
            interpolated: true, ..
        } => Err(reject("an interpolated string")),
        ExprKind::Identifier(name) => Err(reject(&format!("a reference to `{}`", name))),
        ExprKind::Call(callee) => Err(reject(&format!("a call to `{}`", callee))),
        ExprKind::Spread(_) => Err(reject("a spread")),
        ExprKind::Other(text) => Err(reject(&format!("`{}`", text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileId;
    use pretty_assertions::assert_eq;

    fn span(start: u32, end: u32) -> Span {
        Span::new(FileId(0), start, end)
    }

    fn expr(kind: ExprKind) -> Expr {
        Expr::new(kind, span(0, 1))
    }

    #[test]
    fn test_parse_arguments() {
        let args = parse_arguments(r#"credits: 10, reason: "slow", tags: [A, B], weight: -1.5"#)
            .unwrap();

        assert_eq!(args.len(), 4);
        assert_eq!(args[0].name, "credits");
        assert_eq!(args[0].value, ConstValue::Int(10));
        assert_eq!(args[1].value, ConstValue::String("slow".to_string()));
        assert_eq!(
            args[2].value,
            ConstValue::List(vec![
                ConstValue::Enum("A".to_string()),
                ConstValue::Enum("B".to_string())
            ])
        );
        assert_eq!(args[3].value, ConstValue::Float(-1.5));
        assert_eq!(args[1].offset, 13);
    }

    #[test]
    fn test_parse_object_value() {
        let value = parse_const_value(r#"{ b: true, a: null }"#).unwrap();
        assert_eq!(value.to_string(), "{a: null, b: true}");
    }

    #[test]
    fn test_variables_are_rejected() {
        let err = parse_arguments("limit: $limit").unwrap_err();
        assert_eq!(err.offset, 7);
        assert!(err.message.contains("Variables are not allowed"));
    }

    #[test]
    fn test_calls_are_rejected() {
        let err = parse_arguments("limit: compute(1)").unwrap_err();
        assert!(err.message.contains("call to `compute`"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse_const_value(r#""abc"#).unwrap_err();
        assert!(err.message.contains("Unterminated"));
    }

    #[test]
    fn test_display_round_trips_strings() {
        let value = ConstValue::String("say \"hi\"".to_string());
        assert_eq!(parse_const_value(&value.to_string()).unwrap(), value);
        assert_eq!(ConstValue::Float(2.0).to_string(), "2.0");
    }

    #[test]
    fn test_evaluate_literal_object_of_literals() {
        let value = evaluate(&expr(ExprKind::Object(vec![
            ObjectEntry {
                key: "first".to_string(),
                value: expr(ExprKind::Number("10".to_string())),
            },
            ObjectEntry {
                key: "tags".to_string(),
                value: expr(ExprKind::Array(vec![expr(ExprKind::String(
                    "a".to_string(),
                ))])),
            },
        ])))
        .unwrap();

        assert_eq!(value.to_string(), r#"{first: 10, tags: ["a"]}"#);
    }

    #[test]
    fn test_evaluate_enum_member() {
        let value = evaluate(&expr(ExprKind::EnumMember {
            owner: "Color".to_string(),
            member: "Red".to_string(),
        }))
        .unwrap();
        assert_eq!(value, ConstValue::Enum("Red".to_string()));
    }

    #[test]
    fn test_evaluate_rejects_nested_call_at_its_span() {
        let call = Expr::new(ExprKind::Call("now".to_string()), span(5, 10));
        let err = evaluate(&expr(ExprKind::Array(vec![
            expr(ExprKind::Bool(true)),
            call,
        ])))
        .unwrap_err();

        assert_eq!(err.span, span(5, 10));
        assert!(err.message.contains("call to `now`"));
    }

    #[test]
    fn test_evaluate_rejects_identifiers_and_interpolation() {
        assert!(evaluate(&expr(ExprKind::Identifier("LIMIT".to_string()))).is_err());
        assert!(evaluate(&expr(ExprKind::Template {
            value: "a{b}".to_string(),
            interpolated: true
        }))
        .is_err());
        assert_eq!(
            evaluate(&expr(ExprKind::Template {
                value: "plain".to_string(),
                interpolated: false
            }))
            .unwrap(),
            ConstValue::String("plain".to_string())
        );
    }
}
