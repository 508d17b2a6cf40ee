//! Tokenizer for the expression surface syntax

use crate::error::{ExpressionError, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier, e.g. `event` or `orderId`
    Ident(String),
    /// Quoted string literal, content without the quotes
    Str(String),
    /// Integer literal
    Int(i64),
    /// Decimal literal
    Float(f64),
    True,
    False,
    Null,
    // Punctuation
    Dot,
    LParen,
    RParen,
    Question,
    Colon,
    // Comparison operators
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    // Logical operators
    And,
    Or,
    Not,
    // End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "identifier '{name}'"),
            Token::Str(s) => write!(f, "string '{s}'"),
            Token::Int(i) => write!(f, "number {i}"),
            Token::Float(x) => write!(f, "number {x}"),
            Token::True => f.write_str("'true'"),
            Token::False => f.write_str("'false'"),
            Token::Null => f.write_str("'null'"),
            Token::Dot => f.write_str("'.'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Question => f.write_str("'?'"),
            Token::Colon => f.write_str("':'"),
            Token::Eq => f.write_str("'=='"),
            Token::Neq => f.write_str("'!='"),
            Token::Lt => f.write_str("'<'"),
            Token::Lte => f.write_str("'<='"),
            Token::Gt => f.write_str("'>'"),
            Token::Gte => f.write_str("'>='"),
            Token::And => f.write_str("'&&'"),
            Token::Or => f.write_str("'||'"),
            Token::Not => f.write_str("'!'"),
            Token::Eof => f.write_str("end of expression"),
        }
    }
}

/// A token with its byte offset and the source text it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
    pub text: String,
}

/// Split an expression into tokens. The last token is always [`Token::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Spanned>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let c = bytes[pos];

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;

        // String literal, no escape processing
        if c == b'\'' || c == b'"' {
            let close = bytes[pos + 1..]
                .iter()
                .position(|&b| b == c)
                .map(|offset| pos + 1 + offset)
                .ok_or_else(|| {
                    ExpressionError::parse_error(
                        "unterminated string literal",
                        start,
                        &source[start..],
                    )
                })?;
            tokens.push(Spanned {
                token: Token::Str(source[start + 1..close].to_string()),
                position: start,
                text: source[start..=close].to_string(),
            });
            pos = close + 1;
            continue;
        }

        // Number literal, optionally negative
        let negative_number =
            c == b'-' && bytes.get(pos + 1).is_some_and(|b| b.is_ascii_digit());
        if c.is_ascii_digit() || negative_number {
            let (token, end) = lex_number(source, start)?;
            tokens.push(Spanned {
                token,
                position: start,
                text: source[start..end].to_string(),
            });
            pos = end;
            continue;
        }

        // Identifier or keyword
        if c.is_ascii_alphabetic() || c == b'_' {
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            let word = &source[start..pos];
            let token = match word {
                "true" => Token::True,
                "false" => Token::False,
                "null" => Token::Null,
                _ => Token::Ident(word.to_string()),
            };
            tokens.push(Spanned {
                token,
                position: start,
                text: word.to_string(),
            });
            continue;
        }

        let next = bytes.get(pos + 1).copied();
        let (token, width) = match (c, next) {
            (b'=', Some(b'=')) => (Token::Eq, 2),
            (b'!', Some(b'=')) => (Token::Neq, 2),
            (b'<', Some(b'=')) => (Token::Lte, 2),
            (b'>', Some(b'=')) => (Token::Gte, 2),
            (b'&', Some(b'&')) => (Token::And, 2),
            (b'|', Some(b'|')) => (Token::Or, 2),
            (b'<', _) => (Token::Lt, 1),
            (b'>', _) => (Token::Gt, 1),
            (b'!', _) => (Token::Not, 1),
            (b'.', _) => (Token::Dot, 1),
            (b'(', _) => (Token::LParen, 1),
            (b')', _) => (Token::RParen, 1),
            (b'?', _) => (Token::Question, 1),
            (b':', _) => (Token::Colon, 1),
            _ => {
                let fragment = source[start..].chars().next().map(String::from).unwrap_or_default();
                let message = match c {
                    b'=' => "assignment is not supported, use '=='",
                    b'&' => "expected '&&'",
                    b'|' => "expected '||'",
                    _ => "unrecognized character",
                };
                return Err(ExpressionError::parse_error(message, start, fragment));
            }
        };
        tokens.push(Spanned {
            token,
            position: start,
            text: source[start..start + width].to_string(),
        });
        pos += width;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        position: source.len(),
        text: String::new(),
    });
    Ok(tokens)
}

/// Read an integer or decimal literal starting at `start`
fn lex_number(source: &str, start: usize) -> Result<(Token, usize)> {
    let bytes = source.as_bytes();
    let mut pos = start;
    if bytes[pos] == b'-' {
        pos += 1;
    }
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }

    let mut is_decimal = false;
    if pos < bytes.len() && bytes[pos] == b'.' {
        if !bytes.get(pos + 1).is_some_and(|b| b.is_ascii_digit()) {
            return Err(ExpressionError::parse_error(
                "malformed number",
                start,
                &source[start..=pos],
            ));
        }
        is_decimal = true;
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
    }

    if pos < bytes.len() && (bytes[pos].is_ascii_alphabetic() || bytes[pos] == b'_') {
        let mut end = pos;
        while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
            end += 1;
        }
        return Err(ExpressionError::parse_error(
            "malformed number",
            start,
            &source[start..end],
        ));
    }

    let text = &source[start..pos];
    let token = if is_decimal {
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| ExpressionError::parse_error("invalid decimal literal", start, text))?
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| ExpressionError::parse_error("integer literal out of range", start, text))?
    };
    Ok((token, pos))
}
