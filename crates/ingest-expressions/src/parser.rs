//! Recursive-descent parser for the expression language
//!
//! Precedence, lowest first:
//!
//! ```text
//! conditional := or ( '?' conditional ':' conditional )?
//! or          := and ( '||' and )*
//! and         := comparison ( '&&' comparison )*
//! comparison  := unary ( relop unary )?
//! unary       := '!' unary | primary
//! primary     := literal | path | '(' conditional ')'
//! path        := ( 'event' | 'async' ) ( '.' name )*
//! ```

use crate::ast::{CompareOp, Expr, FieldPath, LogicalOp, Root};
use crate::error::{ExpressionError, Result};
use crate::lexer::{Spanned, Token, tokenize};
use crate::security::SecurityManager;
use crate::types::ExpressionValue;
use serde::Serialize;

/// Parsed expression with its syntax tree and metadata.
///
/// Immutable once built; share it behind an `Arc` to evaluate from many
/// threads at once.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpression {
    source: String,
    expr: Expr,
    metadata: ExpressionMetadata,
}

impl ParsedExpression {
    fn new(source: String, expr: Expr) -> Self {
        let metadata = ExpressionMetadata::from_expression(&expr);
        Self {
            source,
            expr,
            metadata,
        }
    }

    /// Get the original source code
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn metadata(&self) -> &ExpressionMetadata {
        &self.metadata
    }

    /// Whether the expression reads the candidate event
    pub fn references_async(&self) -> bool {
        self.metadata.references_async
    }

    /// Field paths referenced in the expression
    pub fn paths(&self) -> &[String] {
        &self.metadata.paths
    }

    pub fn complexity(&self) -> u32 {
        self.metadata.complexity
    }
}

/// Metadata about a parsed expression
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ExpressionMetadata {
    /// Distinct field paths, in order of first appearance
    pub paths: Vec<String>,
    /// Whether any path starts at `async`
    pub references_async: bool,
    /// Number of syntax tree nodes
    pub complexity: u32,
    /// Height of the syntax tree
    pub depth: usize,
}

impl ExpressionMetadata {
    pub fn from_expression(expr: &Expr) -> Self {
        let mut found = Vec::new();
        expr.collect_paths(&mut found);

        let mut paths: Vec<String> = Vec::new();
        for path in &found {
            let rendered = path.to_string();
            if !paths.contains(&rendered) {
                paths.push(rendered);
            }
        }

        Self {
            paths,
            references_async: found.iter().any(|path| path.root == Root::Async),
            complexity: expr.node_count(),
            depth: expr.depth(),
        }
    }
}

/// Expression parser that converts strings to [`ParsedExpression`]s
#[derive(Debug, Clone, Default)]
pub struct ExpressionParser {
    security: SecurityManager,
}

impl ExpressionParser {
    /// Create a parser with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that enforces the given limits
    pub fn with_security(security: SecurityManager) -> Self {
        Self { security }
    }

    /// Parse an expression string into a ParsedExpression
    pub fn parse(&self, source: &str) -> Result<ParsedExpression> {
        self.security.check_source(source)?;

        if source.trim().is_empty() {
            return Err(ExpressionError::parse_error(
                "expression cannot be empty",
                0,
                source,
            ));
        }

        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
            security: &self.security,
        };
        let expr = parser.parse_conditional()?;
        parser.expect_end()?;

        Ok(ParsedExpression::new(source.to_string(), expr))
    }

    pub fn security(&self) -> &SecurityManager {
        &self.security
    }
}

struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    security: &'a SecurityManager,
}

impl Parser<'_> {
    fn peek(&self) -> &Spanned {
        // tokenize always ends with Eof and the parser never advances past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Spanned {
        let token = self.peek().clone();
        if token.token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        self.security.check_depth(self.depth)
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn error_at(spanned: &Spanned, message: impl Into<String>) -> ExpressionError {
        ExpressionError::parse_error(message, spanned.position, spanned.text.clone())
    }

    fn expect_end(&self) -> Result<()> {
        let next = self.peek();
        match next.token {
            Token::Eof => Ok(()),
            Token::RParen => Err(Self::error_at(next, "unmatched ')'")),
            _ => Err(Self::error_at(
                next,
                format!("unexpected {}, expected an operator or end of expression", next.token),
            )),
        }
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        self.enter()?;
        let condition = self.parse_or()?;

        let expr = if self.peek().token == Token::Question {
            self.advance();
            let then_branch = self.parse_conditional()?;
            let next = self.peek();
            if next.token != Token::Colon {
                return Err(Self::error_at(
                    next,
                    format!("expected ':' in conditional, found {}", next.token),
                ));
            }
            self.advance();
            let else_branch = self.parse_conditional()?;
            Expr::Conditional {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            }
        } else {
            condition
        };

        self.leave();
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let first = self.parse_and()?;
        self.parse_chain(LogicalOp::Or, Token::Or, first, Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let first = self.parse_comparison()?;
        self.parse_chain(LogicalOp::And, Token::And, first, Self::parse_comparison)
    }

    /// Collect `a op b op c ...` into a single flat node
    fn parse_chain(
        &mut self,
        op: LogicalOp,
        separator: Token,
        first: Expr,
        mut operand: impl FnMut(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        if self.peek().token != separator {
            return Ok(first);
        }

        let mut operands = vec![first];
        while self.peek().token == separator {
            self.advance();
            operands.push(operand(self)?);
        }
        Ok(Expr::Logical { op, operands })
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_unary()?;
        let Some(op) = compare_op(&self.peek().token) else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_unary()?;

        let next = self.peek();
        if compare_op(&next.token).is_some() {
            return Err(Self::error_at(
                next,
                "comparison operators cannot be chained, use '&&'",
            ));
        }

        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.peek().token != Token::Not {
            return self.parse_primary();
        }
        self.advance();
        self.enter()?;
        let operand = self.parse_unary()?;
        self.leave();
        Ok(Expr::Not(Box::new(operand)))
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let spanned = self.advance();
        let literal = match &spanned.token {
            Token::Str(s) => ExpressionValue::string(s.clone()),
            Token::Int(i) => ExpressionValue::int(*i),
            Token::Float(f) => ExpressionValue::float(*f),
            Token::True => ExpressionValue::bool(true),
            Token::False => ExpressionValue::bool(false),
            Token::Null => ExpressionValue::null(),
            Token::Ident(name) => return self.parse_path(name, &spanned),
            Token::LParen => {
                let inner = self.parse_conditional()?;
                if self.peek().token != Token::RParen {
                    return Err(Self::error_at(&spanned, "unclosed '('"));
                }
                self.advance();
                return Ok(inner);
            }
            Token::Eof => {
                return Err(Self::error_at(
                    &spanned,
                    "unexpected end of expression, expected an operand",
                ));
            }
            other => {
                return Err(Self::error_at(
                    &spanned,
                    format!("expected an operand, found {other}"),
                ));
            }
        };
        Ok(Expr::Literal(literal))
    }

    fn parse_path(&mut self, name: &str, spanned: &Spanned) -> Result<Expr> {
        let root = Root::from_name(name).ok_or_else(|| {
            ExpressionError::binding_error(
                name,
                format!(
                    "is not a known name at position {}, expected 'event' or 'async'",
                    spanned.position
                ),
            )
        })?;

        let mut segments = Vec::new();
        while self.peek().token == Token::Dot {
            self.advance();
            let next = self.advance();
            match next.token {
                Token::Ident(segment) => segments.push(segment),
                Token::True | Token::False | Token::Null => segments.push(next.text),
                _ => {
                    return Err(Self::error_at(
                        &next,
                        format!("expected a field name after '.', found {}", next.token),
                    ));
                }
            }
        }
        self.security.check_path(segments.len() + 1)?;

        Ok(Expr::Path(FieldPath::new(root, segments)))
    }
}

fn compare_op(token: &Token) -> Option<CompareOp> {
    match token {
        Token::Eq => Some(CompareOp::Eq),
        Token::Neq => Some(CompareOp::Neq),
        Token::Lt => Some(CompareOp::Lt),
        Token::Lte => Some(CompareOp::Lte),
        Token::Gt => Some(CompareOp::Gt),
        Token::Gte => Some(CompareOp::Gte),
        _ => None,
    }
}
