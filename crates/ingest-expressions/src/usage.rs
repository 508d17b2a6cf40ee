//! Where an expression is used and what that implies
//!
//! A function configuration uses expressions in several slots: the trigger
//! `if`, batch filters, `cancelOn`, `waitForEvent`, flow-control keys and
//! priority `run`. Each slot fixes which records are bound and which result
//! type is expected.

use crate::ast::Root;
use crate::error::{ExpressionError, Result};
use crate::parser::ParsedExpression;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionUsage {
    /// Trigger `if` filter
    Trigger,
    /// Batch `if` filter
    BatchFilter,
    /// `cancelOn` condition
    Cancellation,
    /// `waitForEvent` condition
    WaitForEvent,
    /// Concurrency, throttle, rate limit, debounce, batch or idempotency key
    FlowKey,
    /// Priority `run` expression
    Priority,
}

impl ExpressionUsage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::BatchFilter => "batch filter",
            Self::Cancellation => "cancellation",
            Self::WaitForEvent => "wait for event",
            Self::FlowKey => "flow-control key",
            Self::Priority => "priority",
        }
    }

    /// Whether `async` is bound for this usage
    pub fn binds_async(self) -> bool {
        matches!(self, Self::Cancellation | Self::WaitForEvent)
    }

    pub fn binds(self, root: Root) -> bool {
        match root {
            Root::Event => true,
            Root::Async => self.binds_async(),
        }
    }

    /// Reject expressions that reference records this usage does not bind
    pub fn check(self, expression: &ParsedExpression) -> Result<()> {
        if expression.references_async() && !self.binds_async() {
            return Err(ExpressionError::binding_error(
                Root::Async.name(),
                format!(
                    "cannot be used in a {} expression, only in cancellation and wait-for-event expressions",
                    self.name()
                ),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ExpressionUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Condition attached to a correlation: a full expression or the match
/// shorthand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// Full expression, e.g. `event.data.orderId == async.data.orderId`
    If(String),
    /// Field path compared between `event` and `async`, e.g. `data.orderId`
    Match(String),
}

impl Condition {
    /// Canonical expression text for this condition
    pub fn to_expression(&self, usage: ExpressionUsage) -> Result<String> {
        match self {
            Self::If(expression) => Ok(expression.clone()),
            Self::Match(path) => {
                if !usage.binds_async() {
                    return Err(ExpressionError::configuration_error(format!(
                        "match shorthand requires an 'async' event and cannot be used in a {} expression",
                        usage.name()
                    )));
                }
                expand_match(path)
            }
        }
    }
}

/// Expand `match: "data.userId"` into `event.data.userId == async.data.userId`.
///
/// A leading `event.` is accepted and stripped. Every segment must be a plain
/// identifier.
pub fn expand_match(path: &str) -> Result<String> {
    let trimmed = path.trim();
    let field = trimmed.strip_prefix("event.").unwrap_or(trimmed);

    let valid = !field.is_empty()
        && field.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !valid {
        return Err(ExpressionError::configuration_error(format!(
            "invalid match field path '{path}', expected a dotted path such as 'data.userId'"
        )));
    }

    Ok(format!("event.{field} == async.{field}"))
}
