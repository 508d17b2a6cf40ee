//! Compiled expressions bound to a function-configuration slot
//!
//! Each wrapper pairs a shared [`ParsedExpression`] with an evaluator and
//! returns the native type its slot needs: a match decision, a key string or
//! a priority in seconds.

use crate::context::EvaluationContext;
use crate::error::{ExpressionError, Result};
use crate::evaluator::ExpressionEvaluator;
use crate::parser::ParsedExpression;
use crate::types::ExpressionValue;
use crate::usage::{Condition, ExpressionUsage};
use ingest_core::{Event, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lowest priority adjustment, in seconds
pub const PRIORITY_MIN: i64 = -600;
/// Highest priority adjustment, in seconds
pub const PRIORITY_MAX: i64 = 600;

/// Correlation between a run's triggering event and a later event, as
/// written in a function's `cancelOn` or `waitForEvent` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Name of the event to wait for
    pub event: String,
    /// Full correlation expression
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub r#if: Option<String>,
    /// Field path shorthand compared between both events
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub r#match: Option<String>,
    /// How long to wait, handled by the scheduler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// `cancelOn` entry
pub type CancelOn = CorrelationConfig;
/// `waitForEvent` step options
pub type WaitForEventConfig = CorrelationConfig;

impl CorrelationConfig {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            r#if: None,
            r#match: None,
            timeout: None,
        }
    }

    pub fn with_if(mut self, expression: impl Into<String>) -> Self {
        self.r#if = Some(expression.into());
        self
    }

    pub fn with_match(mut self, path: impl Into<String>) -> Self {
        self.r#match = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// The configured condition, if any. `if` and `match` are mutually
    /// exclusive.
    pub fn condition(&self) -> Result<Option<Condition>> {
        match (&self.r#if, &self.r#match) {
            (Some(_), Some(_)) => Err(ExpressionError::configuration_error(format!(
                "correlation on '{}' sets both 'if' and 'match', use only one",
                self.event
            ))),
            (Some(expression), None) => Ok(Some(Condition::If(expression.clone()))),
            (None, Some(path)) => Ok(Some(Condition::Match(path.clone()))),
            (None, None) => Ok(None),
        }
    }
}

/// Trigger or batch `if` filter
#[derive(Debug, Clone)]
pub struct EventFilter {
    expression: Arc<ParsedExpression>,
    evaluator: ExpressionEvaluator,
}

impl EventFilter {
    pub fn new(expression: Arc<ParsedExpression>, evaluator: ExpressionEvaluator) -> Self {
        Self {
            expression,
            evaluator,
        }
    }

    pub fn expression(&self) -> &ParsedExpression {
        &self.expression
    }

    /// Whether the event passes the filter
    pub fn matches(&self, event: &Event) -> Result<bool> {
        let context = EvaluationContext::from_event(event)?;
        self.evaluator.evaluate_bool(&self.expression, &context)
    }

    /// Same as [`EventFilter::matches`] for a raw event envelope
    pub fn matches_json(&self, event: &Json) -> Result<bool> {
        let context = EvaluationContext::new(event.clone());
        self.evaluator.evaluate_bool(&self.expression, &context)
    }
}

/// Decides whether a later event cancels a run or resolves a wait.
///
/// A candidate must carry the configured event name before the condition is
/// considered. Without a condition every event with that name matches.
#[derive(Debug, Clone)]
pub struct EventMatcher {
    usage: ExpressionUsage,
    event: String,
    condition: Option<Arc<ParsedExpression>>,
    timeout: Option<String>,
    evaluator: ExpressionEvaluator,
}

/// Compiled `cancelOn` entry
pub type Cancellation = EventMatcher;
/// Compiled `waitForEvent` options
pub type WaitForEvent = EventMatcher;

impl EventMatcher {
    pub fn new(
        usage: ExpressionUsage,
        event: impl Into<String>,
        condition: Option<Arc<ParsedExpression>>,
        evaluator: ExpressionEvaluator,
    ) -> Self {
        Self {
            usage,
            event: event.into(),
            condition,
            timeout: None,
            evaluator,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<String>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn usage(&self) -> ExpressionUsage {
        self.usage
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn condition(&self) -> Option<&ParsedExpression> {
        self.condition.as_deref()
    }

    pub fn timeout(&self) -> Option<&str> {
        self.timeout.as_deref()
    }

    /// Whether `candidate` correlates with the run's `original` event
    pub fn matches(&self, original: &Event, candidate: &Event) -> Result<bool> {
        if !candidate.matches_pattern(&self.event) {
            tracing::trace!(
                expected = %self.event,
                received = candidate.name(),
                "candidate event name does not match"
            );
            return Ok(false);
        }

        match &self.condition {
            Some(expression) => {
                let context = EvaluationContext::from_events(original, candidate)?;
                self.evaluator.evaluate_bool(expression, &context)
            }
            None => Ok(true),
        }
    }
}

/// Flow-control key: concurrency, throttle, rate limit, debounce, batch or
/// idempotency
#[derive(Debug, Clone)]
pub struct FlowKey {
    expression: Arc<ParsedExpression>,
    evaluator: ExpressionEvaluator,
}

impl FlowKey {
    pub fn new(expression: Arc<ParsedExpression>, evaluator: ExpressionEvaluator) -> Self {
        Self {
            expression,
            evaluator,
        }
    }

    pub fn expression(&self) -> &ParsedExpression {
        &self.expression
    }

    /// Key for the event
    pub fn evaluate(&self, event: &Event) -> Result<String> {
        let context = EvaluationContext::from_event(event)?;
        let value = self.evaluator.evaluate(&self.expression, &context)?;
        render_key(&value)
    }
}

/// Canonical key text for a scalar result
pub fn render_key(value: &ExpressionValue) -> Result<String> {
    match value {
        ExpressionValue::String(s) => Ok(s.clone()),
        ExpressionValue::Bool(b) => Ok(b.to_string()),
        ExpressionValue::Int(i) => Ok(i.to_string()),
        // f64 display omits the fraction of whole numbers, so 5.0 keys as "5"
        ExpressionValue::Float(f) if f.is_finite() => Ok(f.to_string()),
        other => Err(ExpressionError::type_error(format!(
            "flow-control key must be a string, number or boolean, got {}",
            other.get_type()
        ))),
    }
}

/// Priority `run` expression
#[derive(Debug, Clone)]
pub struct Priority {
    expression: Arc<ParsedExpression>,
    evaluator: ExpressionEvaluator,
}

impl Priority {
    pub fn new(expression: Arc<ParsedExpression>, evaluator: ExpressionEvaluator) -> Self {
        Self {
            expression,
            evaluator,
        }
    }

    pub fn expression(&self) -> &ParsedExpression {
        &self.expression
    }

    /// Priority adjustment in whole seconds
    pub fn evaluate(&self, event: &Event) -> Result<i64> {
        let context = EvaluationContext::from_event(event)?;
        let value = self.evaluator.evaluate(&self.expression, &context)?;
        priority_seconds(&value)
    }
}

/// Truncate a numeric result to whole seconds within
/// [`PRIORITY_MIN`]..=[`PRIORITY_MAX`]. A missing result means no adjustment.
pub fn priority_seconds(value: &ExpressionValue) -> Result<i64> {
    let seconds = match value {
        ExpressionValue::Undefined | ExpressionValue::Null => 0,
        ExpressionValue::Int(i) => *i,
        ExpressionValue::Float(f) if !f.is_nan() => f.trunc() as i64,
        other => {
            return Err(ExpressionError::type_error(format!(
                "priority must be a number, got {}",
                other.get_type()
            )));
        }
    };
    Ok(seconds.clamp(PRIORITY_MIN, PRIORITY_MAX))
}
