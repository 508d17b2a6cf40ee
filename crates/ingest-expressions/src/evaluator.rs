//! Tree-walking evaluator for parsed expressions

use crate::ast::{CompareOp, Expr, LogicalOp};
use crate::context::EvaluationContext;
use crate::error::{ExpressionError, Result};
use crate::parser::ParsedExpression;
use crate::types::ExpressionValue;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Configuration for the expression evaluator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Setters)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Reject non-boolean results where a boolean is required instead of
    /// coercing them by truthiness
    pub strict_boolean_results: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            strict_boolean_results: true,
        }
    }
}

/// Evaluates parsed expressions against an [`EvaluationContext`].
///
/// Evaluation is pure: it never mutates the expression or the context, so one
/// evaluator and one parsed expression can serve any number of threads.
#[derive(Debug, Clone, Default)]
pub struct ExpressionEvaluator {
    config: EvaluatorConfig,
}

impl ExpressionEvaluator {
    /// Create a new expression evaluator
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate a parsed expression with the given context
    pub fn evaluate(
        &self,
        expression: &ParsedExpression,
        context: &EvaluationContext,
    ) -> Result<ExpressionValue> {
        let value = self.eval(expression.expr(), context)?;
        tracing::trace!(expression = expression.source(), result = %value, "evaluated expression");
        Ok(value)
    }

    /// Evaluate an expression whose result must be a boolean
    pub fn evaluate_bool(
        &self,
        expression: &ParsedExpression,
        context: &EvaluationContext,
    ) -> Result<bool> {
        let value = self.evaluate(expression, context)?;
        self.coerce_bool(&value)
    }

    /// Evaluate an expression whose result must be a string
    pub fn evaluate_string(
        &self,
        expression: &ParsedExpression,
        context: &EvaluationContext,
    ) -> Result<String> {
        match self.evaluate(expression, context)? {
            ExpressionValue::String(s) => Ok(s),
            other => Err(ExpressionError::type_error(format!(
                "expression result is not a string: {}",
                other.get_type()
            ))),
        }
    }

    /// Evaluate an expression whose result must be a number
    pub fn evaluate_number(
        &self,
        expression: &ParsedExpression,
        context: &EvaluationContext,
    ) -> Result<f64> {
        let value = self.evaluate(expression, context)?;
        value.as_number().ok_or_else(|| {
            ExpressionError::type_error(format!(
                "expression result is not a number: {}",
                value.get_type()
            ))
        })
    }

    /// Turn a top-level result into a boolean, honoring strict mode
    pub fn coerce_bool(&self, value: &ExpressionValue) -> Result<bool> {
        match value.as_bool() {
            Some(b) => Ok(b),
            None if self.config.strict_boolean_results => Err(ExpressionError::type_error(
                format!("expression result is not a boolean: {}", value.get_type()),
            )),
            None => Ok(value.is_truthy()),
        }
    }

    fn eval(&self, expr: &Expr, context: &EvaluationContext) -> Result<ExpressionValue> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Path(path) => context.resolve(path),
            Expr::Not(operand) => {
                let value = self.eval(operand, context)?;
                Ok(ExpressionValue::bool(!value.is_truthy()))
            }
            Expr::Compare { op, left, right } => {
                let left = self.eval(left, context)?;
                let right = self.eval(right, context)?;
                compare(*op, &left, &right).map(ExpressionValue::bool)
            }
            // Both operators short-circuit and always yield a boolean, never
            // the operand itself.
            Expr::Logical { op, operands } => {
                let decisive = matches!(op, LogicalOp::Or);
                for operand in operands {
                    if self.eval(operand, context)?.is_truthy() == decisive {
                        return Ok(ExpressionValue::bool(decisive));
                    }
                }
                Ok(ExpressionValue::bool(!decisive))
            }
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition, context)?.is_truthy() {
                    self.eval(then_branch, context)
                } else {
                    self.eval(else_branch, context)
                }
            }
        }
    }
}

fn compare(op: CompareOp, left: &ExpressionValue, right: &ExpressionValue) -> Result<bool> {
    let accepts: fn(Ordering) -> bool = match op {
        CompareOp::Eq => return Ok(left.equals(right)),
        CompareOp::Neq => return Ok(!left.equals(right)),
        CompareOp::Lt => Ordering::is_lt,
        CompareOp::Lte => Ordering::is_le,
        CompareOp::Gt => Ordering::is_gt,
        CompareOp::Gte => Ordering::is_ge,
    };
    // Unordered operands (undefined, NaN) never satisfy an ordering
    Ok(left.compare(right, op.symbol())?.is_some_and(accepts))
}
