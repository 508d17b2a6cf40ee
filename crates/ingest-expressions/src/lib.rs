//! # ingest-expressions
//!
//! Expression language for event filtering, event correlation and flow
//! control in the Inngest durable functions platform.
//!
//! Expressions are small CEL-like formulas over the triggering `event` and,
//! for `cancelOn` and `waitForEvent`, a later `async` event:
//!
//! - field paths such as `event.data.orderId`
//! - string, number, `true`, `false` and `null` literals
//! - comparisons `== != < <= > >=`
//! - logical `&& || !` and the conditional `cond ? a : b`
//!
//! ## Quick Start
//!
//! ```rust
//! use ingest_expressions::{EvaluationContext, ExpressionEngine};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = ExpressionEngine::new();
//! let context = EvaluationContext::new(json!({
//!     "name": "app/user.created",
//!     "data": {"user_id": "123", "plan": "premium"}
//! }));
//!
//! let is_premium = engine.evaluate_bool("event.data.plan == 'premium'", &context)?;
//! let user_id = engine.evaluate_string("event.data.user_id", &context)?;
//! assert!(is_premium);
//! assert_eq!(user_id, "123");
//! # Ok(())
//! # }
//! ```
//!
//! ## Correlating events
//!
//! ```rust
//! use ingest_core::Event;
//! use ingest_expressions::{CorrelationConfig, ExpressionEngine};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = ExpressionEngine::new();
//! let cancel_on = engine.cancellation(
//!     &CorrelationConfig::new("app/order.cancelled").with_match("data.orderId"),
//! )?;
//!
//! let original = Event::new("app/order.created", json!({"orderId": "A1"}));
//! let candidate = Event::new("app/order.cancelled", json!({"orderId": "A1"}));
//! assert!(cancel_on.matches(&original, &candidate)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Limits and caching
//!
//! ```rust
//! use ingest_expressions::{ExpressionEngine, PerformanceConfig, SecurityConfig};
//!
//! let engine = ExpressionEngine::builder()
//!     .with_security(SecurityConfig::default().max_nesting_depth(16))
//!     .with_performance(PerformanceConfig::default().cache_size(500))
//!     .build();
//! assert_eq!(engine.cache().capacity(), 500);
//! ```

pub mod ast;
pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod flow;
pub mod lexer;
pub mod parser;
pub mod performance;
pub mod security;
pub mod types;
pub mod usage;

// Re-export commonly used types
pub use crate::config::{ConfigLoader, EngineConfig};
pub use context::EvaluationContext;
pub use error::{ErrorCategory, ExpressionError, Result};
pub use evaluator::{EvaluatorConfig, ExpressionEvaluator};
pub use flow::{
    CancelOn, Cancellation, CorrelationConfig, EventFilter, EventMatcher, FlowKey, Priority,
    WaitForEvent, WaitForEventConfig,
};
pub use parser::{ExpressionMetadata, ExpressionParser, ParsedExpression};
pub use performance::{CacheStats, ExpressionCache, PerformanceConfig};
pub use security::{SecurityConfig, SecurityManager};
pub use types::{ExpressionType, ExpressionValue};
pub use usage::{Condition, ExpressionUsage};

use std::sync::Arc;

/// Main expression engine that combines all components
#[derive(Debug)]
pub struct ExpressionEngine {
    parser: ExpressionParser,
    evaluator: ExpressionEvaluator,
    cache: ExpressionCache,
}

impl ExpressionEngine {
    /// Create a new expression engine with default configuration
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for configuring the expression engine
    pub fn builder() -> ExpressionEngineBuilder {
        ExpressionEngineBuilder::new()
    }

    /// Create an engine from a validated configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::builder()
            .with_security(config.security.clone())
            .with_performance(config.performance.clone())
            .with_evaluator(config.evaluator.clone())
            .build())
    }

    /// Parse an expression, reusing the cached tree when the same text was
    /// seen before
    pub fn parse(&self, source: &str) -> Result<Arc<ParsedExpression>> {
        if let Some(cached) = self.cache.get(source) {
            return Ok(cached);
        }

        let parsed = Arc::new(self.parser.parse(source)?);
        self.cache.insert(Arc::clone(&parsed));
        Ok(parsed)
    }

    /// Parse an expression for a configuration slot, rejecting references
    /// to records the slot does not bind
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn compile(&self, source: &str, usage: ExpressionUsage) -> Result<Arc<ParsedExpression>> {
        let parsed = self.parse(source)?;
        usage.check(&parsed)?;
        tracing::debug!(
            complexity = parsed.complexity(),
            paths = ?parsed.paths(),
            "compiled expression"
        );
        Ok(parsed)
    }

    /// Evaluate an expression and return the result as a value
    pub fn evaluate(&self, source: &str, context: &EvaluationContext) -> Result<ExpressionValue> {
        let parsed = self.parse(source)?;
        self.evaluator.evaluate(&parsed, context)
    }

    /// Evaluate an expression and return the result as a boolean
    pub fn evaluate_bool(&self, source: &str, context: &EvaluationContext) -> Result<bool> {
        let parsed = self.parse(source)?;
        self.evaluator.evaluate_bool(&parsed, context)
    }

    /// Evaluate an expression and return the result as a string
    pub fn evaluate_string(&self, source: &str, context: &EvaluationContext) -> Result<String> {
        let parsed = self.parse(source)?;
        self.evaluator.evaluate_string(&parsed, context)
    }

    /// Evaluate an expression and return the result as a number
    pub fn evaluate_number(&self, source: &str, context: &EvaluationContext) -> Result<f64> {
        let parsed = self.parse(source)?;
        self.evaluator.evaluate_number(&parsed, context)
    }

    /// Compile a trigger `if` filter
    pub fn trigger_filter(&self, source: &str) -> Result<EventFilter> {
        let expression = self.compile(source, ExpressionUsage::Trigger)?;
        Ok(EventFilter::new(expression, self.evaluator.clone()))
    }

    /// Compile a batch `if` filter
    pub fn batch_filter(&self, source: &str) -> Result<EventFilter> {
        let expression = self.compile(source, ExpressionUsage::BatchFilter)?;
        Ok(EventFilter::new(expression, self.evaluator.clone()))
    }

    /// Compile a `cancelOn` entry
    pub fn cancellation(&self, config: &CancelOn) -> Result<Cancellation> {
        self.correlation(config, ExpressionUsage::Cancellation)
    }

    /// Compile `waitForEvent` options
    pub fn wait_for_event(&self, config: &WaitForEventConfig) -> Result<WaitForEvent> {
        self.correlation(config, ExpressionUsage::WaitForEvent)
    }

    /// Compile a flow-control key expression
    pub fn flow_key(&self, source: &str) -> Result<FlowKey> {
        let expression = self.compile(source, ExpressionUsage::FlowKey)?;
        Ok(FlowKey::new(expression, self.evaluator.clone()))
    }

    /// Compile a priority `run` expression
    pub fn priority(&self, source: &str) -> Result<Priority> {
        let expression = self.compile(source, ExpressionUsage::Priority)?;
        Ok(Priority::new(expression, self.evaluator.clone()))
    }

    fn correlation(
        &self,
        config: &CorrelationConfig,
        usage: ExpressionUsage,
    ) -> Result<EventMatcher> {
        if config.event.trim().is_empty() {
            return Err(ExpressionError::configuration_error(format!(
                "{usage} configuration requires an event name"
            )));
        }

        let condition = match config.condition()? {
            Some(condition) => {
                let source = condition.to_expression(usage)?;
                Some(self.compile(&source, usage)?)
            }
            None => None,
        };

        Ok(
            EventMatcher::new(usage, config.event.as_str(), condition, self.evaluator.clone())
                .with_timeout(config.timeout.clone()),
        )
    }

    /// Get access to the parser
    pub fn parser(&self) -> &ExpressionParser {
        &self.parser
    }

    /// Get access to the evaluator
    pub fn evaluator(&self) -> &ExpressionEvaluator {
        &self.evaluator
    }

    /// Get access to the cache
    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }
}

impl Default for ExpressionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring an ExpressionEngine
#[derive(Debug, Default)]
pub struct ExpressionEngineBuilder {
    security_config: Option<SecurityConfig>,
    performance_config: Option<PerformanceConfig>,
    evaluator_config: Option<EvaluatorConfig>,
}

impl ExpressionEngineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure security settings
    pub fn with_security(mut self, config: SecurityConfig) -> Self {
        self.security_config = Some(config);
        self
    }

    /// Configure performance settings
    pub fn with_performance(mut self, config: PerformanceConfig) -> Self {
        self.performance_config = Some(config);
        self
    }

    /// Configure evaluator settings
    pub fn with_evaluator(mut self, config: EvaluatorConfig) -> Self {
        self.evaluator_config = Some(config);
        self
    }

    /// Build the expression engine
    pub fn build(self) -> ExpressionEngine {
        let security_config = self.security_config.unwrap_or_default();
        let performance_config = self.performance_config.unwrap_or_default();
        let evaluator_config = self.evaluator_config.unwrap_or_default();

        ExpressionEngine {
            parser: ExpressionParser::with_security(SecurityManager::new(security_config)),
            evaluator: ExpressionEvaluator::new(evaluator_config),
            cache: ExpressionCache::with_config(&performance_config),
        }
    }
}

/// Expression processing prelude for common imports
pub mod prelude {
    pub use crate::{
        CorrelationConfig, EngineConfig, EvaluationContext, EvaluatorConfig, ExpressionEngine,
        ExpressionError, ExpressionUsage, ExpressionValue, PerformanceConfig, Result,
        SecurityConfig,
    };
    pub use ingest_core::{Event, Json};
    pub use serde_json::json;
}
