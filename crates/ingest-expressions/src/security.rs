//! Resource limits applied while parsing expressions
//!
//! Evaluation walks the parsed tree recursively. `&&` and `||` chains are kept
//! flat, so the tree only deepens through parentheses, negations and
//! conditionals, which is exactly what the nesting depth limit counts.

use crate::error::{ExpressionError, Result};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};

/// Security configuration for expression parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Setters)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum expression length in bytes
    pub max_expression_length: usize,
    /// Maximum nesting of parentheses, negations and conditionals
    pub max_nesting_depth: usize,
    /// Maximum number of names in a field path, root included
    pub max_path_segments: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_expression_length: 10_000,
            max_nesting_depth: 64,
            max_path_segments: 32,
        }
    }
}

impl SecurityConfig {
    /// Check the limits are usable
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("security.max_expression_length", self.max_expression_length),
            ("security.max_nesting_depth", self.max_nesting_depth),
            ("security.max_path_segments", self.max_path_segments),
        ] {
            if value == 0 {
                return Err(ExpressionError::configuration_error(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

/// Enforces [`SecurityConfig`] limits
#[derive(Debug, Clone, Default)]
pub struct SecurityManager {
    config: SecurityConfig,
}

impl SecurityManager {
    /// Create a new security manager
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    pub fn check_source(&self, source: &str) -> Result<()> {
        check("expression length", source.len(), self.config.max_expression_length)
    }

    pub fn check_depth(&self, depth: usize) -> Result<()> {
        check("nesting depth", depth, self.config.max_nesting_depth)
    }

    pub fn check_path(&self, segments: usize) -> Result<()> {
        check("field path length", segments, self.config.max_path_segments)
    }
}

fn check(limit: &str, actual: usize, maximum: usize) -> Result<()> {
    if actual > maximum {
        tracing::warn!(limit, actual, maximum, "expression rejected by resource limit");
        return Err(ExpressionError::limit_exceeded(limit, actual, maximum));
    }
    Ok(())
}
