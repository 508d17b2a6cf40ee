//! Error types for the expression engine

use thiserror::Error;

/// Result type for expression operations
pub type Result<T> = std::result::Result<T, ExpressionError>;

/// Errors raised while compiling or evaluating expressions.
///
/// All of them are deterministic: the same expression text, usage and context
/// shape always produce the same error. A missing field inside a payload is
/// never an error; it evaluates to `undefined`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpressionError {
    /// Malformed expression text
    #[error("Parse error at position {position} near '{fragment}': {message}")]
    ParseError {
        message: String,
        position: usize,
        fragment: String,
    },

    /// Reference to a root name that is unknown or not bound in this context
    #[error("Binding error: '{name}' {message}")]
    BindingError { name: String, message: String },

    /// Incompatible operand or result types
    #[error("Type error: {message}")]
    TypeError { message: String },

    /// Invalid expression configuration, e.g. a misplaced match shorthand
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Expression exceeds a configured resource limit
    #[error("Limit exceeded: {limit} is {actual}, maximum is {maximum}")]
    LimitExceeded {
        limit: String,
        actual: usize,
        maximum: usize,
    },

    /// Event could not be turned into an evaluation record
    #[error("Invalid event: {message}")]
    InvalidEvent { message: String },

    /// Engine configuration could not be loaded
    #[error("Config loading error: {message}")]
    ConfigLoading { message: String },
}

impl ExpressionError {
    /// Create a parse error
    pub fn parse_error(
        message: impl Into<String>,
        position: usize,
        fragment: impl Into<String>,
    ) -> Self {
        Self::ParseError {
            message: message.into(),
            position,
            fragment: fragment.into(),
        }
    }

    /// Create a binding error
    pub fn binding_error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BindingError {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a type error
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    /// Create a type error for an operator applied to incompatible operands
    pub fn unsupported_operation(
        operation: &str,
        left_type: impl std::fmt::Display,
        right_type: impl std::fmt::Display,
    ) -> Self {
        Self::type_error(format!(
            "operator '{operation}' is not defined for {left_type} and {right_type}"
        ))
    }

    /// Create a configuration error
    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a limit exceeded error
    pub fn limit_exceeded(limit: impl Into<String>, actual: usize, maximum: usize) -> Self {
        Self::LimitExceeded {
            limit: limit.into(),
            actual,
            maximum,
        }
    }

    /// Create an invalid event error
    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            message: message.into(),
        }
    }

    /// Whether the error stems from the function configuration rather than
    /// from the payload of a particular event.
    ///
    /// Configuration errors should be reported to the developer who wrote the
    /// expression; the others depend on the events being evaluated.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Self::ParseError { .. }
            | Self::BindingError { .. }
            | Self::ConfigurationError { .. }
            | Self::LimitExceeded { .. }
            | Self::ConfigLoading { .. } => true,
            Self::TypeError { .. } | Self::InvalidEvent { .. } => false,
        }
    }

    /// Expression errors are deterministic, retrying never changes the outcome
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ParseError { .. } => ErrorCategory::Parse,
            Self::BindingError { .. } => ErrorCategory::Binding,
            Self::TypeError { .. } => ErrorCategory::Type,
            Self::ConfigurationError { .. } | Self::ConfigLoading { .. } => {
                ErrorCategory::Configuration
            }
            Self::LimitExceeded { .. } => ErrorCategory::Limit,
            Self::InvalidEvent { .. } => ErrorCategory::Input,
        }
    }
}

impl From<ingest_core::Error> for ExpressionError {
    fn from(error: ingest_core::Error) -> Self {
        Self::invalid_event(error.to_string())
    }
}

impl From<config::ConfigError> for ExpressionError {
    fn from(error: config::ConfigError) -> Self {
        Self::ConfigLoading {
            message: error.to_string(),
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed expression text
    Parse,
    /// Unknown or unbound root names
    Binding,
    /// Operand and result type mismatches
    Type,
    /// Invalid expression or engine configuration
    Configuration,
    /// Resource limits
    Limit,
    /// Malformed input events
    Input,
}
