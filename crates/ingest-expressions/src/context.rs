//! Evaluation context binding `event` and, for correlation, `async`

use crate::ast::{FieldPath, Root};
use crate::error::{ExpressionError, Result};
use crate::types::ExpressionValue;
use ingest_core::{Event, Json};

/// Records an expression is evaluated against.
///
/// The variant decides which root names are bound: `event` always, `async`
/// only when a candidate event is being correlated with the original one.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationContext {
    /// Only `event` is bound
    Event { event: Json },
    /// `event` and `async` are bound
    Correlated { event: Json, candidate: Json },
}

impl EvaluationContext {
    /// Bind `event` to a raw JSON envelope
    pub fn new(event: Json) -> Self {
        Self::Event { event }
    }

    /// Bind `event` and `async` to raw JSON envelopes
    pub fn correlated(event: Json, candidate: Json) -> Self {
        Self::Correlated { event, candidate }
    }

    /// Bind `event` to an event record
    pub fn from_event(event: &Event) -> Result<Self> {
        Ok(Self::new(event.to_json()?))
    }

    /// Bind `event` to the original event and `async` to the candidate
    pub fn from_events(event: &Event, candidate: &Event) -> Result<Self> {
        Ok(Self::correlated(event.to_json()?, candidate.to_json()?))
    }

    /// Add or replace the candidate event
    pub fn with_candidate(self, candidate: Json) -> Self {
        match self {
            Self::Event { event } | Self::Correlated { event, .. } => {
                Self::Correlated { event, candidate }
            }
        }
    }

    pub fn event(&self) -> &Json {
        match self {
            Self::Event { event } | Self::Correlated { event, .. } => event,
        }
    }

    pub fn candidate(&self) -> Option<&Json> {
        match self {
            Self::Event { .. } => None,
            Self::Correlated { candidate, .. } => Some(candidate),
        }
    }

    /// Whether `root` can be referenced in this context
    pub fn binds(&self, root: Root) -> bool {
        match root {
            Root::Event => true,
            Root::Async => self.candidate().is_some(),
        }
    }

    /// Get the record bound to `root`
    pub fn root(&self, root: Root) -> Result<&Json> {
        match root {
            Root::Event => Ok(self.event()),
            Root::Async => self.candidate().ok_or_else(|| {
                ExpressionError::binding_error(
                    "async",
                    "is only bound for cancellation and wait-for-event expressions",
                )
            }),
        }
    }

    /// Walk a field path.
    ///
    /// Missing keys and paths through non-objects resolve to
    /// [`ExpressionValue::Undefined`]; only an unbound root is an error.
    pub fn resolve(&self, path: &FieldPath) -> Result<ExpressionValue> {
        let mut current = self.root(path.root)?;
        for segment in &path.segments {
            match current.get(segment.as_str()) {
                Some(next) => current = next,
                None => return Ok(ExpressionValue::Undefined),
            }
        }
        Ok(ExpressionValue::from_json(current))
    }
}
