//! # Inngest Core
//!
//! Foundational types shared by the expression crates. The central type is
//! [`Event`], the record that expressions see as `event` (and, when two
//! events are correlated, as `async`).
//!
//! ## Key Components
//!
//! - **Events**: the Inngest event envelope (`id`, `name`, `data`, `user`, `ts`, `v`)
//! - **Errors**: common error types and handling

pub mod error;
pub mod event;

// Re-export commonly used types
pub use error::{Error, Result};
pub use event::{Event, EventId};

/// Common type aliases for convenience
pub type DateTime = chrono::DateTime<chrono::Utc>;
pub type Json = serde_json::Value;
