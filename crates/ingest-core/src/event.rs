use crate::{DateTime, Json, Result};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of an event name
pub const MAX_EVENT_NAME_LENGTH: usize = 255;

/// Event identifier, `evt_` followed by a UUID without hyphens
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(format!("evt_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// An event as seen by expressions.
///
/// Serializes to the Inngest envelope `{"id", "name", "data", "user", "ts", "v"}`,
/// which is exactly the record an expression walks when it reads
/// `event.data.orderId` or `async.name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(strip_option, into)]
pub struct Event {
    /// Unique event identifier
    #[serde(default)]
    pub id: EventId,
    /// Event name, e.g. `app/order.created`
    #[setters(skip)]
    pub name: String,
    /// Event payload
    #[setters(skip)]
    #[serde(default)]
    pub data: Json,
    /// User attributes attached by the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Json>,
    /// Event timestamp, epoch milliseconds on the wire
    #[serde(rename = "ts", with = "chrono::serde::ts_milliseconds", default = "chrono::Utc::now")]
    pub timestamp: DateTime,
    /// Payload schema version
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Event {
    /// Create a new event
    pub fn new(name: impl Into<String>, data: Json) -> Self {
        Self {
            id: EventId::generate(),
            name: name.into(),
            data,
            user: None,
            timestamp: chrono::Utc::now(),
            version: None,
        }
    }

    /// Get event name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get event payload
    pub fn data(&self) -> &Json {
        &self.data
    }

    /// Render the event as the JSON record expressions evaluate against
    pub fn to_json(&self) -> Result<Json> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse an event from its JSON envelope
    pub fn from_json(value: Json) -> Result<Self> {
        let event: Self = serde_json::from_value(value)?;
        event.validate()?;
        Ok(event)
    }

    /// Check if the event name matches a pattern.
    ///
    /// `*` matches everything and a trailing `*` matches by prefix.
    pub fn matches_pattern(&self, pattern: &str) -> bool {
        if pattern == "*" {
            return true;
        }

        if let Some(prefix) = pattern.strip_suffix('*') {
            return self.name.starts_with(prefix);
        }

        self.name == pattern
    }

    /// Validate the event
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(crate::Error::event("Event name cannot be empty"));
        }

        if self.name.len() > MAX_EVENT_NAME_LENGTH {
            return Err(crate::Error::event(format!(
                "Event name too long (max {MAX_EVENT_NAME_LENGTH} characters)"
            )));
        }

        if !(self.data.is_object() || self.data.is_null()) {
            return Err(crate::Error::event("Event data must be an object"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_event_creation() {
        let fixture_data = json!({"orderId": "A1"});

        let actual = Event::new("app/order.created", fixture_data.clone());

        assert_eq!(actual.name(), "app/order.created");
        assert_eq!(actual.data(), &fixture_data);
        assert!(actual.id.as_str().starts_with("evt_"));
    }

    #[test]
    fn test_event_id_generation_is_unique() {
        let fixture_a = EventId::generate();
        let fixture_b = EventId::generate();
        assert_ne!(fixture_a, fixture_b);
    }

    #[test]
    fn test_event_setters_with_derive() {
        let fixture = Event::new("app/user.signup", json!({}))
            .id("evt_123")
            .user(json!({"email": "a@example.com"}))
            .version("2024-01-01.1");

        assert_eq!(fixture.id, EventId::new("evt_123"));
        assert_eq!(fixture.user, Some(json!({"email": "a@example.com"})));
        assert_eq!(fixture.version, Some("2024-01-01.1".to_string()));
    }

    #[test]
    fn test_event_to_json_envelope() {
        let fixture_ts = chrono::DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let fixture = Event::new("app/order.created", json!({"orderId": "A1"}))
            .id("evt_1")
            .timestamp(fixture_ts);

        let actual = fixture.to_json().unwrap();
        let expected = json!({
            "id": "evt_1",
            "name": "app/order.created",
            "data": {"orderId": "A1"},
            "ts": 1_700_000_000_000i64,
        });
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_event_from_json_defaults() {
        let fixture = json!({"name": "app/order.created", "data": {"orderId": "A1"}, "v": "1"});

        let actual = Event::from_json(fixture).unwrap();

        assert_eq!(actual.name, "app/order.created");
        assert_eq!(actual.data, json!({"orderId": "A1"}));
        assert_eq!(actual.version, Some("1".to_string()));
        assert!(actual.id.as_str().starts_with("evt_"));
    }

    #[test]
    fn test_event_from_json_rejects_empty_name() {
        let fixture = json!({"name": "", "data": {}});
        let actual = Event::from_json(fixture);
        assert!(actual.is_err());
    }

    #[test]
    fn test_event_matches_pattern() {
        let fixture = Event::new("app/user.login", json!({}));

        assert!(fixture.matches_pattern("*"));
        assert!(fixture.matches_pattern("app/user.*"));
        assert!(fixture.matches_pattern("app/user.login"));
        assert!(!fixture.matches_pattern("app/user.logout"));
        assert!(!fixture.matches_pattern("billing/*"));
    }

    #[test]
    fn test_event_validation_long_name() {
        let fixture = Event::new("a".repeat(MAX_EVENT_NAME_LENGTH + 1), json!({}));
        let actual = fixture.validate();
        assert!(actual.is_err());
    }

    #[test]
    fn test_event_validation_non_object_data() {
        let fixture = Event::new("app/order.created", json!([1, 2, 3]));
        let actual = fixture.validate();
        assert!(actual.is_err());
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let fixture = Event::new("app/order.created", json!({"orderId": "A1"}));
        let serialized = serde_json::to_string(&fixture).unwrap();
        let actual: Event = serde_json::from_str(&serialized).unwrap();
        assert_eq!(actual.name, fixture.name);
        assert_eq!(actual.data, fixture.data);
        assert_eq!(
            actual.timestamp.timestamp_millis(),
            fixture.timestamp.timestamp_millis()
        );
    }
}
