//! Domain event type.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A domain event flowing through the hub.
///
/// The payload is opaque to the hub: it is carried as arbitrary JSON and
/// serialized verbatim into the broker message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique event id, assigned by the producer.
    pub id: String,
    /// Event category, e.g. `"RECORD_CREATED"`.
    pub event_type: String,
    /// Opaque event body.
    #[serde(default)]
    pub event_payload: serde_json::Value,
}

impl Event {
    /// Create an event with a generated id.
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            event_payload: payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_assigns_distinct_ids() {
        let a = Event::new("RECORD_CREATED", serde_json::Value::Null);
        let b = Event::new("RECORD_CREATED", serde_json::Value::Null);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_wire_field_names() {
        let event = Event {
            id: "e1".to_string(),
            event_type: "RECORD_CREATED".to_string(),
            event_payload: serde_json::json!({"recordId": 7}),
        };

        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(encoded["id"], "e1");
        assert_eq!(encoded["eventType"], "RECORD_CREATED");
        assert_eq!(encoded["eventPayload"]["recordId"], 7);
    }
}
