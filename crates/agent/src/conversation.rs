//! The dialogue runtime's view of a conversation, as it arrives on the webhook.
//!
//! Only the parts the action handlers read are modelled. Unknown fields are
//! ignored so newer runtimes can send richer trackers.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EVENT_USER: &str = "user";
pub const EVENT_BOT: &str = "bot";
pub const EVENT_SLOT: &str = "slot";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub slots: HashMap<String, Value>,
    #[serde(default)]
    pub latest_message: Option<LatestMessage>,
    #[serde(default)]
    pub events: Vec<TrackerEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerEvent {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl TrackerEvent {
    pub fn user(text: impl Into<String>) -> Self {
        Self { event: EVENT_USER.to_string(), text: Some(text.into()), name: None, value: None }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self { event: EVENT_BOT.to_string(), text: Some(text.into()), name: None, value: None }
    }

    pub fn slot(name: impl Into<String>, value: Value) -> Self {
        Self { event: EVENT_SLOT.to_string(), text: None, name: Some(name.into()), value: Some(value) }
    }
}

impl Tracker {
    pub fn new(sender_id: impl Into<String>) -> Self {
        Self { sender_id: sender_id.into(), ..Self::default() }
    }

    pub fn with_slot(mut self, name: impl Into<String>, value: Value) -> Self {
        self.slots.insert(name.into(), value);
        self
    }

    pub fn with_event(mut self, event: TrackerEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_latest_message(mut self, message: LatestMessage) -> Self {
        self.latest_message = Some(message);
        self
    }

    /// Slot value, treating null and blank strings as unset.
    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).filter(|value| is_present(value))
    }

    /// Slot value rendered as text. Numbers are accepted because entity
    /// extractors sometimes hand digits over as JSON numbers.
    pub fn slot_text(&self, name: &str) -> Option<String> {
        self.slot(name).and_then(value_text)
    }

    pub fn first_entity_value(&self) -> Option<&Value> {
        self.latest_message
            .as_ref()
            .and_then(|message| message.entities.first())
            .map(|entity| &entity.value)
            .filter(|value| is_present(value))
    }

    /// Slots set since the last non-slot event, latest value winning.
    pub fn slots_to_validate(&self) -> BTreeMap<String, Value> {
        let mut slots = BTreeMap::new();
        for event in self.events.iter().rev() {
            if event.event != EVENT_SLOT {
                break;
            }
            if let Some(name) = &event.name {
                slots.entry(name.clone()).or_insert_with(|| event.value.clone().unwrap_or(Value::Null));
            }
        }
        slots
    }

    /// Plain-text transcript of user and bot turns, one line per turn.
    pub fn transcript(&self) -> String {
        let mut lines = Vec::new();
        for event in &self.events {
            match event.event.as_str() {
                EVENT_USER => {
                    lines.push(format!("User: {}", event.text.as_deref().unwrap_or_default()));
                }
                EVENT_BOT => {
                    if let Some(text) = event.text.as_deref().filter(|text| !text.is_empty()) {
                        lines.push(format!("Bot: {text}"));
                    }
                }
                _ => {}
            }
        }
        lines.join("\n")
    }
}

pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{Entity, LatestMessage, Tracker, TrackerEvent};

    #[test]
    fn blank_and_null_slots_read_as_unset() {
        let tracker = Tracker::new("user-1")
            .with_slot("tracking_id", json!(null))
            .with_slot("source_address", json!("  "))
            .with_slot("rating", json!(4));

        assert!(tracker.slot("tracking_id").is_none());
        assert!(tracker.slot("source_address").is_none());
        assert!(tracker.slot("dest_address").is_none());
        assert_eq!(tracker.slot_text("rating").as_deref(), Some("4"));
    }

    #[test]
    fn slots_to_validate_only_reads_trailing_slot_events() {
        let tracker = Tracker::new("user-1")
            .with_event(TrackerEvent::slot("source_address", json!("111111")))
            .with_event(TrackerEvent::user("400807"))
            .with_event(TrackerEvent::slot("source_address", json!("400000")))
            .with_event(TrackerEvent::slot("source_address", json!("400807")))
            .with_event(TrackerEvent::slot("requested_slot", json!("dest_address")));

        let slots = tracker.slots_to_validate();

        assert_eq!(slots.len(), 2);
        assert_eq!(slots.get("source_address"), Some(&json!("400807")));
        assert_eq!(slots.get("requested_slot"), Some(&json!("dest_address")));
    }

    #[test]
    fn transcript_skips_empty_bot_turns_and_other_events() {
        let tracker = Tracker::new("user-1")
            .with_event(TrackerEvent::user("where is my parcel"))
            .with_event(TrackerEvent::bot(""))
            .with_event(TrackerEvent::slot("tracking_id", json!("123456789")))
            .with_event(TrackerEvent { event: "user".to_string(), text: None, name: None, value: None })
            .with_event(TrackerEvent::bot("It is in transit."));

        assert_eq!(tracker.transcript(), "User: where is my parcel\nUser: \nBot: It is in transit.");
    }

    #[test]
    fn tracker_deserializes_webhook_payload_with_unknown_fields() {
        let tracker: Tracker = serde_json::from_value(json!({
            "sender_id": "abc",
            "slots": {"rating": "5", "tracking_id": null},
            "latest_message": {
                "text": "5 stars",
                "intent": {"name": "rate"},
                "entities": [{"entity": "rating", "value": "5", "start": 0}]
            },
            "events": [{"event": "action", "name": "action_listen", "timestamp": 1.0}],
            "paused": false
        }))
        .expect("tracker payload");

        assert_eq!(tracker.sender_id, "abc");
        assert_eq!(tracker.first_entity_value(), Some(&Value::String("5".to_string())));
        assert_eq!(tracker.events[0].name.as_deref(), Some("action_listen"));
        assert_eq!(
            tracker.latest_message,
            Some(LatestMessage {
                text: Some("5 stars".to_string()),
                entities: vec![Entity { entity: "rating".to_string(), value: json!("5") }],
            })
        );
    }
}
