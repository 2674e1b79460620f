use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message sent back to the user. `Template` names a response defined in the
/// bot's domain; the dialogue runtime renders it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BotMessage {
    Text { text: String },
    Template { response: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ActionEvent {
    #[serde(rename = "slot")]
    SlotSet { name: String, value: Value },
}

/// Everything an action hands back for one invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub events: Vec<ActionEvent>,
    pub responses: Vec<BotMessage>,
}

impl ActionResponse {
    pub fn say(&mut self, text: impl Into<String>) -> &mut Self {
        self.responses.push(BotMessage::Text { text: text.into() });
        self
    }

    pub fn say_template(&mut self, response: impl Into<String>) -> &mut Self {
        self.responses.push(BotMessage::Template { response: response.into() });
        self
    }

    pub fn set_slot(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.events.push(ActionEvent::SlotSet { name: name.into(), value });
        self
    }

    pub fn clear_slot(&mut self, name: impl Into<String>) -> &mut Self {
        self.set_slot(name, Value::Null)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.responses.is_empty()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.responses
            .iter()
            .filter_map(|message| match message {
                BotMessage::Text { text } => Some(text.as_str()),
                BotMessage::Template { .. } => None,
            })
            .collect()
    }

    pub fn slot_value(&self, name: &str) -> Option<&Value> {
        self.events.iter().rev().find_map(|event| match event {
            ActionEvent::SlotSet { name: slot, value } if slot == name => Some(value),
            ActionEvent::SlotSet { .. } => None,
        })
    }
}
