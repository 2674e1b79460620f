//! Action handlers for the shipment-tracking assistant.
//!
//! The dialogue runtime owns intent routing and dialogue policy. This crate
//! only answers the actions it is asked to run:
//! - form validators for the tracking ID and the two PIN codes (`forms`)
//! - status, delivery-estimate and address-change handlers (`actions`)
//! - rating capture and acknowledgement (`actions`)
//! - conversation summarization through a text-generation endpoint (`summary`, `llm`)
//!
//! `AgentRuntime` looks actions up by name and runs them against a `Tracker`.
//! The language model only writes the summary text and sentiment label; it never
//! touches shipment data.

pub mod actions;
pub mod conversation;
pub mod error;
pub mod forms;
pub mod llm;
pub mod response;
pub mod runtime;
pub mod summary;

pub use actions::{Action, ActionRegistry};
pub use conversation::{Tracker, TrackerEvent};
pub use error::ActionError;
pub use llm::{LlmClient, LlmError, OllamaClient};
pub use response::{ActionEvent, ActionResponse, BotMessage};
pub use runtime::AgentRuntime;
pub use summary::{SummarizeChat, SummaryError};
