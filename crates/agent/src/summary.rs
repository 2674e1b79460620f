//! Conversation summarization for the latest rating.
//!
//! The model is asked for a JSON object `{"summary": ..., "sentiment": ...}`.
//! Anything that does not match that shape is treated as a failure, and the
//! failure text is stored in place of a summary so the rating row still gets
//! amended.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{info, warn};

use shiptrack_core::domain::rating::Sentiment;
use shiptrack_store::{Amendment, RatingLog};

use crate::actions::Action;
use crate::conversation::Tracker;
use crate::error::ActionError;
use crate::llm::{LlmClient, LlmError};
use crate::response::ActionResponse;

const PROMPT_NAME: &str = "summary_prompt";

const PROMPT_TEMPLATE: &str = r#"Here is a conversation between a user and a chatbot and the user's rating.

Conversation:
{{ conversation }}

User Rating: {{ rating }}

Respond with a single JSON object and nothing else, in this shape:
{"summary": "<one short sentence>", "sentiment": "<Positive|Neutral|Negative>"}

Keep the summary as short as possible."#;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("could not render prompt: {0}")]
    Template(#[from] tera::Error),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("model output did not match the summary contract: {0}")]
    Contract(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationSummary {
    pub summary: String,
    pub sentiment: Sentiment,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSummary {
    summary: String,
    sentiment: String,
}

pub struct SummaryPrompt {
    tera: Tera,
}

impl SummaryPrompt {
    pub fn new() -> Result<Self, SummaryError> {
        let mut tera = Tera::default();
        tera.add_raw_template(PROMPT_NAME, PROMPT_TEMPLATE)?;
        Ok(Self { tera })
    }

    pub fn render(&self, conversation: &str, rating: &str) -> Result<String, SummaryError> {
        let mut context = Context::new();
        context.insert("conversation", conversation);
        context.insert("rating", rating);
        Ok(self.tera.render(PROMPT_NAME, &context)?)
    }
}

pub fn parse_summary(raw: &str) -> Result<ConversationSummary, SummaryError> {
    let parsed: RawSummary = serde_json::from_str(raw.trim())
        .map_err(|error| SummaryError::Contract(error.to_string()))?;

    let summary = parsed.summary.trim();
    if summary.is_empty() {
        return Err(SummaryError::Contract("summary is empty".to_string()));
    }
    let sentiment = parsed
        .sentiment
        .parse::<Sentiment>()
        .map_err(|error| SummaryError::Contract(error.to_string()))?;

    Ok(ConversationSummary { summary: summary.to_string(), sentiment })
}

pub struct SummarizeChat {
    ratings: Arc<dyn RatingLog>,
    llm: Arc<dyn LlmClient>,
    prompt: SummaryPrompt,
}

impl SummarizeChat {
    pub fn new(ratings: Arc<dyn RatingLog>, llm: Arc<dyn LlmClient>) -> Result<Self, SummaryError> {
        Ok(Self { ratings, llm, prompt: SummaryPrompt::new()? })
    }

    async fn summarize(&self, conversation: &str, rating: &str) -> Result<ConversationSummary, SummaryError> {
        let prompt = self.prompt.render(conversation, rating)?;
        let raw = self.llm.generate_json(&prompt).await?;
        parse_summary(&raw)
    }
}

#[async_trait]
impl Action for SummarizeChat {
    fn name(&self) -> &'static str {
        "action_summarize_chat"
    }

    async fn run(&self, tracker: &Tracker) -> Result<ActionResponse, ActionError> {
        let Some(latest) = self.ratings.last_entry().await? else {
            warn!(
                event_name = "agent.summary.no_ratings",
                sender_id = %tracker.sender_id,
                "rating log is empty, nothing to summarize"
            );
            return Ok(ActionResponse::default());
        };

        let amendment = match self.summarize(&tracker.transcript(), &latest.rating).await {
            Ok(result) => Amendment::new(result.summary, Some(result.sentiment)),
            Err(error) => {
                warn!(
                    event_name = "agent.summary.failed",
                    sender_id = %tracker.sender_id,
                    model = %self.llm.model(),
                    error = %error,
                    "summarization failed, storing placeholder"
                );
                Amendment::new(format!("Error getting summary: {error}"), None)
            }
        };

        let amended = self.ratings.amend_last(amendment).await?;
        info!(
            event_name = "agent.summary.stored",
            sender_id = %tracker.sender_id,
            rated_by = %amended.user_id,
            sentiment = %amended.sentiment,
            "rating row amended with summary"
        );
        Ok(ActionResponse::default())
    }
}
