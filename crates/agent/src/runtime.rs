use std::sync::Arc;

use tracing::{info, warn};

use shiptrack_store::{RatingLog, ShipmentRepository};

use crate::actions::{
    ActionRegistry, ChangeAddress, EstimateDelivery, HandleStarRating, LogRating,
    LookupShipmentStatus,
};
use crate::conversation::Tracker;
use crate::error::ActionError;
use crate::forms::{ValidateAddressForm, ValidateTrackingForm};
use crate::llm::LlmClient;
use crate::response::ActionResponse;
use crate::summary::{SummarizeChat, SummaryError};

pub struct AgentRuntime {
    registry: ActionRegistry,
}

impl AgentRuntime {
    pub fn new(registry: ActionRegistry) -> Self {
        Self { registry }
    }

    /// Registers every form validator and handler of the shipment assistant.
    pub fn shipment_assistant(
        shipments: Arc<dyn ShipmentRepository>,
        ratings: Arc<dyn RatingLog>,
        llm: Arc<dyn LlmClient>,
    ) -> Result<Self, SummaryError> {
        let mut registry = ActionRegistry::default();
        registry.register(ValidateTrackingForm::new(shipments.clone()));
        registry.register(ValidateAddressForm);
        registry.register(LookupShipmentStatus::new(shipments.clone()));
        registry.register(EstimateDelivery::new(shipments.clone()));
        registry.register(ChangeAddress::new(shipments));
        registry.register(LogRating::new(ratings.clone()));
        registry.register(HandleStarRating);
        registry.register(SummarizeChat::new(ratings, llm)?);
        Ok(Self::new(registry))
    }

    pub fn action_names(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    pub async fn execute(
        &self,
        action_name: &str,
        tracker: &Tracker,
        correlation_id: &str,
    ) -> Result<ActionResponse, ActionError> {
        let Some(action) = self.registry.get(action_name) else {
            warn!(
                event_name = "agent.action.unknown",
                correlation_id,
                action_name,
                "no action registered under this name"
            );
            return Err(ActionError::UnknownAction(action_name.to_string()));
        };

        match action.run(tracker).await {
            Ok(response) => {
                info!(
                    event_name = "agent.action.completed",
                    correlation_id,
                    action_name,
                    sender_id = %tracker.sender_id,
                    events = response.events.len(),
                    responses = response.responses.len(),
                    "action completed"
                );
                Ok(response)
            }
            Err(error) => {
                warn!(
                    event_name = "agent.action.failed",
                    correlation_id,
                    action_name,
                    sender_id = %tracker.sender_id,
                    error = %error,
                    "action failed"
                );
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use shiptrack_store::{default_shipments, CsvRatingLog, InMemoryShipmentRepository};

    use super::AgentRuntime;
    use crate::conversation::Tracker;
    use crate::error::ActionError;
    use crate::llm::{LlmClient, LlmError};

    struct SilentLlm;

    #[async_trait]
    impl LlmClient for SilentLlm {
        fn model(&self) -> &str {
            "silent"
        }

        async fn generate_json(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::Decode("no model in tests".to_string()))
        }
    }

    fn runtime(dir: &tempfile::TempDir) -> AgentRuntime {
        AgentRuntime::shipment_assistant(
            Arc::new(InMemoryShipmentRepository::seeded(default_shipments())),
            Arc::new(CsvRatingLog::new(dir.path().join("ratings_log.csv"))),
            Arc::new(SilentLlm),
        )
        .expect("runtime")
    }

    #[test]
    fn shipment_assistant_registers_all_actions() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            runtime(&dir).action_names(),
            vec![
                "action_change_address",
                "action_estimate_delivery",
                "action_handle_star_rating",
                "action_log_rating",
                "action_lookup_shipment_status",
                "action_summarize_chat",
                "validate_address_form",
                "validate_tracking_form",
            ]
        );
    }

    #[tokio::test]
    async fn execute_dispatches_by_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let runtime = runtime(&dir);
        let tracker = Tracker::new("u1").with_slot("tracking_id", json!("123456789"));

        let lookup = runtime.execute("action_lookup_shipment_status", &tracker, "req-1").await.expect("lookup");
        let estimate = runtime.execute("action_estimate_delivery", &tracker, "req-2").await.expect("estimate");

        assert!(lookup.texts()[0].contains("In transit"));
        assert!(estimate.texts()[0].contains("1 day(s)"));
    }

    #[tokio::test]
    async fn unknown_action_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = runtime(&dir).execute("action_dance", &Tracker::new("u1"), "req-3").await;
        assert!(matches!(result, Err(ActionError::UnknownAction(ref name)) if name == "action_dance"));
    }
}
