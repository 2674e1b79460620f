//! Form validation actions.
//!
//! The dialogue runtime calls `validate_<form>` after every user turn while a
//! form is active. Only slots set during that turn are checked, and only the
//! ones the form owns; each checked slot is echoed back either accepted or
//! reset to null.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use shiptrack_core::validation::{extract_tracking_id, validate_pin};
use shiptrack_store::ShipmentRepository;

use crate::actions::{Action, SLOT_DEST_ADDRESS, SLOT_SOURCE_ADDRESS, SLOT_TRACKING_ID};
use crate::conversation::{value_text, Tracker};
use crate::error::ActionError;
use crate::response::ActionResponse;

pub const UTTER_INVALID_TRACKING_ID: &str = "utter_invalid_tracking_id";

pub struct ValidateTrackingForm {
    shipments: Arc<dyn ShipmentRepository>,
}

impl ValidateTrackingForm {
    pub fn new(shipments: Arc<dyn ShipmentRepository>) -> Self {
        Self { shipments }
    }

    async fn validate_tracking_id(
        &self,
        value: &Value,
        response: &mut ActionResponse,
    ) -> Result<(), ActionError> {
        let Some(id) = value_text(value).and_then(|raw| extract_tracking_id(&raw).ok()) else {
            debug!(event_name = "agent.form.tracking_id_rejected", value = %value, "malformed tracking id");
            response.say_template(UTTER_INVALID_TRACKING_ID).clear_slot(SLOT_TRACKING_ID);
            return Ok(());
        };

        if self.shipments.contains(&id).await? {
            response.set_slot(SLOT_TRACKING_ID, Value::String(id.to_string()));
        } else {
            debug!(event_name = "agent.form.tracking_id_unknown", tracking_id = %id, "tracking id not in store");
            response
                .say(format!("Tracking ID {id} not found. Please check and try again."))
                .clear_slot(SLOT_TRACKING_ID);
        }
        Ok(())
    }
}

#[async_trait]
impl Action for ValidateTrackingForm {
    fn name(&self) -> &'static str {
        "validate_tracking_form"
    }

    async fn run(&self, tracker: &Tracker) -> Result<ActionResponse, ActionError> {
        let mut response = ActionResponse::default();
        if let Some(value) = tracker.slots_to_validate().get(SLOT_TRACKING_ID) {
            self.validate_tracking_id(value, &mut response).await?;
        }
        Ok(response)
    }
}

#[derive(Default)]
pub struct ValidateAddressForm;

impl ValidateAddressForm {
    fn validate_pin_slot(slot: &str, label: &str, value: &Value, response: &mut ActionResponse) {
        match value_text(value).map(|raw| validate_pin(&raw)) {
            Some(Ok(pin)) => {
                response.set_slot(slot, Value::String(pin.to_string()));
            }
            _ => {
                debug!(event_name = "agent.form.pin_rejected", slot, value = %value, "malformed PIN code");
                response
                    .say(format!("Please enter a valid 6-digit PIN code for the {label} address."))
                    .clear_slot(slot);
            }
        }
    }
}

#[async_trait]
impl Action for ValidateAddressForm {
    fn name(&self) -> &'static str {
        "validate_address_form"
    }

    async fn run(&self, tracker: &Tracker) -> Result<ActionResponse, ActionError> {
        let mut response = ActionResponse::default();
        let slots = tracker.slots_to_validate();
        if let Some(value) = slots.get(SLOT_SOURCE_ADDRESS) {
            Self::validate_pin_slot(SLOT_SOURCE_ADDRESS, "source", value, &mut response);
        }
        if let Some(value) = slots.get(SLOT_DEST_ADDRESS) {
            Self::validate_pin_slot(SLOT_DEST_ADDRESS, "destination", value, &mut response);
        }
        Ok(response)
    }
}
