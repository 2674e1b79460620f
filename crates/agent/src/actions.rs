//! Custom action handlers invoked by the dialogue runtime.
//!
//! Handlers are stateless: everything they need comes from the tracker or the
//! injected store handles.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use shiptrack_core::domain::rating::{Rating, RatingLogEntry};
use shiptrack_core::domain::shipment::{DeliveryEstimate, Pin, TrackingId};
use shiptrack_store::{RatingLog, ShipmentRepository};

use crate::conversation::Tracker;
use crate::error::ActionError;
use crate::response::ActionResponse;

pub const SLOT_TRACKING_ID: &str = "tracking_id";
pub const SLOT_SOURCE_ADDRESS: &str = "source_address";
pub const SLOT_DEST_ADDRESS: &str = "dest_address";
pub const SLOT_RATING: &str = "rating";

#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, tracker: &Tracker) -> Result<ActionResponse, ActionError>;
}

#[derive(Default)]
pub struct ActionRegistry {
    actions: BTreeMap<&'static str, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn register<A>(&mut self, action: A)
    where
        A: Action + 'static,
    {
        self.actions.insert(action.name(), Arc::new(action));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.actions.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Reads the tracking ID slot. A value that is not nine digits is treated as
/// an unknown shipment rather than an absent slot.
fn tracking_id_slot(tracker: &Tracker) -> Option<Result<TrackingId, String>> {
    tracker
        .slot_text(SLOT_TRACKING_ID)
        .map(|raw| TrackingId::parse(raw.trim()).map_err(|_| raw))
}

pub struct LookupShipmentStatus {
    shipments: Arc<dyn ShipmentRepository>,
}

impl LookupShipmentStatus {
    pub fn new(shipments: Arc<dyn ShipmentRepository>) -> Self {
        Self { shipments }
    }
}

#[async_trait]
impl Action for LookupShipmentStatus {
    fn name(&self) -> &'static str {
        "action_lookup_shipment_status"
    }

    async fn run(&self, tracker: &Tracker) -> Result<ActionResponse, ActionError> {
        let mut response = ActionResponse::default();
        let Some(slot) = tracking_id_slot(tracker) else {
            response.say("I can't look up a shipment without a tracking ID.");
            return Ok(response);
        };

        let record = match &slot {
            Ok(id) => self.shipments.find_by_id(id).await?,
            Err(_) => None,
        };

        match record {
            Some(record) => {
                info!(
                    event_name = "agent.shipment.status_found",
                    tracking_id = %record.tracking_id,
                    status = %record.status,
                    "shipment status looked up"
                );
                response.say(format!(
                    "Your shipment with ID <b>{}</b> is <b>{}</b>. It is travelling from <b>{}</b> to <b>{}</b>.",
                    record.tracking_id, record.status, record.source, record.destination
                ));
            }
            None => {
                let raw = slot.as_ref().map(|id| id.to_string()).unwrap_or_else(|raw| raw.clone());
                debug!(event_name = "agent.shipment.status_missing", tracking_id = %raw, "no shipment for id");
                response.say(format!("I couldn't find a shipment with ID <b>{raw}</b>."));
            }
        }

        response.clear_slot(SLOT_TRACKING_ID);
        Ok(response)
    }
}

pub struct EstimateDelivery {
    shipments: Arc<dyn ShipmentRepository>,
}

impl EstimateDelivery {
    pub fn new(shipments: Arc<dyn ShipmentRepository>) -> Self {
        Self { shipments }
    }
}

#[async_trait]
impl Action for EstimateDelivery {
    fn name(&self) -> &'static str {
        "action_estimate_delivery"
    }

    async fn run(&self, tracker: &Tracker) -> Result<ActionResponse, ActionError> {
        let mut response = ActionResponse::default();
        let Some(slot) = tracking_id_slot(tracker) else {
            response.say("I can't estimate a delivery time without a tracking ID.");
            return Ok(response);
        };

        let estimate = match &slot {
            Ok(id) => self
                .shipments
                .find_by_id(id)
                .await?
                .map(|record| record.delivery_estimate())
                .unwrap_or(DeliveryEstimate::Unknown),
            Err(_) => DeliveryEstimate::Unknown,
        };
        let raw = slot.as_ref().map(|id| id.to_string()).unwrap_or_else(|raw| raw.clone());

        match estimate {
            DeliveryEstimate::ArrivesInDays(days) => {
                response.say(format!(
                    "Your shipment with ID <b>{raw}</b> is estimated to arrive in <b>{days} day(s)</b>."
                ));
            }
            DeliveryEstimate::AlreadyDelivered => {
                response.say("This package has <b>already been delivered</b>.");
            }
            DeliveryEstimate::Unknown => {
                response.say(format!("I couldn't find a delivery estimate for shipment <b>{raw}</b>."));
            }
        }
        info!(
            event_name = "agent.shipment.estimate",
            tracking_id = %raw,
            estimate = ?estimate,
            "delivery estimate answered"
        );

        response.clear_slot(SLOT_TRACKING_ID);
        Ok(response)
    }
}

pub struct ChangeAddress {
    shipments: Arc<dyn ShipmentRepository>,
}

impl ChangeAddress {
    pub fn new(shipments: Arc<dyn ShipmentRepository>) -> Self {
        Self { shipments }
    }
}

#[async_trait]
impl Action for ChangeAddress {
    fn name(&self) -> &'static str {
        "action_change_address"
    }

    async fn run(&self, tracker: &Tracker) -> Result<ActionResponse, ActionError> {
        let mut response = ActionResponse::default();
        let (Some(source), Some(destination)) =
            (tracker.slot_text(SLOT_SOURCE_ADDRESS), tracker.slot_text(SLOT_DEST_ADDRESS))
        else {
            response.say("Please provide both new source and destination addresses.");
            return Ok(response);
        };

        let raw_id = tracker.slot_text(SLOT_TRACKING_ID).ok_or(ActionError::MissingSlot(SLOT_TRACKING_ID))?;
        let id = TrackingId::parse(raw_id.trim())
            .map_err(|_| ActionError::ShipmentNotFound(raw_id.clone()))?;
        let source = Pin::parse(&source)?;
        let destination = Pin::parse(&destination)?;

        let updated = self.shipments.update_addresses(&id, source, destination).await?;
        info!(
            event_name = "agent.shipment.addresses_changed",
            tracking_id = %updated.tracking_id,
            source = %updated.source,
            destination = %updated.destination,
            "shipment addresses updated"
        );

        response
            .say(format!(
                "The addresses for shipment ID <b>{}</b> have been updated:\nSource: <b>{}</b>\nDestination: <b>{}</b>",
                updated.tracking_id, updated.source, updated.destination
            ))
            .clear_slot(SLOT_SOURCE_ADDRESS)
            .clear_slot(SLOT_DEST_ADDRESS)
            .clear_slot(SLOT_TRACKING_ID);
        Ok(response)
    }
}

pub struct LogRating {
    ratings: Arc<dyn RatingLog>,
}

impl LogRating {
    pub fn new(ratings: Arc<dyn RatingLog>) -> Self {
        Self { ratings }
    }
}

#[async_trait]
impl Action for LogRating {
    fn name(&self) -> &'static str {
        "action_log_rating"
    }

    async fn run(&self, tracker: &Tracker) -> Result<ActionResponse, ActionError> {
        let raw = tracker
            .slot(SLOT_RATING)
            .or_else(|| tracker.first_entity_value())
            .ok_or(ActionError::MissingSlot(SLOT_RATING))?;
        let rating = Rating::from_value(raw)?;

        self.ratings.append(RatingLogEntry::captured_now(tracker.sender_id.clone(), rating)).await?;
        info!(
            event_name = "agent.rating.logged",
            sender_id = %tracker.sender_id,
            rating = rating.value(),
            "rating logged"
        );

        let mut response = ActionResponse::default();
        response.set_slot(SLOT_RATING, json!(rating.value()));
        Ok(response)
    }
}

#[derive(Default)]
pub struct HandleStarRating;

#[async_trait]
impl Action for HandleStarRating {
    fn name(&self) -> &'static str {
        "action_handle_star_rating"
    }

    async fn run(&self, tracker: &Tracker) -> Result<ActionResponse, ActionError> {
        let mut response = ActionResponse::default();
        match tracker.slot(SLOT_RATING).map(Rating::from_value) {
            Some(Ok(rating)) => {
                response.say(format!("Thanks for rating us <b>{}!</b>", rating.stars_label()));
            }
            Some(Err(error)) => {
                debug!(event_name = "agent.rating.unreadable", error = %error, "ignoring rating slot");
                response.say("Thanks for your feedback.");
            }
            None => {
                response.say("Thanks for your feedback.");
            }
        }
        response.set_slot(SLOT_RATING, Value::Null);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use serde_json::json;

    use shiptrack_core::domain::shipment::{Pin, ShipmentRecord, ShipmentStatus, TrackingId};
    use shiptrack_store::{
        default_shipments, CsvRatingLog, InMemoryShipmentRepository, RatingLog, ShipmentRepository,
    };

    use super::{
        Action, ActionRegistry, ChangeAddress, EstimateDelivery, HandleStarRating, LogRating,
        LookupShipmentStatus,
    };
    use crate::conversation::{Entity, LatestMessage, Tracker};
    use crate::error::ActionError;

    fn seeded() -> Arc<InMemoryShipmentRepository> {
        Arc::new(InMemoryShipmentRepository::seeded(default_shipments()))
    }

    fn id(raw: &str) -> TrackingId {
        TrackingId::parse(raw).expect("tracking id")
    }

    #[test]
    fn registry_lists_actions_by_name() {
        let shipments = seeded();
        let mut registry = ActionRegistry::default();
        registry.register(LookupShipmentStatus::new(shipments.clone()));
        registry.register(EstimateDelivery::new(shipments));
        registry.register(HandleStarRating);

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.names(),
            vec!["action_estimate_delivery", "action_handle_star_rating", "action_lookup_shipment_status"]
        );
        assert!(registry.get("action_dance").is_none());
    }

    #[tokio::test]
    async fn status_lookup_reports_seeded_shipment_and_clears_slot() {
        let action = LookupShipmentStatus::new(seeded());
        let tracker = Tracker::new("u1").with_slot("tracking_id", json!("123456789"));

        let response = action.run(&tracker).await.expect("lookup");

        let text = response.texts()[0];
        assert!(text.contains("In transit"));
        assert!(text.contains("400807"));
        assert!(text.contains("400709"));
        assert_eq!(response.slot_value("tracking_id"), Some(&json!(null)));
    }

    #[tokio::test]
    async fn status_lookup_without_id_apologizes_and_emits_no_events() {
        let action = LookupShipmentStatus::new(seeded());

        let response = action.run(&Tracker::new("u1")).await.expect("lookup");

        assert_eq!(response.texts(), vec!["I can't look up a shipment without a tracking ID."]);
        assert!(response.events.is_empty());
    }

    #[tokio::test]
    async fn status_lookup_miss_says_so() {
        let action = LookupShipmentStatus::new(seeded());
        let tracker = Tracker::new("u1").with_slot("tracking_id", json!("111111111"));

        let response = action.run(&tracker).await.expect("lookup");

        assert_eq!(response.texts(), vec!["I couldn't find a shipment with ID <b>111111111</b>."]);
        assert_eq!(response.slot_value("tracking_id"), Some(&json!(null)));
    }

    #[tokio::test]
    async fn estimate_distinguishes_days_delivered_and_unknown() {
        let shipments = seeded();
        let odd = |raw_id: &str, eta: Option<&str>| {
            ShipmentRecord::new(
                id(raw_id),
                ShipmentStatus::InTransit,
                Pin::parse("110001").expect("pin"),
                Pin::parse("560001").expect("pin"),
                eta.map(str::to_string),
            )
        };
        shipments.save(odd("222222222", Some("soon"))).await.expect("save");
        shipments.save(odd("333333333", Some("-2"))).await.expect("save");
        shipments.save(odd("444444444", None)).await.expect("save");
        let action = EstimateDelivery::new(shipments);

        let estimate = |raw: &'static str| {
            let tracker = Tracker::new("u1").with_slot("tracking_id", json!(raw));
            let action = &action;
            async move { action.run(&tracker).await.expect("estimate").texts()[0].to_string() }
        };

        assert!(estimate("123456789").await.contains("<b>1 day(s)</b>"));
        assert_eq!(estimate("987654321").await, "This package has <b>already been delivered</b>.");
        assert!(estimate("123454321").await.contains("<b>3 day(s)</b>"));
        for missing in ["222222222", "333333333", "444444444", "555555555"] {
            assert_eq!(
                estimate(missing).await,
                format!("I couldn't find a delivery estimate for shipment <b>{missing}</b>.")
            );
        }
    }

    #[tokio::test]
    async fn estimate_without_id_emits_no_events() {
        let response = EstimateDelivery::new(seeded()).run(&Tracker::new("u1")).await.expect("estimate");
        assert_eq!(response.texts(), vec!["I can't estimate a delivery time without a tracking ID."]);
        assert!(response.events.is_empty());
    }

    #[tokio::test]
    async fn address_change_requires_both_pins_and_leaves_record_untouched() {
        let shipments = seeded();
        let action = ChangeAddress::new(shipments.clone());
        let tracker = Tracker::new("u1")
            .with_slot("tracking_id", json!("123456789"))
            .with_slot("source_address", json!("560001"));

        let response = action.run(&tracker).await.expect("change");

        assert_eq!(response.texts(), vec!["Please provide both new source and destination addresses."]);
        assert!(response.events.is_empty());
        let record = shipments.find_by_id(&id("123456789")).await.expect("find").expect("record");
        assert_eq!(record.source.as_str(), "400807");
        assert_eq!(record.destination.as_str(), "400709");
    }

    #[tokio::test]
    async fn address_change_overwrites_both_fields_and_clears_slots() {
        let shipments = seeded();
        let action = ChangeAddress::new(shipments.clone());
        let tracker = Tracker::new("u1")
            .with_slot("tracking_id", json!("123454321"))
            .with_slot("source_address", json!("560001"))
            .with_slot("dest_address", json!(110001));

        let response = action.run(&tracker).await.expect("change");

        assert_eq!(
            response.texts(),
            vec!["The addresses for shipment ID <b>123454321</b> have been updated:\nSource: <b>560001</b>\nDestination: <b>110001</b>"]
        );
        for slot in ["source_address", "dest_address", "tracking_id"] {
            assert_eq!(response.slot_value(slot), Some(&json!(null)));
        }
        let record = shipments.find_by_id(&id("123454321")).await.expect("find").expect("record");
        assert_eq!(record.source.as_str(), "560001");
        assert_eq!(record.destination.as_str(), "110001");
    }

    #[tokio::test]
    async fn address_change_fails_without_tracking_id_or_unknown_shipment() {
        let action = ChangeAddress::new(seeded());
        let pins = Tracker::new("u1")
            .with_slot("source_address", json!("560001"))
            .with_slot("dest_address", json!("110001"));

        let missing = action.run(&pins).await;
        assert!(matches!(missing, Err(ActionError::MissingSlot("tracking_id"))));

        let unknown = action.run(&pins.with_slot("tracking_id", json!("111111111"))).await;
        assert!(matches!(unknown, Err(ActionError::ShipmentNotFound(ref id)) if id == "111111111"));
    }

    #[tokio::test]
    async fn log_rating_appends_row_and_sets_slot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ratings_log.csv");
        let ratings = Arc::new(CsvRatingLog::new(&path));
        let action = LogRating::new(ratings.clone());
        let tracker = Tracker::new("user-42").with_slot("rating", json!("4"));

        let response = action.run(&tracker).await.expect("log rating");

        assert_eq!(response.slot_value("rating"), Some(&json!(4)));
        let contents = fs::read_to_string(&path).expect("read log");
        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "timestamp,user_id,rating,summary,sentiment");
        assert!(lines[1].ends_with(",user-42,4,,"));
    }

    #[tokio::test]
    async fn log_rating_falls_back_to_first_entity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ratings = Arc::new(CsvRatingLog::new(dir.path().join("ratings_log.csv")));
        let action = LogRating::new(ratings.clone());
        let tracker = Tracker::new("user-7").with_latest_message(LatestMessage {
            text: Some("two".to_string()),
            entities: vec![Entity { entity: "rating".to_string(), value: json!(2) }],
        });

        action.run(&tracker).await.expect("log rating");

        let last = ratings.last_entry().await.expect("read").expect("entry");
        assert_eq!(last.user_id, "user-7");
        assert_eq!(last.rating, "2");
    }

    #[tokio::test]
    async fn log_rating_rejects_missing_and_invalid_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ratings = Arc::new(CsvRatingLog::new(dir.path().join("ratings_log.csv")));
        let action = LogRating::new(ratings.clone());

        assert!(matches!(action.run(&Tracker::new("u")).await, Err(ActionError::MissingSlot("rating"))));
        let invalid = Tracker::new("u").with_slot("rating", json!("excellent"));
        assert!(matches!(action.run(&invalid).await, Err(ActionError::Domain(_))));
        assert!(ratings.entries().await.expect("entries").is_empty());
    }

    #[tokio::test]
    async fn star_rating_acknowledgement_pluralizes_and_clears_slot() {
        let action = HandleStarRating;
        let reply = |value: serde_json::Value| {
            let tracker = Tracker::new("u").with_slot("rating", value);
            async move { HandleStarRating.run(&tracker).await.expect("ack") }
        };

        let one = reply(json!(1)).await;
        assert_eq!(one.texts(), vec!["Thanks for rating us <b>1 star!</b>"]);
        assert_eq!(one.slot_value("rating"), Some(&json!(null)));
        assert_eq!(reply(json!("5")).await.texts(), vec!["Thanks for rating us <b>5 stars!</b>"]);
        assert_eq!(reply(json!("meh")).await.texts(), vec!["Thanks for your feedback."]);

        let none = action.run(&Tracker::new("u")).await.expect("ack");
        assert_eq!(none.texts(), vec!["Thanks for your feedback."]);
        assert_eq!(none.slot_value("rating"), Some(&json!(null)));
    }
}
