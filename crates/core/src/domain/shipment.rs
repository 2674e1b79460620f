use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const TRACKING_ID_LEN: usize = 9;
pub const PIN_LEN: usize = 6;

/// Nine-digit shipment identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingId(String);

impl TrackingId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if is_ascii_digits(raw, TRACKING_ID_LEN) {
            return Ok(Self(raw.to_owned()));
        }
        Err(DomainError::InvalidTrackingId(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TrackingId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrackingId> for String {
    fn from(value: TrackingId) -> Self {
        value.0
    }
}

/// Six-digit postal code used for shipment source and destination.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pin(String);

impl Pin {
    /// Accepts exactly six ASCII digits after trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if is_ascii_digits(trimmed, PIN_LEN) {
            return Ok(Self(trimmed.to_owned()));
        }
        Err(DomainError::InvalidPin(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Pin {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pin> for String {
    fn from(value: Pin) -> Self {
        value.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShipmentStatus {
    InTransit,
    Delivered,
    PendingPickup,
    Other(String),
}

impl ShipmentStatus {
    pub fn label(&self) -> &str {
        match self {
            Self::InTransit => "In transit",
            Self::Delivered => "Delivered",
            Self::PendingPickup => "Pending Pickup",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for ShipmentStatus {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "in transit" | "intransit" => Self::InTransit,
            "delivered" => Self::Delivered,
            "pending pickup" | "pendingpickup" => Self::PendingPickup,
            _ => Self::Other(value),
        }
    }
}

impl From<ShipmentStatus> for String {
    fn from(value: ShipmentStatus) -> Self {
        value.label().to_owned()
    }
}

/// Outcome of interpreting a stored ETA field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryEstimate {
    ArrivesInDays(u32),
    AlreadyDelivered,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub tracking_id: TrackingId,
    pub status: ShipmentStatus,
    pub source: Pin,
    pub destination: Pin,
    /// Raw ETA in days as captured at seed time; kept unparsed so a missing or
    /// malformed value can still be reported.
    #[serde(default, alias = "time")]
    pub eta: Option<String>,
}

impl ShipmentRecord {
    pub fn new(
        tracking_id: TrackingId,
        status: ShipmentStatus,
        source: Pin,
        destination: Pin,
        eta: Option<String>,
    ) -> Self {
        Self { tracking_id, status, source, destination, eta }
    }

    pub fn eta_days(&self) -> Option<i64> {
        self.eta.as_deref().and_then(|raw| raw.trim().parse::<i64>().ok())
    }

    pub fn delivery_estimate(&self) -> DeliveryEstimate {
        match self.eta_days() {
            Some(0) => DeliveryEstimate::AlreadyDelivered,
            Some(days) if days > 0 => {
                u32::try_from(days).map_or(DeliveryEstimate::Unknown, DeliveryEstimate::ArrivesInDays)
            }
            _ => DeliveryEstimate::Unknown,
        }
    }

    pub fn change_addresses(&mut self, source: Pin, destination: Pin) {
        self.source = source;
        self.destination = destination;
    }
}

fn is_ascii_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|byte| byte.is_ascii_digit())
}
