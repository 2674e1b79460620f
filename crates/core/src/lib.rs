pub mod config;
pub mod domain;
pub mod errors;
pub mod validation;

pub use domain::rating::{Rating, RatingLogEntry, Sentiment};
pub use domain::shipment::{DeliveryEstimate, Pin, ShipmentRecord, ShipmentStatus, TrackingId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
