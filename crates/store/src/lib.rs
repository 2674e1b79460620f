//! Storage adapters for the shipment assistant: the seeded shipment map and
//! the CSV rating log.

pub mod fixtures;
pub mod rating_log;
pub mod repositories;

pub use fixtures::{default_shipments, load_seed_file, SeedError};
pub use rating_log::{Amendment, CsvRatingLog, RatingLog, RatingLogError};
pub use repositories::{InMemoryShipmentRepository, RepositoryError, ShipmentRepository};
