//! Seed data for the shipment store.
//!
//! Records are created only at startup; the handlers never add or remove
//! shipments. A deployment can replace the built-in set with a JSON file
//! keyed by tracking ID:
//!
//! ```json
//! { "123456789": { "status": "In transit", "source": "400807", "destination": "400709", "time": "1" } }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use shiptrack_core::domain::shipment::{Pin, ShipmentRecord, ShipmentStatus, TrackingId};
use shiptrack_core::errors::DomainError;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("could not read seed file `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse seed file `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid seed record `{key}`: {source}")]
    InvalidRecord { key: String, source: DomainError },
}

#[derive(Debug, Deserialize)]
struct SeedRecord {
    status: String,
    source: String,
    destination: String,
    #[serde(default, alias = "eta")]
    time: Option<String>,
}

/// The three shipments every fresh deployment starts with.
pub fn default_shipments() -> Vec<ShipmentRecord> {
    [
        ("123456789", "In transit", "400807", "400709", "1"),
        ("987654321", "Delivered", "123456", "654321", "0"),
        ("123454321", "Pending Pickup", "400001", "400007", "3"),
    ]
    .into_iter()
    .filter_map(|(id, status, source, destination, eta)| {
        Some(ShipmentRecord::new(
            TrackingId::parse(id).ok()?,
            ShipmentStatus::from(status.to_string()),
            Pin::parse(source).ok()?,
            Pin::parse(destination).ok()?,
            Some(eta.to_string()),
        ))
    })
    .collect()
}

pub fn load_seed_file(path: &Path) -> Result<Vec<ShipmentRecord>, SeedError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| SeedError::Read { path: path.to_path_buf(), source })?;
    let entries: BTreeMap<String, SeedRecord> = serde_json::from_str(&raw)
        .map_err(|source| SeedError::Parse { path: path.to_path_buf(), source })?;

    entries
        .into_iter()
        .map(|(key, seed)| {
            to_record(&key, seed).map_err(|source| SeedError::InvalidRecord { key, source })
        })
        .collect()
}

fn to_record(key: &str, seed: SeedRecord) -> Result<ShipmentRecord, DomainError> {
    Ok(ShipmentRecord::new(
        TrackingId::parse(key)?,
        ShipmentStatus::from(seed.status),
        Pin::parse(&seed.source)?,
        Pin::parse(&seed.destination)?,
        seed.time,
    ))
}
