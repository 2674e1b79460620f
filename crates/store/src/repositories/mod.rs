use async_trait::async_trait;
use thiserror::Error;

use shiptrack_core::domain::shipment::{Pin, ShipmentRecord, TrackingId};

pub mod memory;

pub use memory::InMemoryShipmentRepository;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("shipment `{0}` not found")]
    NotFound(String),
}

/// Owner of the shipment records that the action handlers read and mutate.
#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    async fn find_by_id(&self, id: &TrackingId) -> Result<Option<ShipmentRecord>, RepositoryError>;

    async fn save(&self, record: ShipmentRecord) -> Result<(), RepositoryError>;

    /// Overwrites both addresses of an existing record in one step and
    /// returns the updated record.
    async fn update_addresses(
        &self,
        id: &TrackingId,
        source: Pin,
        destination: Pin,
    ) -> Result<ShipmentRecord, RepositoryError>;

    async fn list(&self) -> Result<Vec<ShipmentRecord>, RepositoryError>;

    async fn contains(&self, id: &TrackingId) -> Result<bool, RepositoryError> {
        Ok(self.find_by_id(id).await?.is_some())
    }
}
