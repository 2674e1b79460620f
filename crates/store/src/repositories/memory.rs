use std::collections::BTreeMap;

use tokio::sync::RwLock;

use shiptrack_core::domain::shipment::{Pin, ShipmentRecord, TrackingId};

use super::{RepositoryError, ShipmentRepository};

#[derive(Default)]
pub struct InMemoryShipmentRepository {
    shipments: RwLock<BTreeMap<TrackingId, ShipmentRecord>>,
}

impl InMemoryShipmentRepository {
    pub fn seeded(records: impl IntoIterator<Item = ShipmentRecord>) -> Self {
        let shipments =
            records.into_iter().map(|record| (record.tracking_id.clone(), record)).collect();
        Self { shipments: RwLock::new(shipments) }
    }
}

#[async_trait::async_trait]
impl ShipmentRepository for InMemoryShipmentRepository {
    async fn find_by_id(&self, id: &TrackingId) -> Result<Option<ShipmentRecord>, RepositoryError> {
        let shipments = self.shipments.read().await;
        Ok(shipments.get(id).cloned())
    }

    async fn save(&self, record: ShipmentRecord) -> Result<(), RepositoryError> {
        let mut shipments = self.shipments.write().await;
        shipments.insert(record.tracking_id.clone(), record);
        Ok(())
    }

    async fn update_addresses(
        &self,
        id: &TrackingId,
        source: Pin,
        destination: Pin,
    ) -> Result<ShipmentRecord, RepositoryError> {
        let mut shipments = self.shipments.write().await;
        let record =
            shipments.get_mut(id).ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        record.change_addresses(source, destination);
        Ok(record.clone())
    }

    async fn list(&self) -> Result<Vec<ShipmentRecord>, RepositoryError> {
        let shipments = self.shipments.read().await;
        Ok(shipments.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use shiptrack_core::domain::shipment::{Pin, ShipmentRecord, ShipmentStatus, TrackingId};

    use crate::repositories::{InMemoryShipmentRepository, RepositoryError, ShipmentRepository};

    fn id(raw: &str) -> TrackingId {
        TrackingId::parse(raw).expect("tracking id")
    }

    fn pin(raw: &str) -> Pin {
        Pin::parse(raw).expect("pin")
    }

    fn record() -> ShipmentRecord {
        ShipmentRecord::new(
            id("123456789"),
            ShipmentStatus::InTransit,
            pin("400807"),
            pin("400709"),
            Some("1".to_string()),
        )
    }

    #[tokio::test]
    async fn in_memory_shipment_repo_round_trip() {
        let repo = InMemoryShipmentRepository::default();
        repo.save(record()).await.expect("save shipment");

        let found = repo.find_by_id(&id("123456789")).await.expect("find shipment");
        assert_eq!(found, Some(record()));
        assert!(repo.contains(&id("123456789")).await.expect("contains"));
        assert!(!repo.contains(&id("000000000")).await.expect("contains"));
    }

    #[tokio::test]
    async fn update_addresses_overwrites_both_fields() {
        let repo = InMemoryShipmentRepository::seeded([record()]);

        let updated = repo
            .update_addresses(&id("123456789"), pin("110001"), pin("560001"))
            .await
            .expect("update addresses");

        assert_eq!(updated.source.as_str(), "110001");
        assert_eq!(updated.destination.as_str(), "560001");
        assert_eq!(updated.status, ShipmentStatus::InTransit);

        let stored = repo.find_by_id(&id("123456789")).await.expect("find").expect("present");
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn update_addresses_reports_missing_record_without_inserting() {
        let repo = InMemoryShipmentRepository::seeded([record()]);

        let error = repo
            .update_addresses(&id("999999999"), pin("110001"), pin("560001"))
            .await
            .expect_err("unknown id should fail");

        assert_eq!(error, RepositoryError::NotFound("999999999".to_string()));
        assert_eq!(repo.list().await.expect("list").len(), 1);
    }
}
