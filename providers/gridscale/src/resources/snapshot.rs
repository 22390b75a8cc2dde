//! `gridscale_snapshot` resource
//!
//! Snapshots live under a storage and are addressed by (storage_uuid, id).

use super::{deleted_if_not_found, removed_if_not_found, Provider};
use crate::adapter::{decode, encode, state_id, timestamp};
use crate::error::{ProviderError, RemoteContext};
use crate::poller::ResourceKind;
use crate::validation::validate_uuid;
use gridscale_client::{SnapshotRequest, StorageSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Attributes of a storage snapshot resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub storage_uuid: String,
    pub name: String,
    pub labels: Vec<String>,
    // Computed
    pub status: String,
    pub location_uuid: String,
    pub location_country: String,
    pub location_iata: String,
    pub location_name: String,
    pub usage_in_minutes: u64,
    pub license_product_no: Option<u64>,
    pub current_price: f64,
    pub capacity: u64,
    pub create_time: Option<String>,
    pub change_time: Option<String>,
}

impl SnapshotAttributes {
    fn from_snapshot(storage_uuid: &str, snapshot: &StorageSnapshot) -> Self {
        Self {
            id: Some(snapshot.object_uuid.clone()),
            storage_uuid: storage_uuid.to_string(),
            name: snapshot.name.clone(),
            labels: snapshot.labels.clone(),
            status: snapshot.status.clone(),
            location_uuid: snapshot.location_uuid.clone(),
            location_country: snapshot.location_country.clone(),
            location_iata: snapshot.location_iata.clone(),
            location_name: snapshot.location_name.clone(),
            usage_in_minutes: snapshot.usage_in_minutes,
            license_product_no: snapshot.license_product_no,
            current_price: snapshot.current_price,
            capacity: snapshot.capacity,
            create_time: timestamp(snapshot.create_time),
            change_time: timestamp(snapshot.change_time),
        }
    }

    fn request(&self) -> SnapshotRequest {
        SnapshotRequest {
            name: self.name.clone(),
            labels: self.labels.clone(),
        }
    }
}

async fn read_by_id(provider: &Provider, storage_uuid: &str, id: &str) -> Result<Value, ProviderError> {
    let snapshot = removed_if_not_found(
        provider.client().get_storage_snapshot(storage_uuid, id).await,
        || format!("Snapshot {} of storage {}", id, storage_uuid),
        || format!("Error reading snapshot ({}, {})", storage_uuid, id),
    )?;
    encode(&SnapshotAttributes::from_snapshot(storage_uuid, &snapshot))
}

pub async fn create(provider: &Provider, planned: &Value) -> Result<Value, ProviderError> {
    let attributes: SnapshotAttributes = decode(planned)?;
    validate_uuid("storage_uuid", &attributes.storage_uuid)?;
    let storage_uuid = &attributes.storage_uuid;

    let created = provider
        .client()
        .create_storage_snapshot(storage_uuid, &attributes.request())
        .await
        .context(|| format!("Error creating snapshot {} of storage ({})", attributes.name, storage_uuid))?;
    let id = created.object_uuid;
    info!("Created snapshot {} of storage {}", id, storage_uuid);

    let ids = [storage_uuid.as_str(), id.as_str()];
    provider
        .poller()
        .wait_until_active(ResourceKind::Snapshot, &ids, provider.timeouts().operation)
        .await?;

    read_by_id(provider, storage_uuid, &id).await
}

pub async fn read(provider: &Provider, state: &Value) -> Result<Value, ProviderError> {
    let id = state_id(state)?;
    let attributes: SnapshotAttributes = decode(state)?;
    read_by_id(provider, &attributes.storage_uuid, &id).await
}

pub async fn update(provider: &Provider, prior: &Value, planned: &Value) -> Result<Value, ProviderError> {
    let id = state_id(prior)?;
    let old: SnapshotAttributes = decode(prior)?;
    let new: SnapshotAttributes = decode(planned)?;
    if old.storage_uuid != new.storage_uuid {
        return Err(ProviderError::Validation(format!(
            "storage_uuid of snapshot {} cannot be changed",
            id
        )));
    }
    let storage_uuid = &old.storage_uuid;

    info!("Updating snapshot {} of storage {}", id, storage_uuid);
    provider
        .client()
        .update_storage_snapshot(storage_uuid, &id, &new.request())
        .await
        .context(|| format!("Error updating snapshot ({}, {})", storage_uuid, id))?;
    let ids = [storage_uuid.as_str(), id.as_str()];
    provider
        .poller()
        .wait_until_active(ResourceKind::Snapshot, &ids, provider.timeouts().operation)
        .await?;

    read_by_id(provider, storage_uuid, &id).await
}

pub async fn delete(provider: &Provider, state: &Value) -> Result<(), ProviderError> {
    let id = state_id(state)?;
    let attributes: SnapshotAttributes = decode(state)?;
    let storage_uuid = &attributes.storage_uuid;

    info!("Deleting snapshot {} of storage {}", id, storage_uuid);
    deleted_if_not_found(
        provider.client().delete_storage_snapshot(storage_uuid, &id).await,
        "snapshot",
    )
    .context(|| format!("Error deleting snapshot ({}, {})", storage_uuid, id))?;

    let ids = [storage_uuid.as_str(), id.as_str()];
    provider
        .poller()
        .wait_until_deleted(ResourceKind::Snapshot, &ids, provider.timeouts().operation)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seeded_mock, test_timeouts, uuid};
    use gridscale_client::mock::helpers::snapshot;
    use gridscale_client::{MockCall, MockGridscaleClient};
    use serde_json::json;
    use std::sync::Arc;

    fn provider(mock: &MockGridscaleClient) -> Provider {
        Provider::new(Arc::new(mock.clone()), test_timeouts())
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let mock = seeded_mock();
        let provider = provider(&mock);

        let state = create(&provider, &json!({"storage_uuid": uuid(2), "name": "nightly", "labels": ["backup"]}))
            .await
            .unwrap();

        assert_eq!(state["storage_uuid"], json!(uuid(2)));
        assert_eq!(state["name"], json!("nightly"));
        assert_eq!(state["status"], json!("active"));
        let read_back = read(&provider, &state).await.unwrap();
        assert_eq!(read_back, state);
    }

    #[tokio::test]
    async fn test_update_waits_for_active() {
        let mock = seeded_mock();
        let provider = provider(&mock);
        mock.add_snapshot(&uuid(2), snapshot(&uuid(40), "old"));
        // Never leaves provisioning, so the update times out
        mock.set_snapshot_status(&uuid(2), &uuid(40), "in-provisioning");

        let prior = json!({"id": uuid(40), "storage_uuid": uuid(2), "name": "old"});
        let planned = json!({"id": uuid(40), "storage_uuid": uuid(2), "name": "new"});
        let err = update(&provider, &prior, &planned).await.unwrap_err();

        assert!(matches!(err, ProviderError::Timeout { .. }));
        assert!(err.to_string().contains("snapshot"));
        assert!(err.to_string().contains(&uuid(40)));
    }

    #[tokio::test]
    async fn test_storage_cannot_change() {
        let mock = seeded_mock();
        let prior = json!({"id": uuid(40), "storage_uuid": uuid(2)});
        let planned = json!({"id": uuid(40), "storage_uuid": uuid(3)});

        let err = update(&provider(&mock), &prior, &planned).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let mock = seeded_mock();
        mock.add_snapshot(&uuid(2), snapshot(&uuid(40), "old"));

        delete(&provider(&mock), &json!({"id": uuid(40), "storage_uuid": uuid(2)}))
            .await
            .unwrap();

        assert_eq!(
            mock.calls(),
            vec![MockCall::DeleteSnapshot { storage: uuid(2), snapshot: uuid(40) }]
        );
    }
}
