//! `gridscale_paas_securityzone` resource

use super::{deleted_if_not_found, removed_if_not_found, Provider};
use crate::adapter::{decode, encode, state_id, timestamp};
use crate::error::{ProviderError, RemoteContext};
use crate::poller::ResourceKind;
use crate::validation::validate_uuid;
use gridscale_client::{SecurityZone, SecurityZoneCreateRequest, SecurityZoneUpdateRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Attributes of a PaaS security zone resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityZoneAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub location_uuid: String,
    pub labels: Vec<String>,
    // Computed
    pub status: String,
    pub location_country: String,
    pub location_iata: String,
    pub location_name: String,
    pub create_time: Option<String>,
    pub change_time: Option<String>,
}

impl From<&SecurityZone> for SecurityZoneAttributes {
    fn from(zone: &SecurityZone) -> Self {
        Self {
            id: Some(zone.object_uuid.clone()),
            name: zone.name.clone(),
            location_uuid: zone.location_uuid.clone(),
            labels: zone.labels.clone(),
            status: zone.status.clone(),
            location_country: zone.location_country.clone(),
            location_iata: zone.location_iata.clone(),
            location_name: zone.location_name.clone(),
            create_time: timestamp(zone.create_time),
            change_time: timestamp(zone.change_time),
        }
    }
}

async fn read_by_id(provider: &Provider, id: &str) -> Result<Value, ProviderError> {
    let zone = removed_if_not_found(
        provider.client().get_security_zone(id).await,
        || format!("Security zone {}", id),
        || format!("Error reading security zone ({})", id),
    )?;
    encode(&SecurityZoneAttributes::from(&zone))
}

async fn wait_active(provider: &Provider, id: &str) -> Result<(), ProviderError> {
    provider
        .poller()
        .wait_until_active(ResourceKind::SecurityZone, &[id], provider.timeouts().operation)
        .await
}

pub async fn create(provider: &Provider, planned: &Value) -> Result<Value, ProviderError> {
    let attributes: SecurityZoneAttributes = decode(planned)?;
    validate_uuid("location_uuid", &attributes.location_uuid)?;

    let request = SecurityZoneCreateRequest {
        name: attributes.name.clone(),
        location_uuid: attributes.location_uuid.clone(),
        labels: attributes.labels.clone(),
    };
    let created = provider
        .client()
        .create_security_zone(&request)
        .await
        .context(|| format!("Error creating security zone {}", attributes.name))?;
    let id = created.object_uuid;
    info!("Created security zone {} ({})", attributes.name, id);

    wait_active(provider, &id).await?;
    read_by_id(provider, &id).await
}

pub async fn read(provider: &Provider, state: &Value) -> Result<Value, ProviderError> {
    let id = state_id(state)?;
    read_by_id(provider, &id).await
}

pub async fn update(provider: &Provider, prior: &Value, planned: &Value) -> Result<Value, ProviderError> {
    let id = state_id(prior)?;
    let old: SecurityZoneAttributes = decode(prior)?;
    let new: SecurityZoneAttributes = decode(planned)?;
    if old.location_uuid != new.location_uuid {
        return Err(ProviderError::Validation(format!(
            "location_uuid of security zone {} cannot be changed",
            id
        )));
    }

    let request = SecurityZoneUpdateRequest {
        name: new.name.clone(),
        labels: new.labels.clone(),
    };
    info!("Updating security zone {}", id);
    provider
        .client()
        .update_security_zone(&id, &request)
        .await
        .context(|| format!("Error updating security zone ({})", id))?;

    wait_active(provider, &id).await?;
    read_by_id(provider, &id).await
}

pub async fn delete(provider: &Provider, state: &Value) -> Result<(), ProviderError> {
    let id = state_id(state)?;

    info!("Deleting security zone {}", id);
    deleted_if_not_found(provider.client().delete_security_zone(&id).await, "security zone")
        .context(|| format!("Error deleting security zone ({})", id))?;

    provider
        .poller()
        .wait_until_deleted(ResourceKind::SecurityZone, &[id.as_str()], provider.timeouts().operation)
        .await
}
