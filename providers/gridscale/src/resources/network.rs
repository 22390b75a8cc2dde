//! `gridscale_network` data source

use super::Provider;
use crate::adapter::{encode, timestamp};
use crate::error::{ProviderError, RemoteContext};
use crate::validation::validate_uuid;
use gridscale_client::Network;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Attributes of the network data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkDataAttributes {
    pub id: String,
    pub resource_id: String,
    pub name: String,
    pub status: String,
    pub location_uuid: String,
    pub location_name: String,
    pub public_net: bool,
    pub l2security: bool,
    pub network_type: String,
    pub delete_block: bool,
    pub labels: Vec<String>,
    pub create_time: Option<String>,
    pub change_time: Option<String>,
}

impl From<&Network> for NetworkDataAttributes {
    fn from(network: &Network) -> Self {
        Self {
            id: network.object_uuid.clone(),
            resource_id: network.object_uuid.clone(),
            name: network.name.clone(),
            status: network.status.clone(),
            location_uuid: network.location_uuid.clone(),
            location_name: network.location_name.clone(),
            public_net: network.public_net,
            l2security: network.l2security,
            network_type: network.network_type.clone(),
            delete_block: network.delete_block,
            labels: network.labels.clone(),
            create_time: timestamp(network.create_time),
            change_time: timestamp(network.change_time),
        }
    }
}

/// Look up a network by `resource_id` (or `id`)
pub async fn read(provider: &Provider, config: &Value) -> Result<Value, ProviderError> {
    let id = ["resource_id", "id"]
        .iter()
        .find_map(|key| config.get(*key).and_then(Value::as_str).filter(|v| !v.is_empty()))
        .ok_or_else(|| ProviderError::Validation("resource_id is required".to_string()))?;
    validate_uuid("resource_id", id)?;

    debug!("Reading network {}", id);
    let network = provider
        .client()
        .get_network(id)
        .await
        .context(|| format!("Error reading network ({})", id))?;
    encode(&NetworkDataAttributes::from(&network))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seeded_mock, test_timeouts, uuid};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_read_network() {
        let provider = Provider::new(Arc::new(seeded_mock()), test_timeouts());

        let state = read(&provider, &json!({"resource_id": uuid(10)})).await.unwrap();
        assert_eq!(state["id"], json!(uuid(10)));
        assert_eq!(state["public_net"], json!(true));
    }

    #[tokio::test]
    async fn test_missing_network_is_an_error() {
        let provider = Provider::new(Arc::new(seeded_mock()), test_timeouts());

        let err = read(&provider, &json!({"resource_id": uuid(99)})).await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));

        let err = read(&provider, &json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }
}
