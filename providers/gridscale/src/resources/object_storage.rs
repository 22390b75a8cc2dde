//! `gridscale_object_storage` data source

use super::Provider;
use crate::adapter::encode;
use crate::error::{ProviderError, RemoteContext};
use gridscale_client::ObjectStorageAccessKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Attributes of the object storage data source; the id is the access key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStorageDataAttributes {
    pub id: String,
    pub resource_id: String,
    pub access_key: String,
    pub secret_key: String,
}

impl ObjectStorageDataAttributes {
    fn from_key(resource_id: &str, key: &ObjectStorageAccessKey) -> Self {
        Self {
            id: key.access_key.clone(),
            resource_id: resource_id.to_string(),
            access_key: key.access_key.clone(),
            secret_key: key.secret_key.clone(),
        }
    }
}

/// Look up an access key pair by `resource_id`
pub async fn read(provider: &Provider, config: &Value) -> Result<Value, ProviderError> {
    let id = config
        .get("resource_id")
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::Validation("resource_id is required".to_string()))?;

    debug!("Reading object storage access key {}", id);
    let key = provider
        .client()
        .get_object_storage_access_key(id)
        .await
        .context(|| format!("Error reading object storage ({})", id))?;
    encode(&ObjectStorageDataAttributes::from_key(id, &key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seeded_mock, test_timeouts};
    use gridscale_client::mock::helpers::access_key;
    use gridscale_client::MockOp;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_read_access_key() {
        let mock = seeded_mock();
        mock.add_access_key(access_key("GSKEY1", "s3cr3t"));
        let provider = Provider::new(Arc::new(mock), test_timeouts());

        let state = provider
            .read_data_source("gridscale_object_storage", &json!({"resource_id": "GSKEY1"}))
            .await
            .unwrap();

        assert_eq!(state["id"], json!("GSKEY1"));
        assert_eq!(state["access_key"], json!("GSKEY1"));
        assert_eq!(state["secret_key"], json!("s3cr3t"));
    }

    #[tokio::test]
    async fn test_read_errors() {
        let mock = seeded_mock();
        mock.add_access_key(access_key("GSKEY1", "s3cr3t"));
        mock.fail_next(MockOp::GetObjectStorageAccessKey, 500);
        let provider = Provider::new(Arc::new(mock), test_timeouts());

        let err = read(&provider, &json!({"resource_id": "GSKEY1"})).await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert!(err.to_string().contains("GSKEY1"));

        let err = read(&provider, &json!({"resource_id": "missing"})).await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));

        let err = read(&provider, &json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }
}
