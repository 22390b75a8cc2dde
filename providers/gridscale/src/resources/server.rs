//! `gridscale_server` resource

use super::{deleted_if_not_found, removed_if_not_found, Provider};
use crate::adapter::{current_config, decode, encode, state_id, ServerAttributes};
use crate::error::{ProviderError, RemoteContext};
use crate::poller::ResourceKind;
use crate::reconciler::ServerReconciler;
use crate::validation::HardwareProfile;
use gridscale_client::ServerCreateRequest;
use serde_json::Value;
use tracing::info;

async fn read_by_id(provider: &Provider, id: &str) -> Result<Value, ProviderError> {
    let server = removed_if_not_found(
        provider.client().get_server(id).await,
        || format!("Server {}", id),
        || format!("Error reading server ({})", id),
    )?;
    encode(&ServerAttributes::from_server(&server))
}

pub async fn create(provider: &Provider, planned: &Value) -> Result<Value, ProviderError> {
    let attributes: ServerAttributes = decode(planned)?;
    let config = attributes.to_config()?;
    let spec = &config.spec;

    let request = ServerCreateRequest {
        name: spec.name.clone(),
        cores: spec.cores,
        memory: spec.memory,
        location_uuid: spec.location_uuid.clone(),
        hardware_profile: (spec.hardware_profile != HardwareProfile::Default)
            .then(|| spec.hardware_profile.as_str().to_string()),
        availability_zone: spec.availability_zone.clone(),
        labels: spec.labels.clone(),
    };
    let created = provider
        .client()
        .create_server(&request)
        .await
        .context(|| format!("Error creating server {}", spec.name))?;
    let id = created.object_uuid;
    info!("Created server {} ({})", spec.name, id);

    provider
        .poller()
        .wait_until_active(ResourceKind::Server, &[id.as_str()], provider.timeouts().operation)
        .await?;

    ServerReconciler::new(provider.client(), &id, provider.timeouts())
        .reconcile_create(&config.attachments)
        .await?;

    if spec.power {
        provider.power().start(&id).await?;
    }

    read_by_id(provider, &id).await
}

pub async fn read(provider: &Provider, state: &Value) -> Result<Value, ProviderError> {
    let id = state_id(state)?;
    read_by_id(provider, &id).await
}

pub async fn update(provider: &Provider, prior: &Value, planned: &Value) -> Result<Value, ProviderError> {
    let id = state_id(prior)?;
    let attributes: ServerAttributes = decode(planned)?;
    let mut desired = attributes.to_config()?;

    // The remote server is the authority on what is currently attached
    let server = removed_if_not_found(
        provider.client().get_server(&id).await,
        || format!("Server {}", id),
        || format!("Error reading server ({})", id),
    )?;
    let current = current_config(&server);

    if desired.spec.location_uuid != current.spec.location_uuid {
        return Err(ProviderError::Validation(format!(
            "location_uuid of server {} cannot be changed",
            id
        )));
    }
    if desired.spec.hardware_profile != current.spec.hardware_profile {
        return Err(ProviderError::Validation(format!(
            "hardware_profile of server {} cannot be changed ({} -> {})",
            id, current.spec.hardware_profile, desired.spec.hardware_profile
        )));
    }
    desired.spec.legacy = current.spec.legacy;

    ServerReconciler::new(provider.client(), &id, provider.timeouts())
        .reconcile_update(&current, &desired)
        .await?;

    read_by_id(provider, &id).await
}

pub async fn delete(provider: &Provider, state: &Value) -> Result<(), ProviderError> {
    let id = state_id(state)?;
    let client = provider.client();

    let server = match client.get_server(&id).await {
        Ok(server) => server,
        Err(e) if e.is_not_found() => {
            info!("Server {} is already gone", id);
            return Ok(());
        }
        Err(e) => return Err(ProviderError::remote(format!("Error reading server ({})", id), e)),
    };
    if server.power {
        provider.power().stop(&id).await?;
    }

    info!("Deleting server {}", id);
    deleted_if_not_found(client.delete_server(&id).await, "server")
        .context(|| format!("Error deleting server ({})", id))?;

    provider
        .poller()
        .wait_until_deleted(ResourceKind::Server, &[id.as_str()], provider.timeouts().operation)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seeded_mock, test_timeouts, uuid, SERVER};
    use gridscale_client::{MockCall, MockGridscaleClient};
    use serde_json::json;
    use std::sync::Arc;

    fn provider(mock: &MockGridscaleClient) -> Provider {
        Provider::new(Arc::new(mock.clone()), test_timeouts())
    }

    fn planned() -> Value {
        json!({
            "name": "app",
            "cores": 2,
            "memory": 4,
            "location_uuid": uuid(1),
            "power": true,
            "storage": [{"object_uuid": uuid(2), "bootdevice": true}],
            "network": [{
                "object_uuid": uuid(11),
                "bootdevice": false,
                "rules_v4_in": [{"order": 0, "action": "allow", "protocol": "tcp", "dst_port": "22"}]
            }],
            "ipv4": uuid(20),
            "labels": ["web"]
        })
    }

    #[tokio::test]
    async fn test_create_links_and_starts() {
        let mock = seeded_mock();

        let state = create(&provider(&mock), &planned()).await.unwrap();

        let id = state["id"].as_str().unwrap().to_string();
        let server = mock.server(&id).unwrap();
        assert!(server.power);
        assert_eq!(server.relations.storages.len(), 1);
        // Private network plus the public one the IPv4 address needs
        assert_eq!(server.relations.networks.len(), 2);
        assert_eq!(state["ipv4"], json!(uuid(20)));
        assert_eq!(state["network"].as_array().unwrap().len(), 1);
        assert_eq!(state["network"][0]["rules_v4_in"][0]["dst_port"], json!("22"));
        assert_eq!(state["status"], json!("active"));

        let calls = mock.calls();
        assert!(matches!(calls.first(), Some(MockCall::CreateServer { name }) if name == "app"));
        assert_eq!(calls.last(), Some(&MockCall::StartServer { server: id }));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_attributes_before_any_call() {
        let mock = seeded_mock();
        let mut planned = planned();
        planned["cores"] = json!(0);

        let err = create(&provider(&mock), &planned).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_reconciles_against_remote_state() {
        let mock = seeded_mock();
        let provider = provider(&mock);
        let state = create(&provider, &planned()).await.unwrap();
        mock.clear_calls();

        let mut planned = state.clone();
        planned["name"] = json!("app-2");
        let updated = update(&provider, &state, &planned).await.unwrap();

        assert_eq!(updated["name"], json!("app-2"));
        assert!(mock.link_calls().is_empty());
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_update_rejects_hardware_profile_change() {
        let mock = seeded_mock();
        let provider = provider(&mock);
        let state = create(&provider, &planned()).await.unwrap();
        mock.clear_calls();

        let mut planned = state.clone();
        planned["hardware_profile"] = json!("q35");
        let err = update(&provider, &state, &planned).await.unwrap_err();

        assert!(matches!(err, ProviderError::Validation(msg) if msg.contains("hardware_profile")));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_stops_then_deletes() {
        let mock = seeded_mock();
        let state = json!({"id": uuid(SERVER)});

        delete(&provider(&mock), &state).await.unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                MockCall::StopServer { server: uuid(SERVER) },
                MockCall::DeleteServer { server: uuid(SERVER) },
            ]
        );
        assert!(mock.server(&uuid(SERVER)).is_none());
    }

    #[tokio::test]
    async fn test_delete_of_missing_server_succeeds() {
        let mock = seeded_mock();
        delete(&provider(&mock), &json!({"id": uuid(99)})).await.unwrap();
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_removed_server() {
        let mock = seeded_mock();
        let err = read(&provider(&mock), &json!({"id": uuid(99)})).await.unwrap_err();
        assert!(matches!(err, ProviderError::RemovedExternally(_)));
    }
}
