//! `gridscale_ipv4` and `gridscale_ipv6` resources
//!
//! An address can be related to one server. Changing that relation
//! power-cycles the server: it is stopped, the relation is changed, and the
//! server is started again if it was running before.

use super::{deleted_if_not_found, removed_if_not_found, Provider};
use crate::adapter::{decode, encode, non_empty, state_id, timestamp};
use crate::error::{ProviderError, RemoteContext};
use crate::poller::ResourceKind;
use crate::reconciler::tolerate_not_found;
use crate::validation::validate_uuid;
use gridscale_client::{Ip, IpCreateRequest, IpUpdateRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Attributes of an IP address resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub location_uuid: String,
    /// Failover addresses are not served by DHCP and cannot be related to a server
    pub failover: bool,
    pub reverse_dns: String,
    pub labels: Vec<String>,
    /// Related server, empty for none
    pub server_uuid: String,
    // Computed
    pub ip: String,
    pub prefix: String,
    pub status: String,
    pub location_country: String,
    pub location_iata: String,
    pub location_name: String,
    pub delete_block: bool,
    pub usage_in_minutes: f64,
    pub current_price: f64,
    pub loadbalancer_uuid: String,
    pub create_time: Option<String>,
    pub change_time: Option<String>,
}

impl IpAttributes {
    fn validate(&self) -> Result<(), ProviderError> {
        validate_uuid("location_uuid", &self.location_uuid)?;
        if !self.server_uuid.is_empty() {
            validate_uuid("server_uuid", &self.server_uuid)?;
            if self.failover {
                return Err(ProviderError::Validation(
                    "a failover IP address cannot be related to a server".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn update_request(&self) -> IpUpdateRequest {
        IpUpdateRequest {
            name: Some(self.name.clone()),
            failover: self.failover,
            reverse_dns: Some(self.reverse_dns.clone()),
            labels: self.labels.clone(),
        }
    }

    fn from_ip(ip: &Ip) -> Self {
        // Only one server can be related to an address
        let server_uuid = match ip.relations.servers.as_slice() {
            [server] => server.server_uuid.clone(),
            _ => String::new(),
        };
        Self {
            id: Some(ip.object_uuid.clone()),
            name: ip.name.clone(),
            location_uuid: ip.location_uuid.clone(),
            failover: ip.failover,
            reverse_dns: ip.reverse_dns.clone(),
            labels: ip.labels.clone(),
            server_uuid,
            ip: ip.ip.clone(),
            prefix: ip.prefix.clone(),
            status: ip.status.clone(),
            location_country: ip.location_country.clone(),
            location_iata: ip.location_iata.clone(),
            location_name: ip.location_name.clone(),
            delete_block: ip.delete_block,
            usage_in_minutes: ip.usage_in_minutes,
            current_price: ip.current_price,
            loadbalancer_uuid: ip
                .relations
                .loadbalancers
                .first()
                .map(|lb| lb.loadbalancer_uuid.clone())
                .unwrap_or_default(),
            create_time: timestamp(ip.create_time),
            change_time: timestamp(ip.change_time),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Link,
    Unlink,
}

/// Link or unlink `ip` and `server_uuid` with the server powered off
async fn change_server_relation(provider: &Provider, server_uuid: &str, ip: &str, relation: Relation) -> Result<(), ProviderError> {
    let client = provider.client();
    let server = client
        .get_server(server_uuid)
        .await
        .context(|| format!("Error reading server ({})", server_uuid))?;
    let was_running = server.power;
    if was_running {
        provider.power().stop(server_uuid).await?;
    }

    match relation {
        Relation::Link => {
            info!("Linking IP address {} to server {}", ip, server_uuid);
            client
                .link_ip(server_uuid, ip)
                .await
                .context(|| format!("Error linking IP address ({}) to server ({})", ip, server_uuid))?;
        }
        Relation::Unlink => {
            info!("Unlinking IP address {} from server {}", ip, server_uuid);
            tolerate_not_found(client.unlink_ip(server_uuid, ip).await, "IP relation")
                .context(|| format!("Error unlinking IP address ({}) from server ({})", ip, server_uuid))?;
        }
    }

    if was_running {
        provider.power().start(server_uuid).await?;
    }
    Ok(())
}

async fn read_by_id(provider: &Provider, id: &str, family: u8) -> Result<Value, ProviderError> {
    let ip = removed_if_not_found(
        provider.client().get_ip(id).await,
        || format!("IPv{} address {}", family, id),
        || format!("Error reading IPv{} address ({})", family, id),
    )?;
    if ip.family != family {
        return Err(ProviderError::Validation(format!(
            "IP address {} is an IPv{} address, expected IPv{}",
            id, ip.family, family
        )));
    }
    encode(&IpAttributes::from_ip(&ip))
}

pub async fn create(provider: &Provider, planned: &Value, family: u8) -> Result<Value, ProviderError> {
    let attributes: IpAttributes = decode(planned)?;
    attributes.validate()?;

    let request = IpCreateRequest {
        family,
        location_uuid: attributes.location_uuid.clone(),
        name: non_empty(Some(&attributes.name)),
        failover: attributes.failover,
        reverse_dns: non_empty(Some(&attributes.reverse_dns)),
        labels: attributes.labels.clone(),
    };
    let created = provider
        .client()
        .create_ip(&request)
        .await
        .context(|| format!("Error creating IPv{} address", family))?;
    let id = created.object_uuid;
    info!("Created IPv{} address {}", family, id);

    provider
        .poller()
        .wait_until_active(ResourceKind::Ip, &[id.as_str()], provider.timeouts().operation)
        .await?;

    if !attributes.server_uuid.is_empty() {
        change_server_relation(provider, &attributes.server_uuid, &id, Relation::Link).await?;
    }

    read_by_id(provider, &id, family).await
}

pub async fn read(provider: &Provider, state: &Value, family: u8) -> Result<Value, ProviderError> {
    let id = state_id(state)?;
    read_by_id(provider, &id, family).await
}

pub async fn update(provider: &Provider, prior: &Value, planned: &Value, family: u8) -> Result<Value, ProviderError> {
    let id = state_id(prior)?;
    let old: IpAttributes = decode(prior)?;
    let new: IpAttributes = decode(planned)?;
    new.validate()?;

    if old.location_uuid != new.location_uuid {
        return Err(ProviderError::Validation(format!(
            "location_uuid of IP address {} cannot be changed",
            id
        )));
    }

    if old.update_request() != new.update_request() {
        info!("Updating IPv{} address {}", family, id);
        provider
            .client()
            .update_ip(&id, &new.update_request())
            .await
            .context(|| format!("Error updating IPv{} address ({})", family, id))?;
        provider
            .poller()
            .wait_until_active(ResourceKind::Ip, &[id.as_str()], provider.timeouts().operation)
            .await?;
    }

    if old.server_uuid != new.server_uuid {
        if !old.server_uuid.is_empty() {
            change_server_relation(provider, &old.server_uuid, &id, Relation::Unlink).await?;
        }
        if !new.server_uuid.is_empty() {
            change_server_relation(provider, &new.server_uuid, &id, Relation::Link).await?;
        }
    }

    read_by_id(provider, &id, family).await
}

pub async fn delete(provider: &Provider, state: &Value) -> Result<(), ProviderError> {
    let id = state_id(state)?;
    let client = provider.client();

    let ip = match client.get_ip(&id).await {
        Ok(ip) => ip,
        Err(e) if e.is_not_found() => {
            info!("IP address {} is already gone", id);
            return Ok(());
        }
        Err(e) => return Err(ProviderError::remote(format!("Error reading IP address ({})", id), e)),
    };
    for server in &ip.relations.servers {
        change_server_relation(provider, &server.server_uuid, &id, Relation::Unlink).await?;
    }

    info!("Deleting IP address {}", id);
    deleted_if_not_found(client.delete_ip(&id).await, "IP address")
        .context(|| format!("Error deleting IP address ({})", id))?;

    provider
        .poller()
        .wait_until_deleted(ResourceKind::Ip, &[id.as_str()], provider.timeouts().operation)
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

    #[tokio::test]
    async fn test_create_with_server_power_cycles_it() {
        let mock = seeded_mock();
        let planned = json!({
            "name": "frontend",
            "location_uuid": uuid(1),
            "server_uuid": uuid(SERVER),
        });

        let state = create(&provider(&mock), &planned, 4).await.unwrap();
        let id = state["id"].as_str().unwrap().to_string();

        assert_eq!(
            mock.calls(),
            vec![
                MockCall::CreateIp { family: 4 },
                MockCall::StopServer { server: uuid(SERVER) },
                MockCall::LinkIp { server: uuid(SERVER), ip: id.clone() },
                MockCall::StartServer { server: uuid(SERVER) },
            ]
        );
        assert_eq!(state["server_uuid"], json!(uuid(SERVER)));
        assert_eq!(state["name"], json!("frontend"));
        assert!(state["ip"].as_str().unwrap().contains('.'));
        assert!(mock.server(&uuid(SERVER)).unwrap().power);
    }

    #[tokio::test]
    async fn test_stopped_server_is_not_started() {
        let mock = seeded_mock();
        let mut server = mock.server(&uuid(SERVER)).unwrap();
        server.power = false;
        mock.add_server(server);

        let planned = json!({"location_uuid": uuid(1), "server_uuid": uuid(SERVER)});
        create(&provider(&mock), &planned, 6).await.unwrap();

        assert!(!mock
            .calls()
            .iter()
            .any(|c| matches!(c, MockCall::StartServer { .. } | MockCall::StopServer { .. })));
        assert!(!mock.server(&uuid(SERVER)).unwrap().power);
    }

    #[tokio::test]
    async fn test_failover_address_cannot_be_related() {
        let mock = seeded_mock();
        let planned = json!({"location_uuid": uuid(1), "failover": true, "server_uuid": uuid(SERVER)});

        let err = create(&provider(&mock), &planned, 4).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_moves_relation() {
        let mock = seeded_mock();
        let provider = provider(&mock);
        let mut other = gridscale_client::mock::helpers::server(&uuid(5), "db");
        other.power = false;
        mock.add_server(other);

        let state = create(&provider, &json!({"location_uuid": uuid(1), "server_uuid": uuid(SERVER)}), 4)
            .await
            .unwrap();
        let id = state["id"].as_str().unwrap().to_string();
        mock.clear_calls();

        let mut planned = state.clone();
        planned["server_uuid"] = json!(uuid(5));
        let updated = update(&provider, &state, &planned, 4).await.unwrap();

        assert_eq!(updated["server_uuid"], json!(uuid(5)));
        assert_eq!(
            mock.link_calls(),
            vec![
                MockCall::UnlinkIp { server: uuid(SERVER), ip: id.clone() },
                MockCall::LinkIp { server: uuid(5), ip: id },
            ]
        );
        assert!(mock.server(&uuid(SERVER)).unwrap().relations.public_ips.is_empty());
    }

    #[tokio::test]
    async fn test_update_fields_only() {
        let mock = seeded_mock();
        let provider = provider(&mock);
        let state = create(&provider, &json!({"location_uuid": uuid(1)}), 6).await.unwrap();
        mock.clear_calls();

        let mut planned = state.clone();
        planned["reverse_dns"] = json!("host.example.com");
        let updated = update(&provider, &state, &planned, 6).await.unwrap();

        assert_eq!(updated["reverse_dns"], json!("host.example.com"));
        assert!(matches!(mock.calls().as_slice(), [MockCall::UpdateIp { .. }]));
    }

    #[tokio::test]
    async fn test_delete_unlinks_first() {
        let mock = seeded_mock();
        let provider = provider(&mock);
        let state = create(&provider, &json!({"location_uuid": uuid(1), "server_uuid": uuid(SERVER)}), 4)
            .await
            .unwrap();
        let id = state["id"].as_str().unwrap().to_string();
        mock.clear_calls();

        delete(&provider, &state).await.unwrap();

        let calls = mock.calls();
        let unlinked_at = calls
            .iter()
            .position(|c| matches!(c, MockCall::UnlinkIp { .. }))
            .unwrap();
        let deleted_at = calls
            .iter()
            .position(|c| matches!(c, MockCall::DeleteIp { .. }))
            .unwrap();
        assert!(unlinked_at < deleted_at);
        assert!(mock.ip(&id).is_none());
    }

    #[tokio::test]
    async fn test_read_rejects_wrong_family() {
        let mock = seeded_mock();
        let err = read(&provider(&mock), &json!({"id": uuid(20)}), 6).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }
}
