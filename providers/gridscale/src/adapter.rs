//! Conversion between host attribute JSON and typed values
//!
//! The host hands every resource over as a flat JSON object. This module
//! decodes those objects, turns server attributes into a validated
//! [`ServerConfig`] and renders remote servers back into attributes.

use crate::error::ProviderError;
use crate::model::{
    AttachmentSet, FirewallRule, FirewallRuleSet, NetworkAttachment, ServerConfig, ServerSpec, StorageAttachment,
};
use crate::validation::{validate_server_config, HardwareProfile};
use chrono::{DateTime, Utc};
use gridscale_client::Server;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decode a host attribute object
pub fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, ProviderError> {
    Ok(serde_json::from_value(value.clone())?)
}

/// Encode attributes for the host
pub fn encode<T: Serialize>(attributes: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(attributes)?)
}

/// Resource id stored in a state object
pub fn state_id(state: &Value) -> Result<String, ProviderError> {
    state
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Validation("state has no 'id' attribute".to_string()))
}

/// Empty strings are how the host spells "unset"
pub fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

/// RFC 3339 rendering of an API timestamp
pub fn timestamp(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|t| t.to_rfc3339())
}

/// One entry of the server `storage` list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageAttributes {
    pub object_uuid: String,
    pub bootdevice: bool,
    pub object_name: String,
}

/// One entry of the server `network` list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkAttributes {
    pub object_uuid: String,
    pub bootdevice: bool,
    pub rules_v4_in: Vec<FirewallRule>,
    pub rules_v4_out: Vec<FirewallRule>,
    pub rules_v6_in: Vec<FirewallRule>,
    pub rules_v6_out: Vec<FirewallRule>,
    pub object_name: String,
    pub ordering: u32,
    pub mac: String,
}

impl NetworkAttributes {
    fn firewall(&self) -> FirewallRuleSet {
        FirewallRuleSet {
            rules_v4_in: self.rules_v4_in.clone(),
            rules_v4_out: self.rules_v4_out.clone(),
            rules_v6_in: self.rules_v6_in.clone(),
            rules_v6_out: self.rules_v6_out.clone(),
        }
        .canonical()
    }
}

/// Attributes of a `gridscale_server` resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub cores: u32,
    pub memory: u32,
    pub location_uuid: String,
    pub hardware_profile: String,
    pub power: bool,
    pub availability_zone: Option<String>,
    pub storage: Vec<StorageAttributes>,
    pub network: Vec<NetworkAttributes>,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    pub isoimage: Option<String>,
    pub labels: Vec<String>,
    // Computed
    pub legacy: bool,
    pub status: String,
    pub current_price: f64,
    pub auto_recovery: bool,
    pub console_token: String,
    pub usage_in_minutes_memory: u64,
    pub usage_in_minutes_cores: u64,
}

impl ServerAttributes {
    /// Typed, validated desired configuration
    pub fn to_config(&self) -> Result<ServerConfig, ProviderError> {
        let hardware_profile: HardwareProfile = self.hardware_profile.parse()?;
        let ipv4 = non_empty(self.ipv4.as_ref());
        let ipv6 = non_empty(self.ipv6.as_ref());

        let config = ServerConfig {
            spec: ServerSpec {
                name: self.name.clone(),
                cores: self.cores,
                memory: self.memory,
                location_uuid: self.location_uuid.clone(),
                hardware_profile,
                legacy: hardware_profile == HardwareProfile::Legacy,
                power: self.power,
                availability_zone: non_empty(self.availability_zone.as_ref()),
                labels: self.labels.clone(),
            },
            attachments: AttachmentSet {
                storages: self
                    .storage
                    .iter()
                    .map(|s| StorageAttachment {
                        object_uuid: s.object_uuid.clone(),
                        bootdevice: s.bootdevice,
                    })
                    .collect(),
                networks: self
                    .network
                    .iter()
                    .map(|n| NetworkAttachment {
                        object_uuid: n.object_uuid.clone(),
                        bootdevice: n.bootdevice,
                        firewall: n.firewall(),
                    })
                    .collect(),
                public_network: ipv4.is_some() || ipv6.is_some(),
                ipv4,
                ipv6,
                iso_image: non_empty(self.isoimage.as_ref()),
            },
        };
        validate_server_config(&config)?;
        Ok(config)
    }

    /// Attributes describing a remote server
    pub fn from_server(server: &Server) -> Self {
        let relations = &server.relations;
        let ip_of_family = |family: u8| {
            relations
                .public_ips
                .iter()
                .find(|ip| ip.family == family)
                .map(|ip| ip.object_uuid.clone())
        };

        Self {
            id: Some(server.object_uuid.clone()),
            name: server.name.clone(),
            cores: server.cores,
            memory: server.memory,
            location_uuid: server.location_uuid.clone(),
            hardware_profile: HardwareProfile::from_remote(&server.hardware_profile).to_string(),
            power: server.power,
            availability_zone: non_empty(server.availability_zone.as_ref()),
            storage: relations
                .storages
                .iter()
                .map(|s| StorageAttributes {
                    object_uuid: s.object_uuid.clone(),
                    bootdevice: s.bootdevice,
                    object_name: s.object_name.clone(),
                })
                .collect(),
            network: relations
                .networks
                .iter()
                .filter(|n| !n.public_net)
                .map(|n| {
                    let firewall = FirewallRuleSet::from_api(n.firewall.as_ref());
                    NetworkAttributes {
                        object_uuid: n.object_uuid.clone(),
                        bootdevice: n.bootdevice,
                        rules_v4_in: firewall.rules_v4_in,
                        rules_v4_out: firewall.rules_v4_out,
                        rules_v6_in: firewall.rules_v6_in,
                        rules_v6_out: firewall.rules_v6_out,
                        object_name: n.object_name.clone(),
                        ordering: n.ordering,
                        mac: n.mac.clone(),
                    }
                })
                .collect(),
            ipv4: ip_of_family(4),
            ipv6: ip_of_family(6),
            isoimage: relations.isoimages.first().map(|i| i.object_uuid.clone()),
            labels: server.labels.clone(),
            legacy: server.legacy,
            status: server.status.clone(),
            current_price: server.current_price,
            auto_recovery: server.auto_recovery,
            console_token: server.console_token.clone(),
            usage_in_minutes_memory: server.usage_in_minutes_memory,
            usage_in_minutes_cores: server.usage_in_minutes_cores,
        }
    }
}

/// Current configuration of a remote server, as the reconciler diffs it
pub fn current_config(server: &Server) -> ServerConfig {
    let attributes = ServerAttributes::from_server(server);
    ServerConfig {
        spec: ServerSpec {
            name: server.name.clone(),
            cores: server.cores,
            memory: server.memory,
            location_uuid: server.location_uuid.clone(),
            hardware_profile: HardwareProfile::from_remote(&server.hardware_profile),
            legacy: server.legacy,
            power: server.power,
            availability_zone: attributes.availability_zone,
            labels: server.labels.clone(),
        },
        attachments: AttachmentSet {
            storages: attributes
                .storage
                .iter()
                .map(|s| StorageAttachment {
                    object_uuid: s.object_uuid.clone(),
                    bootdevice: s.bootdevice,
                })
                .collect(),
            networks: attributes
                .network
                .iter()
                .map(|n| NetworkAttachment {
                    object_uuid: n.object_uuid.clone(),
                    bootdevice: n.bootdevice,
                    firewall: n.firewall(),
                })
                .collect(),
            ipv4: attributes.ipv4,
            ipv6: attributes.ipv6,
            iso_image: attributes.isoimage,
            public_network: server.relations.networks.iter().any(|n| n.public_net),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::uuid;
    use gridscale_client::{
        FirewallRuleProperties, FirewallRules, ServerIpRelation, ServerIsoImageRelation, ServerNetworkRelation,
        ServerStorageRelation,
    };
    use serde_json::json;

    fn remote_server() -> Server {
        let mut server = gridscale_client::mock::helpers::server(&uuid(1), "web");
        server.power = true;
        server.relations.storages.push(ServerStorageRelation {
            object_uuid: uuid(2),
            object_name: "root".to_string(),
            bootdevice: true,
        });
        server.relations.networks.push(ServerNetworkRelation {
            object_uuid: uuid(10),
            public_net: true,
            ..Default::default()
        });
        server.relations.networks.push(ServerNetworkRelation {
            object_uuid: uuid(11),
            firewall: Some(FirewallRules {
                rules_v4_in: vec![
                    FirewallRuleProperties {
                        order: 2,
                        action: "drop".to_string(),
                        ..Default::default()
                    },
                    FirewallRuleProperties {
                        order: 1,
                        action: "allow".to_string(),
                        protocol: Some("tcp".to_string()),
                        dst_port: Some("22".to_string()),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        });
        server.relations.public_ips.push(ServerIpRelation {
            object_uuid: uuid(22),
            family: 6,
            ..Default::default()
        });
        server.relations.isoimages.push(ServerIsoImageRelation {
            object_uuid: uuid(30),
            object_name: "installer".to_string(),
        });
        server
    }

    #[test]
    fn test_decode_server_attributes() {
        let attributes: ServerAttributes = decode(&json!({
            "name": "web",
            "cores": 2,
            "memory": 4,
            "location_uuid": uuid(1),
            "storage": [{"object_uuid": uuid(2), "bootdevice": true}],
            "network": [{
                "object_uuid": uuid(11),
                "rules_v4_in": [{"order": 1, "action": "allow", "protocol": "tcp", "dst_port": "80"}]
            }],
            "ipv4": "",
            "ipv6": uuid(22)
        }))
        .unwrap();

        let config = attributes.to_config().unwrap();
        assert_eq!(config.spec.hardware_profile, HardwareProfile::Default);
        assert_eq!(config.attachments.ipv4, None);
        assert_eq!(config.attachments.ipv6, Some(uuid(22)));
        assert!(config.attachments.public_network);
        assert_eq!(config.attachments.networks[0].firewall.rules_v4_in.len(), 1);
    }

    #[test]
    fn test_decode_rejects_unknown_action() {
        let result: Result<ServerAttributes, _> = decode(&json!({
            "network": [{"object_uuid": uuid(11), "rules_v4_in": [{"order": 1, "action": "reject"}]}]
        }));
        assert!(matches!(result, Err(ProviderError::Serialization(_))));
    }

    #[test]
    fn test_to_config_runs_validation() {
        let attributes = ServerAttributes {
            name: "web".to_string(),
            cores: 1,
            memory: 1,
            location_uuid: uuid(1),
            hardware_profile: "mainframe".to_string(),
            ..Default::default()
        };
        assert!(matches!(attributes.to_config(), Err(ProviderError::Validation(_))));
    }

    #[test]
    fn test_from_server_splits_public_network_and_ip_families() {
        let attributes = ServerAttributes::from_server(&remote_server());

        assert_eq!(attributes.id, Some(uuid(1)));
        assert_eq!(attributes.network.len(), 1);
        assert_eq!(attributes.network[0].object_uuid, uuid(11));
        // Rules come back sorted by order
        assert_eq!(attributes.network[0].rules_v4_in[0].order, 1);
        assert_eq!(attributes.ipv4, None);
        assert_eq!(attributes.ipv6, Some(uuid(22)));
        assert_eq!(attributes.isoimage, Some(uuid(30)));
        assert_eq!(attributes.storage[0].object_name, "root");
    }

    #[test]
    fn test_current_config_tracks_public_network() {
        let config = current_config(&remote_server());
        assert!(config.attachments.public_network);
        assert!(config.spec.power);
        assert_eq!(config.attachments.networks.len(), 1);
        assert!(config.attachments.storages[0].bootdevice);
    }

    #[test]
    fn test_state_id() {
        assert_eq!(state_id(&json!({"id": "abc"})).unwrap(), "abc");
        assert!(state_id(&json!({"id": ""})).is_err());
        assert!(state_id(&json!({})).is_err());
    }
}
