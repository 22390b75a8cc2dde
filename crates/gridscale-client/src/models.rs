//! gridscale API models
//!
//! These models match the object representations of the gridscale REST API.
//! Every object is returned wrapped in a single-key envelope (`{"server": {...}}`);
//! the envelope is stripped by [`crate::common::HttpClient`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status reported by objects that finished provisioning
pub const ACTIVE_STATUS: &str = "active";

/// Status reported by objects that are still being provisioned
pub const PROVISIONING_STATUS: &str = "in-provisioning";

/// Server model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Server {
    pub object_uuid: String,
    pub name: String,
    pub cores: u32,
    pub memory: u32,
    pub location_uuid: String,
    pub hardware_profile: String,
    pub power: bool,
    pub availability_zone: Option<String>,
    pub legacy: bool,
    pub status: String,
    pub current_price: f64,
    pub auto_recovery: bool,
    pub console_token: String,
    pub usage_in_minutes_memory: u64,
    pub usage_in_minutes_cores: u64,
    pub labels: Vec<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub change_time: Option<DateTime<Utc>>,
    pub relations: ServerRelations,
}

/// Objects linked to a server
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerRelations {
    pub storages: Vec<ServerStorageRelation>,
    pub networks: Vec<ServerNetworkRelation>,
    pub public_ips: Vec<ServerIpRelation>,
    pub isoimages: Vec<ServerIsoImageRelation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerStorageRelation {
    pub object_uuid: String,
    pub object_name: String,
    pub bootdevice: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerNetworkRelation {
    pub object_uuid: String,
    pub object_name: String,
    pub bootdevice: bool,
    pub public_net: bool,
    pub ordering: u32,
    pub mac: String,
    pub firewall: Option<FirewallRules>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerIpRelation {
    pub object_uuid: String,
    pub family: u8,
    pub ip: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerIsoImageRelation {
    pub object_uuid: String,
    pub object_name: String,
}

/// Firewall rules of a server-network relation, one ordered list per direction
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FirewallRules {
    #[serde(rename = "rules-v4-in")]
    pub rules_v4_in: Vec<FirewallRuleProperties>,
    #[serde(rename = "rules-v4-out")]
    pub rules_v4_out: Vec<FirewallRuleProperties>,
    #[serde(rename = "rules-v6-in")]
    pub rules_v6_in: Vec<FirewallRuleProperties>,
    #[serde(rename = "rules-v6-out")]
    pub rules_v6_out: Vec<FirewallRuleProperties>,
}

impl FirewallRules {
    /// True when no direction carries a rule
    pub fn is_empty(&self) -> bool {
        self.rules_v4_in.is_empty()
            && self.rules_v4_out.is_empty()
            && self.rules_v6_in.is_empty()
            && self.rules_v6_out.is_empty()
    }
}

/// A single firewall rule as the API represents it
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FirewallRuleProperties {
    pub order: i64,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Network model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Network {
    pub object_uuid: String,
    pub name: String,
    pub status: String,
    pub location_uuid: String,
    pub location_name: String,
    pub public_net: bool,
    pub l2security: bool,
    pub network_type: String,
    pub delete_block: bool,
    pub labels: Vec<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub change_time: Option<DateTime<Utc>>,
}

/// IP address model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Ip {
    pub object_uuid: String,
    pub name: String,
    pub ip: String,
    pub prefix: String,
    pub family: u8, // 4 or 6
    pub status: String,
    pub failover: bool,
    pub reverse_dns: String,
    pub location_uuid: String,
    pub location_country: String,
    pub location_iata: String,
    pub location_name: String,
    pub delete_block: bool,
    pub usage_in_minutes: f64,
    pub current_price: f64,
    pub labels: Vec<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub change_time: Option<DateTime<Utc>>,
    pub relations: IpRelations,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IpRelations {
    pub servers: Vec<IpServerRelation>,
    pub loadbalancers: Vec<IpLoadbalancerRelation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IpServerRelation {
    pub server_uuid: String,
    pub server_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IpLoadbalancerRelation {
    pub loadbalancer_uuid: String,
    pub loadbalancer_name: String,
}

/// Storage model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Storage {
    pub object_uuid: String,
    pub name: String,
    pub status: String,
    pub capacity: u64,
    pub storage_type: String,
    pub location_uuid: String,
    pub labels: Vec<String>,
}

/// ISO image model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IsoImage {
    pub object_uuid: String,
    pub name: String,
    pub status: String,
    pub source_url: String,
    pub location_uuid: String,
}

/// SSH key model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SshKey {
    pub object_uuid: String,
    pub name: String,
    pub status: String,
    pub sshkey: String,
}

/// Load balancer model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Loadbalancer {
    pub object_uuid: String,
    pub name: String,
    pub status: String,
    pub algorithm: String,
}

/// PaaS service model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PaasService {
    pub object_uuid: String,
    pub name: String,
    pub status: String,
    pub service_template_uuid: String,
    pub security_zone_uuid: String,
    pub labels: Vec<String>,
}

/// Object storage access key pair
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObjectStorageAccessKey {
    pub access_key: String,
    pub secret_key: String,
    pub user_uuid: String,
}

/// PaaS security zone model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SecurityZone {
    pub object_uuid: String,
    pub name: String,
    pub status: String,
    pub location_uuid: String,
    pub location_country: String,
    pub location_iata: String,
    pub location_name: String,
    pub labels: Vec<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub change_time: Option<DateTime<Utc>>,
}

/// Storage snapshot model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSnapshot {
    pub object_uuid: String,
    pub name: String,
    pub status: String,
    pub capacity: u64,
    pub location_uuid: String,
    pub location_country: String,
    pub location_iata: String,
    pub location_name: String,
    pub usage_in_minutes: u64,
    pub current_price: f64,
    pub license_product_no: Option<u64>,
    pub labels: Vec<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub change_time: Option<DateTime<Utc>>,
}

/// Response body of every create call
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CreateResponse {
    #[serde(alias = "server_uuid")]
    pub object_uuid: String,
    pub request_uuid: Option<String>,
}

/// Request body for creating a server
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerCreateRequest {
    pub name: String,
    pub cores: u32,
    pub memory: u32,
    pub location_uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    pub labels: Vec<String>,
}

/// Request body for updating server fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerUpdateRequest {
    pub name: String,
    pub cores: u32,
    pub memory: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    pub labels: Vec<String>,
}

/// Request body for linking (or re-configuring) a network on a server
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkNetworkRequest {
    pub bootdevice: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firewall_template_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firewall: Option<FirewallRules>,
}

/// Request body for creating an IP address
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpCreateRequest {
    pub family: u8,
    pub location_uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub failover: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse_dns: Option<String>,
    pub labels: Vec<String>,
}

/// Request body for updating an IP address
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub failover: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse_dns: Option<String>,
    pub labels: Vec<String>,
}

/// Request body for creating or updating a storage snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub name: String,
    pub labels: Vec<String>,
}

/// Request body for creating a security zone
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityZoneCreateRequest {
    pub name: String,
    pub location_uuid: String,
    pub labels: Vec<String>,
}

/// Request body for updating a security zone
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityZoneUpdateRequest {
    pub name: String,
    pub labels: Vec<String>,
}
