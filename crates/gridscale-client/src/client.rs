//! gridscale API client
//!
//! Implements the gridscale REST API client.
//! Based on the gridscale API structure: /objects/servers/, /objects/networks/, ...

use crate::common::{segment, HttpClient};
use crate::error::GridscaleError;
use crate::gridscale_trait::GridscaleClientTrait;
use crate::models::*;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default gridscale API endpoint
pub const DEFAULT_API_URL: &str = "https://api.gridscale.io";

/// gridscale API client
#[derive(Debug, Clone)]
pub struct GridscaleClient {
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct PowerState {
    power: bool,
}

impl GridscaleClient {
    /// Create a new gridscale client
    ///
    /// # Arguments
    /// * `base_url` - API base URL (e.g., "https://api.gridscale.io")
    /// * `user_uuid` - UUID of the API user (`X-Auth-UserId`)
    /// * `token` - API token (`X-Auth-Token`)
    pub fn new(base_url: String, user_uuid: String, token: String) -> Result<Self, GridscaleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(GridscaleError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, base_url, user_uuid, token),
        })
    }

    fn server_path(id: &str) -> String {
        format!("/objects/servers/{}", segment(id))
    }

    fn relation_path(server_id: &str, relation: &str, object_id: &str) -> String {
        format!("{}/{}/{}", Self::server_path(server_id), relation, segment(object_id))
    }

    async fn get_power_state(&self, id: &str) -> Result<bool, GridscaleError> {
        let path = format!("{}/power", Self::server_path(id));
        debug!("Fetching power state of server {}", id);
        let state: PowerState = self.http.get(&path).await?;
        Ok(state.power)
    }

    async fn set_power_state(&self, id: &str, power: bool) -> Result<(), GridscaleError> {
        if self.get_power_state(id).await? == power {
            debug!("Server {} already has power={}", id, power);
            return Ok(());
        }
        let path = format!("{}/power", Self::server_path(id));
        self.http.patch(&path, &serde_json::json!({ "power": power })).await
    }
}

#[async_trait::async_trait]
impl GridscaleClientTrait for GridscaleClient {
    fn base_url(&self) -> &str {
        self.http.base_url()
    }

    async fn validate_credentials(&self) -> Result<(), GridscaleError> {
        debug!("Validating gridscale credentials");
        self.get_server_list().await?;
        debug!("Credentials validated successfully");
        Ok(())
    }

    async fn get_server(&self, id: &str) -> Result<Server, GridscaleError> {
        debug!("Fetching server {}", id);
        self.http.get_object(&Self::server_path(id), "server").await
    }

    async fn get_server_list(&self) -> Result<Vec<Server>, GridscaleError> {
        self.http.get_list("/objects/servers", "servers").await
    }

    async fn create_server(&self, request: &ServerCreateRequest) -> Result<CreateResponse, GridscaleError> {
        debug!("Creating server {}", request.name);
        self.http.post("/objects/servers", request).await
    }

    async fn update_server(&self, id: &str, request: &ServerUpdateRequest) -> Result<(), GridscaleError> {
        self.http.patch(&Self::server_path(id), request).await
    }

    async fn delete_server(&self, id: &str) -> Result<(), GridscaleError> {
        self.http.delete(&Self::server_path(id)).await
    }

    async fn start_server(&self, id: &str) -> Result<(), GridscaleError> {
        self.set_power_state(id, true).await
    }

    async fn stop_server(&self, id: &str) -> Result<(), GridscaleError> {
        self.set_power_state(id, false).await
    }

    async fn shutdown_server(&self, id: &str) -> Result<(), GridscaleError> {
        if !self.get_power_state(id).await? {
            return Ok(());
        }
        let path = format!("{}/shutdown", Self::server_path(id));
        self.http.patch(&path, &serde_json::json!({})).await
    }

    async fn link_storage(&self, server_id: &str, storage_id: &str, bootdevice: bool) -> Result<(), GridscaleError> {
        let path = format!("{}/storages", Self::server_path(server_id));
        let body = serde_json::json!({ "object_uuid": storage_id, "bootdevice": bootdevice });
        self.http.post_no_content(&path, &body).await
    }

    async fn update_storage_link(&self, server_id: &str, storage_id: &str, bootdevice: bool) -> Result<(), GridscaleError> {
        let path = Self::relation_path(server_id, "storages", storage_id);
        self.http.patch(&path, &serde_json::json!({ "bootdevice": bootdevice })).await
    }

    async fn unlink_storage(&self, server_id: &str, storage_id: &str) -> Result<(), GridscaleError> {
        self.http.delete(&Self::relation_path(server_id, "storages", storage_id)).await
    }

    async fn link_network(&self, server_id: &str, network_id: &str, request: &LinkNetworkRequest) -> Result<(), GridscaleError> {
        let path = format!("{}/networks", Self::server_path(server_id));
        let mut body = serde_json::to_value(request)?;
        if let Some(object) = body.as_object_mut() {
            object.insert("object_uuid".to_string(), serde_json::Value::String(network_id.to_string()));
        }
        self.http.post_no_content(&path, &body).await
    }

    async fn update_network_link(&self, server_id: &str, network_id: &str, request: &LinkNetworkRequest) -> Result<(), GridscaleError> {
        let path = Self::relation_path(server_id, "networks", network_id);
        self.http.patch(&path, request).await
    }

    async fn unlink_network(&self, server_id: &str, network_id: &str) -> Result<(), GridscaleError> {
        self.http.delete(&Self::relation_path(server_id, "networks", network_id)).await
    }

    async fn link_ip(&self, server_id: &str, ip_id: &str) -> Result<(), GridscaleError> {
        let path = format!("{}/ips", Self::server_path(server_id));
        self.http.post_no_content(&path, &serde_json::json!({ "object_uuid": ip_id })).await
    }

    async fn unlink_ip(&self, server_id: &str, ip_id: &str) -> Result<(), GridscaleError> {
        self.http.delete(&Self::relation_path(server_id, "ips", ip_id)).await
    }

    async fn link_iso_image(&self, server_id: &str, iso_image_id: &str) -> Result<(), GridscaleError> {
        let path = format!("{}/isoimages", Self::server_path(server_id));
        self.http.post_no_content(&path, &serde_json::json!({ "object_uuid": iso_image_id })).await
    }

    async fn unlink_iso_image(&self, server_id: &str, iso_image_id: &str) -> Result<(), GridscaleError> {
        self.http.delete(&Self::relation_path(server_id, "isoimages", iso_image_id)).await
    }

    async fn get_network(&self, id: &str) -> Result<Network, GridscaleError> {
        self.http.get_object(&format!("/objects/networks/{}", segment(id)), "network").await
    }

    async fn get_object_storage_access_key(&self, id: &str) -> Result<ObjectStorageAccessKey, GridscaleError> {
        self.http
            .get_object(&format!("/objects/objectstorages/access_keys/{}", segment(id)), "access_key")
            .await
    }

    async fn get_network_list(&self) -> Result<Vec<Network>, GridscaleError> {
        self.http.get_list("/objects/networks", "networks").await
    }

    async fn get_network_public(&self) -> Result<Network, GridscaleError> {
        self.get_network_list()
            .await?
            .into_iter()
            .find(|network| network.public_net)
            .ok_or_else(|| GridscaleError::NotFound("Public network not found".to_string()))
    }

    async fn get_ip(&self, id: &str) -> Result<Ip, GridscaleError> {
        self.http.get_object(&format!("/objects/ips/{}", segment(id)), "ip").await
    }

    async fn get_ip_version(&self, id: &str) -> Result<u8, GridscaleError> {
        Ok(self.get_ip(id).await?.family)
    }

    async fn create_ip(&self, request: &IpCreateRequest) -> Result<CreateResponse, GridscaleError> {
        self.http.post("/objects/ips", request).await
    }

    async fn update_ip(&self, id: &str, request: &IpUpdateRequest) -> Result<(), GridscaleError> {
        self.http.patch(&format!("/objects/ips/{}", segment(id)), request).await
    }

    async fn delete_ip(&self, id: &str) -> Result<(), GridscaleError> {
        self.http.delete(&format!("/objects/ips/{}", segment(id))).await
    }

    async fn get_storage(&self, id: &str) -> Result<Storage, GridscaleError> {
        self.http.get_object(&format!("/objects/storages/{}", segment(id)), "storage").await
    }

    async fn get_iso_image(&self, id: &str) -> Result<IsoImage, GridscaleError> {
        self.http.get_object(&format!("/objects/isoimages/{}", segment(id)), "isoimage").await
    }

    async fn get_sshkey(&self, id: &str) -> Result<SshKey, GridscaleError> {
        self.http.get_object(&format!("/objects/sshkeys/{}", segment(id)), "sshkey").await
    }

    async fn get_loadbalancer(&self, id: &str) -> Result<Loadbalancer, GridscaleError> {
        self.http.get_object(&format!("/objects/loadbalancers/{}", segment(id)), "loadbalancer").await
    }

    async fn get_paas_service(&self, id: &str) -> Result<PaasService, GridscaleError> {
        self.http.get_object(&format!("/objects/paas/services/{}", segment(id)), "paas_service").await
    }

    async fn get_security_zone(&self, id: &str) -> Result<SecurityZone, GridscaleError> {
        self.http.get_object(&format!("/objects/paas/security_zones/{}", segment(id)), "paas_security_zone").await
    }

    async fn create_security_zone(&self, request: &SecurityZoneCreateRequest) -> Result<CreateResponse, GridscaleError> {
        self.http.post("/objects/paas/security_zones", request).await
    }

    async fn update_security_zone(&self, id: &str, request: &SecurityZoneUpdateRequest) -> Result<(), GridscaleError> {
        self.http.patch(&format!("/objects/paas/security_zones/{}", segment(id)), request).await
    }

    async fn delete_security_zone(&self, id: &str) -> Result<(), GridscaleError> {
        self.http.delete(&format!("/objects/paas/security_zones/{}", segment(id))).await
    }

    async fn get_storage_snapshot(&self, storage_id: &str, snapshot_id: &str) -> Result<StorageSnapshot, GridscaleError> {
        let path = format!("/objects/storages/{}/snapshots/{}", segment(storage_id), segment(snapshot_id));
        self.http.get_object(&path, "snapshot").await
    }

    async fn create_storage_snapshot(&self, storage_id: &str, request: &SnapshotRequest) -> Result<CreateResponse, GridscaleError> {
        let path = format!("/objects/storages/{}/snapshots", segment(storage_id));
        self.http.post(&path, request).await
    }

    async fn update_storage_snapshot(&self, storage_id: &str, snapshot_id: &str, request: &SnapshotRequest) -> Result<(), GridscaleError> {
        let path = format!("/objects/storages/{}/snapshots/{}", segment(storage_id), segment(snapshot_id));
        self.http.patch(&path, request).await
    }

    async fn delete_storage_snapshot(&self, storage_id: &str, snapshot_id: &str) -> Result<(), GridscaleError> {
        let path = format!("/objects/storages/{}/snapshots/{}", segment(storage_id), segment(snapshot_id));
        self.http.delete(&path).await
    }
}
