//! GridscaleClient trait for mocking
//!
//! This trait abstracts the GridscaleClient so the provider can be exercised
//! against an in-memory implementation. The concrete GridscaleClient implements
//! this trait, and tests use `MockGridscaleClient`.

use crate::error::GridscaleError;
use crate::models::*;

/// Trait for gridscale API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait GridscaleClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Validate the user UUID and token by listing servers
    async fn validate_credentials(&self) -> Result<(), GridscaleError>;

    // Server operations
    async fn get_server(&self, id: &str) -> Result<Server, GridscaleError>;
    async fn get_server_list(&self) -> Result<Vec<Server>, GridscaleError>;
    async fn create_server(&self, request: &ServerCreateRequest) -> Result<CreateResponse, GridscaleError>;
    async fn update_server(&self, id: &str, request: &ServerUpdateRequest) -> Result<(), GridscaleError>;
    async fn delete_server(&self, id: &str) -> Result<(), GridscaleError>;
    async fn start_server(&self, id: &str) -> Result<(), GridscaleError>;
    async fn stop_server(&self, id: &str) -> Result<(), GridscaleError>;
    async fn shutdown_server(&self, id: &str) -> Result<(), GridscaleError>;

    // Server relations
    async fn link_storage(&self, server_id: &str, storage_id: &str, bootdevice: bool) -> Result<(), GridscaleError>;
    async fn update_storage_link(&self, server_id: &str, storage_id: &str, bootdevice: bool) -> Result<(), GridscaleError>;
    async fn unlink_storage(&self, server_id: &str, storage_id: &str) -> Result<(), GridscaleError>;
    async fn link_network(&self, server_id: &str, network_id: &str, request: &LinkNetworkRequest) -> Result<(), GridscaleError>;
    async fn update_network_link(&self, server_id: &str, network_id: &str, request: &LinkNetworkRequest) -> Result<(), GridscaleError>;
    async fn unlink_network(&self, server_id: &str, network_id: &str) -> Result<(), GridscaleError>;
    async fn link_ip(&self, server_id: &str, ip_id: &str) -> Result<(), GridscaleError>;
    async fn unlink_ip(&self, server_id: &str, ip_id: &str) -> Result<(), GridscaleError>;
    async fn link_iso_image(&self, server_id: &str, iso_image_id: &str) -> Result<(), GridscaleError>;
    async fn unlink_iso_image(&self, server_id: &str, iso_image_id: &str) -> Result<(), GridscaleError>;

    // Networks
    async fn get_network(&self, id: &str) -> Result<Network, GridscaleError>;
    async fn get_network_list(&self) -> Result<Vec<Network>, GridscaleError>;
    async fn get_network_public(&self) -> Result<Network, GridscaleError>;

    // IP addresses
    async fn get_ip(&self, id: &str) -> Result<Ip, GridscaleError>;
    async fn get_ip_version(&self, id: &str) -> Result<u8, GridscaleError>;
    async fn create_ip(&self, request: &IpCreateRequest) -> Result<CreateResponse, GridscaleError>;
    async fn update_ip(&self, id: &str, request: &IpUpdateRequest) -> Result<(), GridscaleError>;
    async fn delete_ip(&self, id: &str) -> Result<(), GridscaleError>;

    // Other objects observed by the status poller
    async fn get_storage(&self, id: &str) -> Result<Storage, GridscaleError>;
    async fn get_iso_image(&self, id: &str) -> Result<IsoImage, GridscaleError>;
    async fn get_sshkey(&self, id: &str) -> Result<SshKey, GridscaleError>;
    async fn get_loadbalancer(&self, id: &str) -> Result<Loadbalancer, GridscaleError>;
    async fn get_paas_service(&self, id: &str) -> Result<PaasService, GridscaleError>;

    // Object storage
    async fn get_object_storage_access_key(&self, id: &str) -> Result<ObjectStorageAccessKey, GridscaleError>;

    // PaaS security zones
    async fn get_security_zone(&self, id: &str) -> Result<SecurityZone, GridscaleError>;
    async fn create_security_zone(&self, request: &SecurityZoneCreateRequest) -> Result<CreateResponse, GridscaleError>;
    async fn update_security_zone(&self, id: &str, request: &SecurityZoneUpdateRequest) -> Result<(), GridscaleError>;
    async fn delete_security_zone(&self, id: &str) -> Result<(), GridscaleError>;

    // Storage snapshots (addressed by storage UUID + snapshot UUID)
    async fn get_storage_snapshot(&self, storage_id: &str, snapshot_id: &str) -> Result<StorageSnapshot, GridscaleError>;
    async fn create_storage_snapshot(&self, storage_id: &str, request: &SnapshotRequest) -> Result<CreateResponse, GridscaleError>;
    async fn update_storage_snapshot(&self, storage_id: &str, snapshot_id: &str, request: &SnapshotRequest) -> Result<(), GridscaleError>;
    async fn delete_storage_snapshot(&self, storage_id: &str, snapshot_id: &str) -> Result<(), GridscaleError>;
}
