//! Mock GridscaleClient for unit testing
//!
//! This module provides an in-memory implementation of GridscaleClientTrait that
//! can be used in unit tests without a gridscale account.
//!
//! The mock is organized into domain-specific modules:
//! - `servers.rs` - servers, power state and server relations
//! - `objects.rs` - networks, IPs, storages, snapshots, security zones, ...
//! - `helpers.rs` - fixture builders for seeding the store
//!
//! Every mutating call is recorded as a [`MockCall`] (including calls that fail),
//! and failures can be queued per operation with [`MockGridscaleClient::fail_next`].

pub mod helpers;
mod objects;
mod servers;

use crate::error::GridscaleError;
use crate::gridscale_trait::GridscaleClientTrait;
use crate::models::*;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub use helpers::test_uuid;

/// Operations whose outcome can be forced with [`MockGridscaleClient::fail_next`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    GetServer,
    CreateServer,
    UpdateServer,
    DeleteServer,
    StartServer,
    StopServer,
    ShutdownServer,
    LinkStorage,
    UpdateStorageLink,
    UnlinkStorage,
    LinkNetwork,
    UpdateNetworkLink,
    UnlinkNetwork,
    LinkIp,
    UnlinkIp,
    LinkIsoImage,
    UnlinkIsoImage,
    GetNetwork,
    GetNetworkPublic,
    GetIp,
    GetIpVersion,
    CreateIp,
    UpdateIp,
    DeleteIp,
    GetStorage,
    GetIsoImage,
    GetSshKey,
    GetLoadbalancer,
    GetPaasService,
    GetObjectStorageAccessKey,
    GetSecurityZone,
    CreateSecurityZone,
    UpdateSecurityZone,
    DeleteSecurityZone,
    GetSnapshot,
    CreateSnapshot,
    UpdateSnapshot,
    DeleteSnapshot,
}

/// A mutating call received by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    CreateServer { name: String },
    UpdateServer { server: String, request: ServerUpdateRequest },
    DeleteServer { server: String },
    StartServer { server: String },
    StopServer { server: String },
    ShutdownServer { server: String },
    LinkStorage { server: String, storage: String, bootdevice: bool },
    UpdateStorageLink { server: String, storage: String, bootdevice: bool },
    UnlinkStorage { server: String, storage: String },
    LinkNetwork { server: String, network: String, request: LinkNetworkRequest },
    UpdateNetworkLink { server: String, network: String, request: LinkNetworkRequest },
    UnlinkNetwork { server: String, network: String },
    LinkIp { server: String, ip: String },
    UnlinkIp { server: String, ip: String },
    LinkIsoImage { server: String, iso_image: String },
    UnlinkIsoImage { server: String, iso_image: String },
    CreateIp { family: u8 },
    UpdateIp { ip: String },
    DeleteIp { ip: String },
    CreateSecurityZone { name: String },
    UpdateSecurityZone { zone: String },
    DeleteSecurityZone { zone: String },
    CreateSnapshot { storage: String, name: String },
    UpdateSnapshot { storage: String, snapshot: String },
    DeleteSnapshot { storage: String, snapshot: String },
}

impl MockCall {
    /// True for link/unlink calls on a server relation
    pub fn is_link_or_unlink(&self) -> bool {
        matches!(
            self,
            MockCall::LinkStorage { .. }
                | MockCall::UnlinkStorage { .. }
                | MockCall::LinkNetwork { .. }
                | MockCall::UnlinkNetwork { .. }
                | MockCall::LinkIp { .. }
                | MockCall::UnlinkIp { .. }
                | MockCall::LinkIsoImage { .. }
                | MockCall::UnlinkIsoImage { .. }
        )
    }

    /// True if the call names `id` as its linked object
    pub fn references(&self, id: &str) -> bool {
        match self {
            MockCall::LinkStorage { storage, .. }
            | MockCall::UpdateStorageLink { storage, .. }
            | MockCall::UnlinkStorage { storage, .. } => storage == id,
            MockCall::LinkNetwork { network, .. }
            | MockCall::UpdateNetworkLink { network, .. }
            | MockCall::UnlinkNetwork { network, .. } => network == id,
            MockCall::LinkIp { ip, .. } | MockCall::UnlinkIp { ip, .. } => ip == id,
            MockCall::LinkIsoImage { iso_image, .. } | MockCall::UnlinkIsoImage { iso_image, .. } => iso_image == id,
            _ => false,
        }
    }
}

/// Mock GridscaleClient for testing
///
/// This mock stores objects in memory and enforces the relation rules the
/// provider relies on: linking an already linked object is a conflict, unlinking
/// a missing relation is not-found, and a powered-on legacy server rejects
/// hot-plug changes.
#[derive(Clone, Debug)]
pub struct MockGridscaleClient {
    pub(crate) base_url: String,
    // In-memory storage for objects
    pub(crate) servers: Arc<Mutex<HashMap<String, Server>>>,
    pub(crate) networks: Arc<Mutex<HashMap<String, Network>>>,
    pub(crate) ips: Arc<Mutex<HashMap<String, Ip>>>,
    pub(crate) storages: Arc<Mutex<HashMap<String, Storage>>>,
    pub(crate) iso_images: Arc<Mutex<HashMap<String, IsoImage>>>,
    pub(crate) sshkeys: Arc<Mutex<HashMap<String, SshKey>>>,
    pub(crate) loadbalancers: Arc<Mutex<HashMap<String, Loadbalancer>>>,
    pub(crate) paas_services: Arc<Mutex<HashMap<String, PaasService>>>,
    pub(crate) security_zones: Arc<Mutex<HashMap<String, SecurityZone>>>,
    pub(crate) snapshots: Arc<Mutex<HashMap<(String, String), StorageSnapshot>>>,
    pub(crate) access_keys: Arc<Mutex<HashMap<String, ObjectStorageAccessKey>>>,
    // Call log and queued failures
    pub(crate) calls: Arc<Mutex<Vec<MockCall>>>,
    pub(crate) failures: Arc<Mutex<HashMap<MockOp, VecDeque<u16>>>>,
    // Counter for generating IDs
    pub(crate) next_id: Arc<Mutex<u64>>,
}

impl MockGridscaleClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            servers: Arc::new(Mutex::new(HashMap::new())),
            networks: Arc::new(Mutex::new(HashMap::new())),
            ips: Arc::new(Mutex::new(HashMap::new())),
            storages: Arc::new(Mutex::new(HashMap::new())),
            iso_images: Arc::new(Mutex::new(HashMap::new())),
            sshkeys: Arc::new(Mutex::new(HashMap::new())),
            loadbalancers: Arc::new(Mutex::new(HashMap::new())),
            paas_services: Arc::new(Mutex::new(HashMap::new())),
            security_zones: Arc::new(Mutex::new(HashMap::new())),
            snapshots: Arc::new(Mutex::new(HashMap::new())),
            access_keys: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            // High start so generated IDs never collide with fixture IDs
            next_id: Arc::new(Mutex::new(10_000)),
        }
    }

    /// Add a server to the mock store (for test setup)
    pub fn add_server(&self, server: Server) {
        self.servers.lock().unwrap().insert(server.object_uuid.clone(), server);
    }

    /// Add a network to the mock store (for test setup)
    pub fn add_network(&self, network: Network) {
        self.networks.lock().unwrap().insert(network.object_uuid.clone(), network);
    }

    /// Add an IP address to the mock store (for test setup)
    pub fn add_ip(&self, ip: Ip) {
        self.ips.lock().unwrap().insert(ip.object_uuid.clone(), ip);
    }

    /// Add a storage to the mock store (for test setup)
    pub fn add_storage(&self, storage: Storage) {
        self.storages.lock().unwrap().insert(storage.object_uuid.clone(), storage);
    }

    /// Add an ISO image to the mock store (for test setup)
    pub fn add_iso_image(&self, iso_image: IsoImage) {
        self.iso_images.lock().unwrap().insert(iso_image.object_uuid.clone(), iso_image);
    }

    /// Add an SSH key to the mock store (for test setup)
    pub fn add_sshkey(&self, sshkey: SshKey) {
        self.sshkeys.lock().unwrap().insert(sshkey.object_uuid.clone(), sshkey);
    }

    /// Add a load balancer to the mock store (for test setup)
    pub fn add_loadbalancer(&self, loadbalancer: Loadbalancer) {
        self.loadbalancers.lock().unwrap().insert(loadbalancer.object_uuid.clone(), loadbalancer);
    }

    /// Add a PaaS service to the mock store (for test setup)
    pub fn add_paas_service(&self, service: PaasService) {
        self.paas_services.lock().unwrap().insert(service.object_uuid.clone(), service);
    }

    /// Add a security zone to the mock store (for test setup)
    pub fn add_security_zone(&self, zone: SecurityZone) {
        self.security_zones.lock().unwrap().insert(zone.object_uuid.clone(), zone);
    }

    /// Add a snapshot of `storage_id` to the mock store (for test setup)
    pub fn add_snapshot(&self, storage_id: &str, snapshot: StorageSnapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert((storage_id.to_string(), snapshot.object_uuid.clone()), snapshot);
    }

    /// Add an object storage access key to the mock store (for test setup)
    pub fn add_access_key(&self, key: ObjectStorageAccessKey) {
        self.access_keys.lock().unwrap().insert(key.access_key.clone(), key);
    }

    /// Current copy of a server, if present
    pub fn server(&self, id: &str) -> Option<Server> {
        self.servers.lock().unwrap().get(id).cloned()
    }

    /// Current copy of an IP address, if present
    pub fn ip(&self, id: &str) -> Option<Ip> {
        self.ips.lock().unwrap().get(id).cloned()
    }

    /// Overwrite the status of a stored server
    pub fn set_server_status(&self, id: &str, status: &str) {
        if let Some(server) = self.servers.lock().unwrap().get_mut(id) {
            server.status = status.to_string();
        }
    }

    /// Overwrite the status of a stored snapshot
    pub fn set_snapshot_status(&self, storage_id: &str, snapshot_id: &str, status: &str) {
        if let Some(snapshot) = self
            .snapshots
            .lock()
            .unwrap()
            .get_mut(&(storage_id.to_string(), snapshot_id.to_string()))
        {
            snapshot.status = status.to_string();
        }
    }

    /// Overwrite the status of a stored security zone
    pub fn set_security_zone_status(&self, id: &str, status: &str) {
        if let Some(zone) = self.security_zones.lock().unwrap().get_mut(id) {
            zone.status = status.to_string();
        }
    }

    /// Make the next call of `op` fail with `status_code`.
    ///
    /// Calling this several times queues several failures, consumed in order.
    pub fn fail_next(&self, op: MockOp, status_code: u16) {
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(status_code);
    }

    /// All mutating calls received so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Link/unlink calls received so far, in order
    pub fn link_calls(&self) -> Vec<MockCall> {
        self.calls().into_iter().filter(MockCall::is_link_or_unlink).collect()
    }

    /// Forget the recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub(crate) fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Return the queued failure for `op`, if any
    pub(crate) fn check(&self, op: MockOp) -> Result<(), GridscaleError> {
        let queued = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match queued {
            Some(status_code) => Err(GridscaleError::from_status(
                status_code,
                format!("injected failure for {:?}", op),
            )),
            None => Ok(()),
        }
    }

    /// Generate next ID
    pub(crate) fn next_uuid(&self) -> String {
        let mut id = self.next_id.lock().unwrap();
        let current = *id;
        *id += 1;
        test_uuid(current)
    }
}

#[async_trait::async_trait]
impl GridscaleClientTrait for MockGridscaleClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_credentials(&self) -> Result<(), GridscaleError> {
        Ok(())
    }

    // Server operations - delegated to servers module
    async fn get_server(&self, id: &str) -> Result<Server, GridscaleError> {
        servers::get_server(self, id)
    }

    async fn get_server_list(&self) -> Result<Vec<Server>, GridscaleError> {
        Ok(self.servers.lock().unwrap().values().cloned().collect())
    }

    async fn create_server(&self, request: &ServerCreateRequest) -> Result<CreateResponse, GridscaleError> {
        servers::create_server(self, request)
    }

    async fn update_server(&self, id: &str, request: &ServerUpdateRequest) -> Result<(), GridscaleError> {
        servers::update_server(self, id, request)
    }

    async fn delete_server(&self, id: &str) -> Result<(), GridscaleError> {
        servers::delete_server(self, id)
    }

    async fn start_server(&self, id: &str) -> Result<(), GridscaleError> {
        self.record(MockCall::StartServer { server: id.to_string() });
        self.check(MockOp::StartServer)?;
        servers::set_power(self, id, true)
    }

    async fn stop_server(&self, id: &str) -> Result<(), GridscaleError> {
        self.record(MockCall::StopServer { server: id.to_string() });
        self.check(MockOp::StopServer)?;
        servers::set_power(self, id, false)
    }

    async fn shutdown_server(&self, id: &str) -> Result<(), GridscaleError> {
        self.record(MockCall::ShutdownServer { server: id.to_string() });
        self.check(MockOp::ShutdownServer)?;
        servers::set_power(self, id, false)
    }

    async fn link_storage(&self, server_id: &str, storage_id: &str, bootdevice: bool) -> Result<(), GridscaleError> {
        servers::link_storage(self, server_id, storage_id, bootdevice)
    }

    async fn update_storage_link(&self, server_id: &str, storage_id: &str, bootdevice: bool) -> Result<(), GridscaleError> {
        servers::update_storage_link(self, server_id, storage_id, bootdevice)
    }

    async fn unlink_storage(&self, server_id: &str, storage_id: &str) -> Result<(), GridscaleError> {
        servers::unlink_storage(self, server_id, storage_id)
    }

    async fn link_network(&self, server_id: &str, network_id: &str, request: &LinkNetworkRequest) -> Result<(), GridscaleError> {
        servers::link_network(self, server_id, network_id, request)
    }

    async fn update_network_link(&self, server_id: &str, network_id: &str, request: &LinkNetworkRequest) -> Result<(), GridscaleError> {
        servers::update_network_link(self, server_id, network_id, request)
    }

    async fn unlink_network(&self, server_id: &str, network_id: &str) -> Result<(), GridscaleError> {
        servers::unlink_network(self, server_id, network_id)
    }

    async fn link_ip(&self, server_id: &str, ip_id: &str) -> Result<(), GridscaleError> {
        servers::link_ip(self, server_id, ip_id)
    }

    async fn unlink_ip(&self, server_id: &str, ip_id: &str) -> Result<(), GridscaleError> {
        servers::unlink_ip(self, server_id, ip_id)
    }

    async fn link_iso_image(&self, server_id: &str, iso_image_id: &str) -> Result<(), GridscaleError> {
        servers::link_iso_image(self, server_id, iso_image_id)
    }

    async fn unlink_iso_image(&self, server_id: &str, iso_image_id: &str) -> Result<(), GridscaleError> {
        servers::unlink_iso_image(self, server_id, iso_image_id)
    }

    // Object operations - delegated to objects module
    async fn get_network(&self, id: &str) -> Result<Network, GridscaleError> {
        objects::get_network(self, id)
    }

    async fn get_object_storage_access_key(&self, id: &str) -> Result<ObjectStorageAccessKey, GridscaleError> {
        self.check(MockOp::GetObjectStorageAccessKey)?;
        objects::lookup(&self.access_keys, id, "Access key")
    }

    async fn get_network_list(&self) -> Result<Vec<Network>, GridscaleError> {
        Ok(self.networks.lock().unwrap().values().cloned().collect())
    }

    async fn get_network_public(&self) -> Result<Network, GridscaleError> {
        objects::get_network_public(self)
    }

    async fn get_ip(&self, id: &str) -> Result<Ip, GridscaleError> {
        objects::get_ip(self, id)
    }

    async fn get_ip_version(&self, id: &str) -> Result<u8, GridscaleError> {
        self.check(MockOp::GetIpVersion)?;
        Ok(objects::get_ip(self, id)?.family)
    }

    async fn create_ip(&self, request: &IpCreateRequest) -> Result<CreateResponse, GridscaleError> {
        objects::create_ip(self, request)
    }

    async fn update_ip(&self, id: &str, request: &IpUpdateRequest) -> Result<(), GridscaleError> {
        objects::update_ip(self, id, request)
    }

    async fn delete_ip(&self, id: &str) -> Result<(), GridscaleError> {
        objects::delete_ip(self, id)
    }

    async fn get_storage(&self, id: &str) -> Result<Storage, GridscaleError> {
        self.check(MockOp::GetStorage)?;
        objects::lookup(&self.storages, id, "Storage")
    }

    async fn get_iso_image(&self, id: &str) -> Result<IsoImage, GridscaleError> {
        self.check(MockOp::GetIsoImage)?;
        objects::lookup(&self.iso_images, id, "ISO image")
    }

    async fn get_sshkey(&self, id: &str) -> Result<SshKey, GridscaleError> {
        self.check(MockOp::GetSshKey)?;
        objects::lookup(&self.sshkeys, id, "SSH key")
    }

    async fn get_loadbalancer(&self, id: &str) -> Result<Loadbalancer, GridscaleError> {
        self.check(MockOp::GetLoadbalancer)?;
        objects::lookup(&self.loadbalancers, id, "Load balancer")
    }

    async fn get_paas_service(&self, id: &str) -> Result<PaasService, GridscaleError> {
        self.check(MockOp::GetPaasService)?;
        objects::lookup(&self.paas_services, id, "PaaS service")
    }

    async fn get_security_zone(&self, id: &str) -> Result<SecurityZone, GridscaleError> {
        self.check(MockOp::GetSecurityZone)?;
        objects::lookup(&self.security_zones, id, "Security zone")
    }

    async fn create_security_zone(&self, request: &SecurityZoneCreateRequest) -> Result<CreateResponse, GridscaleError> {
        objects::create_security_zone(self, request)
    }

    async fn update_security_zone(&self, id: &str, request: &SecurityZoneUpdateRequest) -> Result<(), GridscaleError> {
        objects::update_security_zone(self, id, request)
    }

    async fn delete_security_zone(&self, id: &str) -> Result<(), GridscaleError> {
        objects::delete_security_zone(self, id)
    }

    async fn get_storage_snapshot(&self, storage_id: &str, snapshot_id: &str) -> Result<StorageSnapshot, GridscaleError> {
        objects::get_snapshot(self, storage_id, snapshot_id)
    }

    async fn create_storage_snapshot(&self, storage_id: &str, request: &SnapshotRequest) -> Result<CreateResponse, GridscaleError> {
        objects::create_snapshot(self, storage_id, request)
    }

    async fn update_storage_snapshot(&self, storage_id: &str, snapshot_id: &str, request: &SnapshotRequest) -> Result<(), GridscaleError> {
        objects::update_snapshot(self, storage_id, snapshot_id, request)
    }

    async fn delete_storage_snapshot(&self, storage_id: &str, snapshot_id: &str) -> Result<(), GridscaleError> {
        objects::delete_snapshot(self, storage_id, snapshot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::helpers::{ip, network, server, storage};
    use super::*;

    fn seeded() -> MockGridscaleClient {
        let mock = MockGridscaleClient::new("http://mock");
        mock.add_server(server(&test_uuid(1), "web"));
        mock.add_storage(storage(&test_uuid(2), "root"));
        mock.add_network(network(&test_uuid(3), "public", true));
        mock.add_ip(ip(&test_uuid(4), 4));
        mock
    }

    #[tokio::test]
    async fn test_link_twice_is_conflict() {
        let mock = seeded();
        mock.link_storage(&test_uuid(1), &test_uuid(2), true).await.unwrap();
        let err = mock.link_storage(&test_uuid(1), &test_uuid(2), true).await.unwrap_err();
        assert_eq!(err.status_code(), Some(409));
        assert_eq!(mock.link_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unlink_missing_relation_is_not_found() {
        let mock = seeded();
        let err = mock.unlink_ip(&test_uuid(1), &test_uuid(4)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_link_ip_updates_both_sides() {
        let mock = seeded();
        mock.link_ip(&test_uuid(1), &test_uuid(4)).await.unwrap();

        let srv = mock.server(&test_uuid(1)).unwrap();
        assert_eq!(srv.relations.public_ips.len(), 1);
        assert_eq!(srv.relations.public_ips[0].family, 4);
        let addr = mock.ip(&test_uuid(4)).unwrap();
        assert_eq!(addr.relations.servers[0].server_uuid, test_uuid(1));

        mock.unlink_ip(&test_uuid(1), &test_uuid(4)).await.unwrap();
        assert!(mock.ip(&test_uuid(4)).unwrap().relations.servers.is_empty());
    }

    #[tokio::test]
    async fn test_link_network_copies_public_flag() {
        let mock = seeded();
        mock.link_network(&test_uuid(1), &test_uuid(3), &LinkNetworkRequest::default())
            .await
            .unwrap();
        let srv = mock.server(&test_uuid(1)).unwrap();
        assert!(srv.relations.networks[0].public_net);
    }

    #[tokio::test]
    async fn test_fail_next_is_consumed_in_order() {
        let mock = seeded();
        mock.fail_next(MockOp::StopServer, 409);
        mock.fail_next(MockOp::StopServer, 500);

        assert!(mock.stop_server(&test_uuid(1)).await.unwrap_err().is_conflict());
        assert_eq!(mock.stop_server(&test_uuid(1)).await.unwrap_err().status_code(), Some(500));
        mock.stop_server(&test_uuid(1)).await.unwrap();
        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_running_legacy_server_rejects_hotplug() {
        let mock = seeded();
        let mut legacy = server(&test_uuid(9), "old");
        legacy.legacy = true;
        legacy.power = true;
        mock.add_server(legacy);

        let err = mock.link_storage(&test_uuid(9), &test_uuid(2), false).await.unwrap_err();
        assert!(err.is_conflict());

        mock.stop_server(&test_uuid(9)).await.unwrap();
        mock.link_storage(&test_uuid(9), &test_uuid(2), false).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_server_then_get_is_not_found() {
        let mock = seeded();
        mock.delete_server(&test_uuid(1)).await.unwrap();
        assert!(mock.get_server(&test_uuid(1)).await.unwrap_err().is_not_found());
    }
}
