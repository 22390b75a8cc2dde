//! Object operations for MockGridscaleClient
//!
//! Handles networks, IP addresses, security zones, storage snapshots and the
//! read-only objects the status poller observes

use super::{MockCall, MockGridscaleClient, MockOp};
use crate::error::GridscaleError;
use crate::models::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Look up an object by UUID in one of the mock stores
pub fn lookup<T: Clone>(store: &Arc<Mutex<HashMap<String, T>>>, id: &str, kind: &str) -> Result<T, GridscaleError> {
    store
        .lock()
        .unwrap()
        .get(id)
        .cloned()
        .ok_or_else(|| GridscaleError::NotFound(format!("{} {} not found", kind, id)))
}

pub fn get_network(client: &MockGridscaleClient, id: &str) -> Result<Network, GridscaleError> {
    client.check(MockOp::GetNetwork)?;
    lookup(&client.networks, id, "Network")
}

pub fn get_network_public(client: &MockGridscaleClient) -> Result<Network, GridscaleError> {
    client.check(MockOp::GetNetworkPublic)?;
    client
        .networks
        .lock()
        .unwrap()
        .values()
        .find(|n| n.public_net)
        .cloned()
        .ok_or_else(|| GridscaleError::NotFound("Public network not found".to_string()))
}

pub fn get_ip(client: &MockGridscaleClient, id: &str) -> Result<Ip, GridscaleError> {
    client.check(MockOp::GetIp)?;
    lookup(&client.ips, id, "IP")
}

pub fn create_ip(client: &MockGridscaleClient, request: &IpCreateRequest) -> Result<CreateResponse, GridscaleError> {
    client.record(MockCall::CreateIp { family: request.family });
    client.check(MockOp::CreateIp)?;

    if request.family != 4 && request.family != 6 {
        return Err(GridscaleError::InvalidRequest(format!("Invalid IP family {}", request.family)));
    }
    let id = client.next_uuid();
    let serial = client.ips.lock().unwrap().len() + 1;
    let (ip, prefix) = if request.family == 4 {
        (format!("185.201.0.{}", serial), format!("185.201.0.{}/32", serial))
    } else {
        (format!("2a06:2380::{:x}", serial), format!("2a06:2380::{:x}/128", serial))
    };
    let ip = Ip {
        object_uuid: id.clone(),
        name: request.name.clone().unwrap_or_default(),
        ip,
        prefix,
        family: request.family,
        status: ACTIVE_STATUS.to_string(),
        failover: request.failover,
        reverse_dns: request.reverse_dns.clone().unwrap_or_default(),
        location_uuid: request.location_uuid.clone(),
        labels: request.labels.clone(),
        ..Default::default()
    };
    client.ips.lock().unwrap().insert(id.clone(), ip);

    Ok(CreateResponse {
        object_uuid: id,
        request_uuid: None,
    })
}

pub fn update_ip(client: &MockGridscaleClient, id: &str, request: &IpUpdateRequest) -> Result<(), GridscaleError> {
    client.record(MockCall::UpdateIp { ip: id.to_string() });
    client.check(MockOp::UpdateIp)?;

    let mut ips = client.ips.lock().unwrap();
    let ip = ips
        .get_mut(id)
        .ok_or_else(|| GridscaleError::NotFound(format!("IP {} not found", id)))?;
    if let Some(name) = &request.name {
        ip.name = name.clone();
    }
    if let Some(reverse_dns) = &request.reverse_dns {
        ip.reverse_dns = reverse_dns.clone();
    }
    ip.failover = request.failover;
    ip.labels = request.labels.clone();
    Ok(())
}

pub fn delete_ip(client: &MockGridscaleClient, id: &str) -> Result<(), GridscaleError> {
    client.record(MockCall::DeleteIp { ip: id.to_string() });
    client.check(MockOp::DeleteIp)?;

    let ip = client
        .ips
        .lock()
        .unwrap()
        .remove(id)
        .ok_or_else(|| GridscaleError::NotFound(format!("IP {} not found", id)))?;
    let mut servers = client.servers.lock().unwrap();
    for relation in &ip.relations.servers {
        if let Some(server) = servers.get_mut(&relation.server_uuid) {
            server.relations.public_ips.retain(|i| i.object_uuid != id);
        }
    }
    Ok(())
}

pub fn create_security_zone(client: &MockGridscaleClient, request: &SecurityZoneCreateRequest) -> Result<CreateResponse, GridscaleError> {
    client.record(MockCall::CreateSecurityZone { name: request.name.clone() });
    client.check(MockOp::CreateSecurityZone)?;

    let id = client.next_uuid();
    let zone = SecurityZone {
        object_uuid: id.clone(),
        name: request.name.clone(),
        status: ACTIVE_STATUS.to_string(),
        location_uuid: request.location_uuid.clone(),
        labels: request.labels.clone(),
        ..Default::default()
    };
    client.security_zones.lock().unwrap().insert(id.clone(), zone);

    Ok(CreateResponse {
        object_uuid: id,
        request_uuid: None,
    })
}

pub fn update_security_zone(client: &MockGridscaleClient, id: &str, request: &SecurityZoneUpdateRequest) -> Result<(), GridscaleError> {
    client.record(MockCall::UpdateSecurityZone { zone: id.to_string() });
    client.check(MockOp::UpdateSecurityZone)?;

    let mut zones = client.security_zones.lock().unwrap();
    let zone = zones
        .get_mut(id)
        .ok_or_else(|| GridscaleError::NotFound(format!("Security zone {} not found", id)))?;
    zone.name = request.name.clone();
    zone.labels = request.labels.clone();
    Ok(())
}

pub fn delete_security_zone(client: &MockGridscaleClient, id: &str) -> Result<(), GridscaleError> {
    client.record(MockCall::DeleteSecurityZone { zone: id.to_string() });
    client.check(MockOp::DeleteSecurityZone)?;

    client
        .security_zones
        .lock()
        .unwrap()
        .remove(id)
        .map(|_| ())
        .ok_or_else(|| GridscaleError::NotFound(format!("Security zone {} not found", id)))
}

fn snapshot_key(storage_id: &str, snapshot_id: &str) -> (String, String) {
    (storage_id.to_string(), snapshot_id.to_string())
}

fn snapshot_not_found(storage_id: &str, snapshot_id: &str) -> GridscaleError {
    GridscaleError::NotFound(format!("Snapshot {} of storage {} not found", snapshot_id, storage_id))
}

pub fn get_snapshot(client: &MockGridscaleClient, storage_id: &str, snapshot_id: &str) -> Result<StorageSnapshot, GridscaleError> {
    client.check(MockOp::GetSnapshot)?;
    client
        .snapshots
        .lock()
        .unwrap()
        .get(&snapshot_key(storage_id, snapshot_id))
        .cloned()
        .ok_or_else(|| snapshot_not_found(storage_id, snapshot_id))
}

pub fn create_snapshot(client: &MockGridscaleClient, storage_id: &str, request: &SnapshotRequest) -> Result<CreateResponse, GridscaleError> {
    client.record(MockCall::CreateSnapshot {
        storage: storage_id.to_string(),
        name: request.name.clone(),
    });
    client.check(MockOp::CreateSnapshot)?;

    let storage = lookup(&client.storages, storage_id, "Storage")?;
    let id = client.next_uuid();
    let snapshot = StorageSnapshot {
        object_uuid: id.clone(),
        name: request.name.clone(),
        status: ACTIVE_STATUS.to_string(),
        capacity: storage.capacity,
        location_uuid: storage.location_uuid,
        labels: request.labels.clone(),
        ..Default::default()
    };
    client
        .snapshots
        .lock()
        .unwrap()
        .insert(snapshot_key(storage_id, &id), snapshot);

    Ok(CreateResponse {
        object_uuid: id,
        request_uuid: None,
    })
}

pub fn update_snapshot(client: &MockGridscaleClient, storage_id: &str, snapshot_id: &str, request: &SnapshotRequest) -> Result<(), GridscaleError> {
    client.record(MockCall::UpdateSnapshot {
        storage: storage_id.to_string(),
        snapshot: snapshot_id.to_string(),
    });
    client.check(MockOp::UpdateSnapshot)?;

    let mut snapshots = client.snapshots.lock().unwrap();
    let snapshot = snapshots
        .get_mut(&snapshot_key(storage_id, snapshot_id))
        .ok_or_else(|| snapshot_not_found(storage_id, snapshot_id))?;
    snapshot.name = request.name.clone();
    snapshot.labels = request.labels.clone();
    Ok(())
}

pub fn delete_snapshot(client: &MockGridscaleClient, storage_id: &str, snapshot_id: &str) -> Result<(), GridscaleError> {
    client.record(MockCall::DeleteSnapshot {
        storage: storage_id.to_string(),
        snapshot: snapshot_id.to_string(),
    });
    client.check(MockOp::DeleteSnapshot)?;

    client
        .snapshots
        .lock()
        .unwrap()
        .remove(&snapshot_key(storage_id, snapshot_id))
        .map(|_| ())
        .ok_or_else(|| snapshot_not_found(storage_id, snapshot_id))
}
