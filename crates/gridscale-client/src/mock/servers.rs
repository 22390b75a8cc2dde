//! Server operations for MockGridscaleClient
//!
//! Handles servers, power state and the storage/network/IP/ISO image relations

use super::{MockCall, MockGridscaleClient, MockOp};
use crate::error::GridscaleError;
use crate::models::*;

fn not_found(id: &str) -> GridscaleError {
    GridscaleError::NotFound(format!("Server {} not found", id))
}

/// Apply `f` to the stored server, failing with 404 if it is absent
fn with_server<T>(
    client: &MockGridscaleClient,
    id: &str,
    f: impl FnOnce(&mut Server) -> Result<T, GridscaleError>,
) -> Result<T, GridscaleError> {
    let mut servers = client.servers.lock().unwrap();
    let server = servers.get_mut(id).ok_or_else(|| not_found(id))?;
    f(server)
}

/// A running legacy server cannot take storage/network hot-plug changes
fn ensure_hotplug_allowed(server: &Server, what: &str) -> Result<(), GridscaleError> {
    if server.legacy && server.power {
        return Err(GridscaleError::Conflict(format!(
            "Server {} is a legacy server and must be stopped to change {}",
            server.object_uuid, what
        )));
    }
    Ok(())
}

pub fn get_server(client: &MockGridscaleClient, id: &str) -> Result<Server, GridscaleError> {
    client.check(MockOp::GetServer)?;
    client.servers.lock().unwrap().get(id).cloned().ok_or_else(|| not_found(id))
}

pub fn create_server(client: &MockGridscaleClient, request: &ServerCreateRequest) -> Result<CreateResponse, GridscaleError> {
    client.record(MockCall::CreateServer { name: request.name.clone() });
    client.check(MockOp::CreateServer)?;

    let id = client.next_uuid();
    let hardware_profile = request.hardware_profile.clone().unwrap_or_else(|| "default".to_string());
    let server = Server {
        object_uuid: id.clone(),
        name: request.name.clone(),
        cores: request.cores,
        memory: request.memory,
        location_uuid: request.location_uuid.clone(),
        legacy: hardware_profile == "legacy",
        hardware_profile,
        availability_zone: request.availability_zone.clone(),
        status: ACTIVE_STATUS.to_string(),
        labels: request.labels.clone(),
        ..Default::default()
    };
    client.servers.lock().unwrap().insert(id.clone(), server);

    Ok(CreateResponse {
        object_uuid: id,
        request_uuid: None,
    })
}

pub fn update_server(client: &MockGridscaleClient, id: &str, request: &ServerUpdateRequest) -> Result<(), GridscaleError> {
    client.record(MockCall::UpdateServer {
        server: id.to_string(),
        request: request.clone(),
    });
    client.check(MockOp::UpdateServer)?;

    with_server(client, id, |server| {
        if server.cores != request.cores || server.memory != request.memory {
            ensure_hotplug_allowed(server, "cores or memory")?;
            if server.power && (request.cores < server.cores || request.memory < server.memory) {
                return Err(GridscaleError::Conflict(format!(
                    "Server {} must be stopped to decrease cores or memory",
                    id
                )));
            }
        }
        server.name = request.name.clone();
        server.cores = request.cores;
        server.memory = request.memory;
        if request.availability_zone.is_some() {
            server.availability_zone = request.availability_zone.clone();
        }
        server.labels = request.labels.clone();
        Ok(())
    })
}

pub fn delete_server(client: &MockGridscaleClient, id: &str) -> Result<(), GridscaleError> {
    client.record(MockCall::DeleteServer { server: id.to_string() });
    client.check(MockOp::DeleteServer)?;

    let removed = client.servers.lock().unwrap().remove(id);
    let server = removed.ok_or_else(|| not_found(id))?;
    // Linked IPs lose their back-reference
    let mut ips = client.ips.lock().unwrap();
    for relation in &server.relations.public_ips {
        if let Some(ip) = ips.get_mut(&relation.object_uuid) {
            ip.relations.servers.retain(|s| s.server_uuid != id);
        }
    }
    Ok(())
}

pub fn set_power(client: &MockGridscaleClient, id: &str, power: bool) -> Result<(), GridscaleError> {
    with_server(client, id, |server| {
        server.power = power;
        Ok(())
    })
}

pub fn link_storage(client: &MockGridscaleClient, server_id: &str, storage_id: &str, bootdevice: bool) -> Result<(), GridscaleError> {
    client.record(MockCall::LinkStorage {
        server: server_id.to_string(),
        storage: storage_id.to_string(),
        bootdevice,
    });
    client.check(MockOp::LinkStorage)?;

    let object_name = client
        .storages
        .lock()
        .unwrap()
        .get(storage_id)
        .map(|s| s.name.clone())
        .unwrap_or_default();
    with_server(client, server_id, |server| {
        ensure_hotplug_allowed(server, "storages")?;
        if server.relations.storages.iter().any(|s| s.object_uuid == storage_id) {
            return Err(GridscaleError::Conflict(format!(
                "Storage {} is already linked to server {}",
                storage_id, server_id
            )));
        }
        server.relations.storages.push(ServerStorageRelation {
            object_uuid: storage_id.to_string(),
            object_name,
            bootdevice,
        });
        Ok(())
    })
}

pub fn update_storage_link(client: &MockGridscaleClient, server_id: &str, storage_id: &str, bootdevice: bool) -> Result<(), GridscaleError> {
    client.record(MockCall::UpdateStorageLink {
        server: server_id.to_string(),
        storage: storage_id.to_string(),
        bootdevice,
    });
    client.check(MockOp::UpdateStorageLink)?;

    with_server(client, server_id, |server| {
        let relation = server
            .relations
            .storages
            .iter_mut()
            .find(|s| s.object_uuid == storage_id)
            .ok_or_else(|| GridscaleError::NotFound(format!("Storage {} is not linked", storage_id)))?;
        relation.bootdevice = bootdevice;
        Ok(())
    })
}

pub fn unlink_storage(client: &MockGridscaleClient, server_id: &str, storage_id: &str) -> Result<(), GridscaleError> {
    client.record(MockCall::UnlinkStorage {
        server: server_id.to_string(),
        storage: storage_id.to_string(),
    });
    client.check(MockOp::UnlinkStorage)?;

    with_server(client, server_id, |server| {
        ensure_hotplug_allowed(server, "storages")?;
        let before = server.relations.storages.len();
        server.relations.storages.retain(|s| s.object_uuid != storage_id);
        if server.relations.storages.len() == before {
            return Err(GridscaleError::NotFound(format!("Storage {} is not linked", storage_id)));
        }
        Ok(())
    })
}

pub fn link_network(client: &MockGridscaleClient, server_id: &str, network_id: &str, request: &LinkNetworkRequest) -> Result<(), GridscaleError> {
    client.record(MockCall::LinkNetwork {
        server: server_id.to_string(),
        network: network_id.to_string(),
        request: request.clone(),
    });
    client.check(MockOp::LinkNetwork)?;

    let (object_name, public_net) = client
        .networks
        .lock()
        .unwrap()
        .get(network_id)
        .map(|n| (n.name.clone(), n.public_net))
        .unwrap_or_default();
    with_server(client, server_id, |server| {
        ensure_hotplug_allowed(server, "networks")?;
        if server.relations.networks.iter().any(|n| n.object_uuid == network_id) {
            return Err(GridscaleError::Conflict(format!(
                "Network {} is already linked to server {}",
                network_id, server_id
            )));
        }
        let ordering = request.ordering.unwrap_or(server.relations.networks.len() as u32);
        server.relations.networks.push(ServerNetworkRelation {
            object_uuid: network_id.to_string(),
            object_name,
            bootdevice: request.bootdevice,
            public_net,
            ordering,
            mac: String::new(),
            firewall: request.firewall.clone(),
        });
        Ok(())
    })
}

pub fn update_network_link(client: &MockGridscaleClient, server_id: &str, network_id: &str, request: &LinkNetworkRequest) -> Result<(), GridscaleError> {
    client.record(MockCall::UpdateNetworkLink {
        server: server_id.to_string(),
        network: network_id.to_string(),
        request: request.clone(),
    });
    client.check(MockOp::UpdateNetworkLink)?;

    with_server(client, server_id, |server| {
        let relation = server
            .relations
            .networks
            .iter_mut()
            .find(|n| n.object_uuid == network_id)
            .ok_or_else(|| GridscaleError::NotFound(format!("Network {} is not linked", network_id)))?;
        relation.bootdevice = request.bootdevice;
        relation.firewall = request.firewall.clone();
        if let Some(ordering) = request.ordering {
            relation.ordering = ordering;
        }
        Ok(())
    })
}

pub fn unlink_network(client: &MockGridscaleClient, server_id: &str, network_id: &str) -> Result<(), GridscaleError> {
    client.record(MockCall::UnlinkNetwork {
        server: server_id.to_string(),
        network: network_id.to_string(),
    });
    client.check(MockOp::UnlinkNetwork)?;

    with_server(client, server_id, |server| {
        ensure_hotplug_allowed(server, "networks")?;
        let before = server.relations.networks.len();
        server.relations.networks.retain(|n| n.object_uuid != network_id);
        if server.relations.networks.len() == before {
            return Err(GridscaleError::NotFound(format!("Network {} is not linked", network_id)));
        }
        Ok(())
    })
}

pub fn link_ip(client: &MockGridscaleClient, server_id: &str, ip_id: &str) -> Result<(), GridscaleError> {
    client.record(MockCall::LinkIp {
        server: server_id.to_string(),
        ip: ip_id.to_string(),
    });
    client.check(MockOp::LinkIp)?;

    let mut ips = client.ips.lock().unwrap();
    let ip = ips
        .get_mut(ip_id)
        .ok_or_else(|| GridscaleError::NotFound(format!("IP {} not found", ip_id)))?;
    let server_name = with_server(client, server_id, |server| {
        if server.relations.public_ips.iter().any(|i| i.object_uuid == ip_id) {
            return Err(GridscaleError::Conflict(format!(
                "IP {} is already linked to server {}",
                ip_id, server_id
            )));
        }
        server.relations.public_ips.push(ServerIpRelation {
            object_uuid: ip_id.to_string(),
            family: ip.family,
            ip: ip.ip.clone(),
            prefix: ip.prefix.clone(),
        });
        Ok(server.name.clone())
    })?;
    ip.relations.servers.push(IpServerRelation {
        server_uuid: server_id.to_string(),
        server_name,
    });
    Ok(())
}

pub fn unlink_ip(client: &MockGridscaleClient, server_id: &str, ip_id: &str) -> Result<(), GridscaleError> {
    client.record(MockCall::UnlinkIp {
        server: server_id.to_string(),
        ip: ip_id.to_string(),
    });
    client.check(MockOp::UnlinkIp)?;

    with_server(client, server_id, |server| {
        let before = server.relations.public_ips.len();
        server.relations.public_ips.retain(|i| i.object_uuid != ip_id);
        if server.relations.public_ips.len() == before {
            return Err(GridscaleError::NotFound(format!("IP {} is not linked", ip_id)));
        }
        Ok(())
    })?;
    if let Some(ip) = client.ips.lock().unwrap().get_mut(ip_id) {
        ip.relations.servers.retain(|s| s.server_uuid != server_id);
    }
    Ok(())
}

pub fn link_iso_image(client: &MockGridscaleClient, server_id: &str, iso_image_id: &str) -> Result<(), GridscaleError> {
    client.record(MockCall::LinkIsoImage {
        server: server_id.to_string(),
        iso_image: iso_image_id.to_string(),
    });
    client.check(MockOp::LinkIsoImage)?;

    let object_name = client
        .iso_images
        .lock()
        .unwrap()
        .get(iso_image_id)
        .map(|i| i.name.clone())
        .unwrap_or_default();
    with_server(client, server_id, |server| {
        if server.relations.isoimages.iter().any(|i| i.object_uuid == iso_image_id) {
            return Err(GridscaleError::Conflict(format!(
                "ISO image {} is already linked to server {}",
                iso_image_id, server_id
            )));
        }
        server.relations.isoimages.push(ServerIsoImageRelation {
            object_uuid: iso_image_id.to_string(),
            object_name,
        });
        Ok(())
    })
}

pub fn unlink_iso_image(client: &MockGridscaleClient, server_id: &str, iso_image_id: &str) -> Result<(), GridscaleError> {
    client.record(MockCall::UnlinkIsoImage {
        server: server_id.to_string(),
        iso_image: iso_image_id.to_string(),
    });
    client.check(MockOp::UnlinkIsoImage)?;

    with_server(client, server_id, |server| {
        let before = server.relations.isoimages.len();
        server.relations.isoimages.retain(|i| i.object_uuid != iso_image_id);
        if server.relations.isoimages.len() == before {
            return Err(GridscaleError::NotFound(format!("ISO image {} is not linked", iso_image_id)));
        }
        Ok(())
    })
}
