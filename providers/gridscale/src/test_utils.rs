//! Test utilities for unit testing reconcilers and resources
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::adapter::current_config;
use crate::config::Timeouts;
use crate::model::{AttachmentSet, NetworkAttachment, ServerConfig, ServerSpec, StorageAttachment};
use crate::reconciler::ServerReconciler;
use gridscale_client::mock::helpers::{ip, iso_image, network, server, storage};
use gridscale_client::MockGridscaleClient;
use std::time::Duration;

/// UUID of fixture `n`
///
/// Fixtures seeded by [`seeded_mock`]:
/// - 1: server "web" (2 cores, 4 GB, running)
/// - 2, 3, 4: storages
/// - 10: public network; 11, 12, 13: private networks
/// - 20, 21: IPv4 addresses; 22, 23: IPv6 addresses
/// - 30, 31: ISO images
pub fn uuid(n: u64) -> String {
    gridscale_client::mock::test_uuid(n)
}

pub const SERVER: u64 = 1;

/// Short timeouts so failing waits end quickly
pub fn test_timeouts() -> Timeouts {
    Timeouts {
        operation: Duration::from_millis(200),
        poll_delay: Duration::from_millis(5),
    }
}

/// Mock with the fixtures listed on [`uuid`]
pub fn seeded_mock() -> MockGridscaleClient {
    let mock = MockGridscaleClient::new("http://mock");

    let mut web = server(&uuid(SERVER), "web");
    web.cores = 2;
    web.memory = 4;
    web.power = true;
    mock.add_server(web);

    for n in [2, 3, 4] {
        mock.add_storage(storage(&uuid(n), &format!("disk-{}", n)));
    }
    mock.add_network(network(&uuid(10), "Public Network", true));
    for n in [11, 12, 13] {
        mock.add_network(network(&uuid(n), &format!("private-{}", n), false));
    }
    for n in [20, 21] {
        mock.add_ip(ip(&uuid(n), 4));
    }
    for n in [22, 23] {
        mock.add_ip(ip(&uuid(n), 6));
    }
    for n in [30, 31] {
        mock.add_iso_image(iso_image(&uuid(n), &format!("iso-{}", n)));
    }
    mock
}

/// Desired configuration matching the seeded server with nothing attached
pub fn server_config() -> ServerConfig {
    ServerConfig {
        spec: ServerSpec {
            name: "web".to_string(),
            cores: 2,
            memory: 4,
            location_uuid: uuid(1),
            power: true,
            ..Default::default()
        },
        attachments: AttachmentSet::default(),
    }
}

pub fn storage_attachment(n: u64, bootdevice: bool) -> StorageAttachment {
    StorageAttachment {
        object_uuid: uuid(n),
        bootdevice,
    }
}

pub fn network_attachment(n: u64, bootdevice: bool) -> NetworkAttachment {
    NetworkAttachment {
        object_uuid: uuid(n),
        bootdevice,
        firewall: Default::default(),
    }
}

/// Live configuration of the seeded server
pub fn live_config(mock: &MockGridscaleClient) -> ServerConfig {
    let server = mock.server(&uuid(SERVER)).unwrap();
    current_config(&server)
}

/// Reconciler for the seeded server
pub fn reconciler<'a>(mock: &'a MockGridscaleClient, server_uuid: &'a str) -> ServerReconciler<'a> {
    ServerReconciler::new(mock, server_uuid, test_timeouts())
}

/// Desired config with IP presence reflected in the public network flag
pub fn with_ips(mut config: ServerConfig, ipv4: Option<u64>, ipv6: Option<u64>) -> ServerConfig {
    config.attachments.ipv4 = ipv4.map(uuid);
    config.attachments.ipv6 = ipv6.map(uuid);
    config.attachments.public_network = ipv4.is_some() || ipv6.is_some();
    config
}
