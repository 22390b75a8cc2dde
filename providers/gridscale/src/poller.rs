//! Status poller
//!
//! Blocks an operation until a remote object reports `active`, or until it is
//! gone, bounded by the operation timeout.

use crate::error::ProviderError;
use gridscale_client::{GridscaleClientTrait, GridscaleError, ACTIVE_STATUS};
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Object kinds the poller can observe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Loadbalancer,
    Ip,
    Network,
    Server,
    SshKey,
    Storage,
    IsoImage,
    PaasService,
    SecurityZone,
    /// Addressed by (storage id, snapshot id)
    Snapshot,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loadbalancer => "loadbalancer",
            Self::Ip => "IP address",
            Self::Network => "network",
            Self::Server => "server",
            Self::SshKey => "SSH key",
            Self::Storage => "storage",
            Self::IsoImage => "ISO image",
            Self::PaasService => "PaaS service",
            Self::SecurityZone => "security zone",
            Self::Snapshot => "snapshot",
        }
    }

    /// Number of identifiers needed to address one object
    pub fn id_count(&self) -> usize {
        match self {
            Self::Snapshot => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polls object status through the client
pub struct StatusPoller<'a> {
    client: &'a dyn GridscaleClientTrait,
    delay: Duration,
}

impl<'a> StatusPoller<'a> {
    pub fn new(client: &'a dyn GridscaleClientTrait, delay: Duration) -> Self {
        Self { client, delay }
    }

    fn check_ids(kind: ResourceKind, ids: &[&str]) -> Result<(), ProviderError> {
        if ids.len() != kind.id_count() {
            return Err(ProviderError::InvalidIds {
                kind: kind.to_string(),
                expected: kind.id_count(),
                got: ids.len(),
            });
        }
        Ok(())
    }

    async fn fetch_status(&self, kind: ResourceKind, ids: &[&str]) -> Result<String, GridscaleError> {
        let id = ids[0];
        Ok(match kind {
            ResourceKind::Loadbalancer => self.client.get_loadbalancer(id).await?.status,
            ResourceKind::Ip => self.client.get_ip(id).await?.status,
            ResourceKind::Network => self.client.get_network(id).await?.status,
            ResourceKind::Server => self.client.get_server(id).await?.status,
            ResourceKind::SshKey => self.client.get_sshkey(id).await?.status,
            ResourceKind::Storage => self.client.get_storage(id).await?.status,
            ResourceKind::IsoImage => self.client.get_iso_image(id).await?.status,
            ResourceKind::PaasService => self.client.get_paas_service(id).await?.status,
            ResourceKind::SecurityZone => self.client.get_security_zone(id).await?.status,
            ResourceKind::Snapshot => self.client.get_storage_snapshot(id, ids[1]).await?.status,
        })
    }

    /// Wait until the object reports `active`
    pub async fn wait_until_active(&self, kind: ResourceKind, ids: &[&str], limit: Duration) -> Result<(), ProviderError> {
        Self::check_ids(kind, ids)?;
        debug!("Waiting for {} {} to become active", kind, ids.join(", "));

        let poll = async {
            loop {
                match self.fetch_status(kind, ids).await {
                    Ok(status) if status == ACTIVE_STATUS => return Ok(()),
                    Ok(status) => debug!("{} {} is {}", kind, ids.join(", "), status),
                    Err(e) if e.is_transient() => warn!("Transient error polling {} {}: {}", kind, ids.join(", "), e),
                    Err(e) => {
                        return Err(ProviderError::remote(
                            format!("Error waiting for {} ({}) to become active", kind, ids.join(", ")),
                            e,
                        ));
                    }
                }
                sleep(self.delay).await;
            }
        };

        timeout(limit, poll).await.unwrap_or_else(|_| {
            Err(ProviderError::Timeout {
                kind: kind.to_string(),
                ids: ids.join(", "),
                goal: "become active".to_string(),
            })
        })
    }

    /// Wait until fetching the object returns not-found
    pub async fn wait_until_deleted(&self, kind: ResourceKind, ids: &[&str], limit: Duration) -> Result<(), ProviderError> {
        Self::check_ids(kind, ids)?;
        debug!("Waiting for {} {} to be deleted", kind, ids.join(", "));

        let poll = async {
            loop {
                match self.fetch_status(kind, ids).await {
                    Err(e) if e.is_not_found() => return Ok(()),
                    Err(e) if e.is_transient() => warn!("Transient error polling {} {}: {}", kind, ids.join(", "), e),
                    Err(e) => {
                        return Err(ProviderError::remote(
                            format!("Error waiting for {} ({}) to be deleted", kind, ids.join(", ")),
                            e,
                        ));
                    }
                    Ok(status) => debug!("{} {} still exists ({})", kind, ids.join(", "), status),
                }
                sleep(self.delay).await;
            }
        };

        timeout(limit, poll).await.unwrap_or_else(|_| {
            Err(ProviderError::DeleteTimeout {
                kind: kind.to_string(),
                ids: ids.join(", "),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::uuid;
    use gridscale_client::mock::helpers::{security_zone, server, snapshot};
    use gridscale_client::{MockGridscaleClient, MockOp, PROVISIONING_STATUS};

    const DELAY: Duration = Duration::from_millis(5);
    const LIMIT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_active_resource_returns_immediately() {
        let mock = MockGridscaleClient::new("http://mock");
        mock.add_server(server(&uuid(1), "web"));

        let poller = StatusPoller::new(&mock, DELAY);
        poller.wait_until_active(ResourceKind::Server, &[&uuid(1)], LIMIT).await.unwrap();
    }

    #[tokio::test]
    async fn test_stuck_in_provisioning_times_out_naming_kind_and_id() {
        let mock = MockGridscaleClient::new("http://mock");
        mock.add_server(server(&uuid(1), "web"));
        mock.set_server_status(&uuid(1), PROVISIONING_STATUS);

        let poller = StatusPoller::new(&mock, DELAY);
        let err = poller
            .wait_until_active(ResourceKind::Server, &[&uuid(1)], LIMIT)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Timeout { .. }));
        let message = err.to_string();
        assert!(message.contains("server"));
        assert!(message.contains(&uuid(1)));
    }

    #[tokio::test]
    async fn test_transient_errors_keep_polling() {
        let mock = MockGridscaleClient::new("http://mock");
        mock.add_security_zone(security_zone(&uuid(5), "zone"));
        mock.fail_next(MockOp::GetSecurityZone, 503);
        mock.fail_next(MockOp::GetSecurityZone, 502);

        let poller = StatusPoller::new(&mock, DELAY);
        poller
            .wait_until_active(ResourceKind::SecurityZone, &[&uuid(5)], LIMIT)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fatal_error_aborts() {
        let mock = MockGridscaleClient::new("http://mock");
        let poller = StatusPoller::new(&mock, DELAY);

        let err = poller
            .wait_until_active(ResourceKind::Server, &[&uuid(1)], LIMIT)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(404));
    }

    #[tokio::test]
    async fn test_wrong_id_count_fails_before_polling() {
        let mock = MockGridscaleClient::new("http://mock");
        let poller = StatusPoller::new(&mock, DELAY);

        let err = poller
            .wait_until_active(ResourceKind::Snapshot, &[&uuid(1)], LIMIT)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidIds { expected: 2, got: 1, .. }));

        let err = poller
            .wait_until_deleted(ResourceKind::Server, &[&uuid(1), &uuid(2)], LIMIT)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidIds { expected: 1, got: 2, .. }));
    }

    #[tokio::test]
    async fn test_snapshot_uses_both_ids() {
        let mock = MockGridscaleClient::new("http://mock");
        mock.add_snapshot(&uuid(2), snapshot(&uuid(40), "before-upgrade"));

        let poller = StatusPoller::new(&mock, DELAY);
        poller
            .wait_until_active(ResourceKind::Snapshot, &[&uuid(2), &uuid(40)], LIMIT)
            .await
            .unwrap();
        // Same snapshot id under another storage does not exist
        poller
            .wait_until_deleted(ResourceKind::Snapshot, &[&uuid(3), &uuid(40)], LIMIT)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_until_deleted() {
        let mock = MockGridscaleClient::new("http://mock");
        mock.add_server(server(&uuid(1), "web"));
        let poller = StatusPoller::new(&mock, DELAY);

        let err = poller
            .wait_until_deleted(ResourceKind::Server, &[&uuid(1)], LIMIT)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::DeleteTimeout { .. }));

        mock.delete_server(&uuid(1)).await.unwrap();
        poller.wait_until_deleted(ResourceKind::Server, &[&uuid(1)], LIMIT).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_wait_aborts_on_other_errors() {
        let mock = MockGridscaleClient::new("http://mock");
        mock.add_server(server(&uuid(1), "web"));
        mock.fail_next(MockOp::GetServer, 500);

        let poller = StatusPoller::new(&mock, DELAY);
        let err = poller
            .wait_until_deleted(ResourceKind::Server, &[&uuid(1)], LIMIT)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }
}
