//! Linking the dependencies of a freshly created server

use super::ServerReconciler;
use crate::error::{ProviderError, RemoteContext};
use crate::model::{boot_first, AttachmentSet, NetworkAttachment, StorageAttachment};
use gridscale_client::LinkNetworkRequest;
use tracing::info;

/// Relation settings sent when linking or re-configuring a network
pub(crate) fn network_request(network: &NetworkAttachment) -> LinkNetworkRequest {
    LinkNetworkRequest {
        bootdevice: network.bootdevice,
        ordering: None,
        firewall_template_uuid: None,
        firewall: Some(network.firewall.to_api()),
    }
}

impl ServerReconciler<'_> {
    /// Attach every storage, boot device first
    pub async fn link_storages(&self, storages: &[StorageAttachment]) -> Result<(), ProviderError> {
        let mut ordered = storages.to_vec();
        boot_first(&mut ordered);
        for storage in &ordered {
            self.link_storage(storage).await?;
        }
        Ok(())
    }

    pub(crate) async fn link_storage(&self, storage: &StorageAttachment) -> Result<(), ProviderError> {
        info!("Linking storage {} to server {}", storage.object_uuid, self.server_uuid);
        self.client
            .link_storage(self.server_uuid, &storage.object_uuid, storage.bootdevice)
            .await
            .context(|| {
                format!(
                    "Error waiting for storage ({}) to be attached to server ({})",
                    storage.object_uuid, self.server_uuid
                )
            })
    }

    /// Fail unless `ip` belongs to the given address family
    pub(crate) async fn validate_ip_family(&self, ip: &str, family: u8) -> Result<(), ProviderError> {
        let actual = self
            .client
            .get_ip_version(ip)
            .await
            .context(|| format!("Error reading IP address ({})", ip))?;
        if actual != family {
            return Err(ProviderError::Validation(format!(
                "IP address {} is an IPv{} address, expected IPv{}",
                ip, actual, family
            )));
        }
        Ok(())
    }

    /// Check both address slots before anything is changed
    pub(crate) async fn validate_ip_families(&self, ipv4: Option<&str>, ipv6: Option<&str>) -> Result<(), ProviderError> {
        if let Some(ip) = ipv4 {
            self.validate_ip_family(ip, 4).await?;
        }
        if let Some(ip) = ipv6 {
            self.validate_ip_family(ip, 6).await?;
        }
        Ok(())
    }

    /// Fail if the public network is listed among the other networks; its
    /// membership follows the IP addresses
    pub(crate) async fn validate_not_public(&self, networks: &[NetworkAttachment]) -> Result<(), ProviderError> {
        if networks.is_empty() {
            return Ok(());
        }
        let public = self
            .client
            .get_network_public()
            .await
            .context(|| "Error resolving the public network".to_string())?;
        if networks.iter().any(|n| n.object_uuid == public.object_uuid) {
            return Err(ProviderError::Validation(format!(
                "network {} is the public network; it is attached through ipv4/ipv6, not the network list",
                public.object_uuid
            )));
        }
        Ok(())
    }

    pub(crate) async fn link_ip(&self, ip: &str, family: u8) -> Result<(), ProviderError> {
        self.validate_ip_family(ip, family).await?;
        info!("Linking IPv{} address {} to server {}", family, ip, self.server_uuid);
        self.client.link_ip(self.server_uuid, ip).await.context(|| {
            format!(
                "Error waiting for IPv{} ({}) to be attached to server ({})",
                family, ip, self.server_uuid
            )
        })
    }

    /// Attach the IPv4 address, if any
    pub async fn link_ipv4(&self, ip: Option<&str>) -> Result<(), ProviderError> {
        match ip {
            Some(ip) => self.link_ip(ip, 4).await,
            None => Ok(()),
        }
    }

    /// Attach the IPv6 address, if any
    pub async fn link_ipv6(&self, ip: Option<&str>) -> Result<(), ProviderError> {
        match ip {
            Some(ip) => self.link_ip(ip, 6).await,
            None => Ok(()),
        }
    }

    /// Attach the ISO image, if any
    pub async fn link_iso_image(&self, iso_image: Option<&str>) -> Result<(), ProviderError> {
        let Some(iso_image) = iso_image else {
            return Ok(());
        };
        info!("Linking ISO image {} to server {}", iso_image, self.server_uuid);
        self.client
            .link_iso_image(self.server_uuid, iso_image)
            .await
            .context(|| {
                format!(
                    "Error waiting for ISO image ({}) to be attached to server ({})",
                    iso_image, self.server_uuid
                )
            })
    }

    pub(crate) async fn link_public_network(&self) -> Result<(), ProviderError> {
        let public = self
            .client
            .get_network_public()
            .await
            .context(|| "Error resolving the public network".to_string())?;
        info!("Linking public network {} to server {}", public.object_uuid, self.server_uuid);
        let request = LinkNetworkRequest {
            firewall: Some(Default::default()),
            ..Default::default()
        };
        self.client
            .link_network(self.server_uuid, &public.object_uuid, &request)
            .await
            .context(|| {
                format!(
                    "Error waiting for public network ({}) to be attached to server ({})",
                    public.object_uuid, self.server_uuid
                )
            })
    }

    pub(crate) async fn link_network(&self, network: &NetworkAttachment) -> Result<(), ProviderError> {
        info!("Linking network {} to server {}", network.object_uuid, self.server_uuid);
        self.client
            .link_network(self.server_uuid, &network.object_uuid, &network_request(network))
            .await
            .context(|| {
                format!(
                    "Error waiting for network ({}) to be attached to server ({})",
                    network.object_uuid, self.server_uuid
                )
            })
    }

    /// With `is_public`, attach the public network without firewall rules;
    /// otherwise attach every given network with its rules, boot network first.
    pub async fn link_networks(&self, networks: &[NetworkAttachment], is_public: bool) -> Result<(), ProviderError> {
        if is_public {
            return self.link_public_network().await;
        }
        let mut ordered = networks.to_vec();
        boot_first(&mut ordered);
        for network in &ordered {
            self.link_network(network).await?;
        }
        Ok(())
    }

    /// Attach everything a newly created server depends on
    pub async fn reconcile_create(&self, attachments: &AttachmentSet) -> Result<(), ProviderError> {
        self.validate_ip_families(attachments.ipv4.as_deref(), attachments.ipv6.as_deref())
            .await?;
        self.validate_not_public(&attachments.networks).await?;

        self.link_storages(&attachments.storages).await?;
        self.link_ipv4(attachments.ipv4.as_deref()).await?;
        self.link_ipv6(attachments.ipv6.as_deref()).await?;
        self.link_iso_image(attachments.iso_image.as_deref()).await?;
        if attachments.public_network {
            self.link_networks(&[], true).await?;
        }
        self.link_networks(&attachments.networks, false).await
    }
}
