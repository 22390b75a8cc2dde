//! Moving an existing server to its desired configuration
//!
//! One pass runs strictly in this order and stops at the first unrecoverable
//! error, leaving the server as it is; the next pass re-reads the remote state
//! and picks up from there:
//!
//! 1. shut the server down if the change cannot be hot-plugged
//! 2. update name/cores/memory/zone/labels
//! 3. ISO image, IPv4, IPv6
//! 4. public network membership (follows IP presence)
//! 5. other networks, storages
//! 6. bring the server to its desired power state

use super::link::network_request;
use super::{tolerate_not_found, ServerReconciler};
use crate::error::{ProviderError, RemoteContext};
use crate::model::{ChangeSet, NetworkAttachment, ServerConfig, SetDiff, StorageAttachment};
use gridscale_client::ServerUpdateRequest;
use tracing::{debug, info};

/// Whether applying `new` over `old` needs the server powered off
pub fn is_shutdown_required(old: &ServerConfig, new: &ServerConfig) -> bool {
    ChangeSet::between(old, new).requires_shutdown()
}

impl ServerReconciler<'_> {
    /// Swap the ISO image if it changed
    pub async fn update_iso_image_rel(&self, old: Option<&str>, new: Option<&str>) -> Result<(), ProviderError> {
        if old == new {
            return Ok(());
        }
        if let Some(old) = old {
            info!("Unlinking ISO image {} from server {}", old, self.server_uuid);
            let result = self.client.unlink_iso_image(self.server_uuid, old).await;
            tolerate_not_found(result, "ISO image relation").context(|| {
                format!("Error unlinking ISO image ({}) from server ({})", old, self.server_uuid)
            })?;
        }
        self.link_iso_image(new).await
    }

    async fn update_ip_rel(&self, old: Option<&str>, new: Option<&str>, family: u8) -> Result<bool, ProviderError> {
        if old == new {
            return Ok(new.is_some());
        }
        if let Some(new) = new {
            self.validate_ip_family(new, family).await?;
        }
        if let Some(old) = old {
            info!("Unlinking IPv{} address {} from server {}", family, old, self.server_uuid);
            let result = self.client.unlink_ip(self.server_uuid, old).await;
            tolerate_not_found(result, "IP relation").context(|| {
                format!("Error unlinking IPv{} ({}) from server ({})", family, old, self.server_uuid)
            })?;
        }
        if let Some(new) = new {
            info!("Linking IPv{} address {} to server {}", family, new, self.server_uuid);
            self.client.link_ip(self.server_uuid, new).await.context(|| {
                format!(
                    "Error waiting for IPv{} ({}) to be attached to server ({})",
                    family, new, self.server_uuid
                )
            })?;
        }
        Ok(new.is_some())
    }

    /// Swap the IPv4 address if it changed; returns whether one is attached afterwards
    pub async fn update_ipv4_rel(&self, old: Option<&str>, new: Option<&str>) -> Result<bool, ProviderError> {
        self.update_ip_rel(old, new, 4).await
    }

    /// Swap the IPv6 address if it changed; returns whether one is attached afterwards
    pub async fn update_ipv6_rel(&self, old: Option<&str>, new: Option<&str>) -> Result<bool, ProviderError> {
        self.update_ip_rel(old, new, 6).await
    }

    /// Attach or detach the public network
    pub async fn update_public_network_rel(&self, attach: bool) -> Result<(), ProviderError> {
        if attach {
            return self.link_public_network().await;
        }
        let public = self
            .client
            .get_network_public()
            .await
            .context(|| "Error resolving the public network".to_string())?;
        info!("Unlinking public network {} from server {}", public.object_uuid, self.server_uuid);
        let result = self.client.unlink_network(self.server_uuid, &public.object_uuid).await;
        tolerate_not_found(result, "public network relation").context(|| {
            format!(
                "Error unlinking public network ({}) from server ({})",
                public.object_uuid, self.server_uuid
            )
        })
    }

    /// Unlink networks no longer wanted, link new ones, re-configure kept ones that changed
    pub async fn update_other_network_rel(&self, old: &[NetworkAttachment], new: &[NetworkAttachment]) -> Result<(), ProviderError> {
        let diff = SetDiff::between(old, new);
        for network in &diff.to_unlink {
            info!("Unlinking network {} from server {}", network.object_uuid, self.server_uuid);
            let result = self.client.unlink_network(self.server_uuid, &network.object_uuid).await;
            tolerate_not_found(result, "network relation").context(|| {
                format!(
                    "Error unlinking network ({}) from server ({})",
                    network.object_uuid, self.server_uuid
                )
            })?;
        }
        // Clear a moving boot flag before a new network claims it
        let (clearing, rest): (Vec<_>, Vec<_>) = diff.to_update.iter().partition(|n| !n.bootdevice);
        for network in clearing {
            self.update_network_link(network).await?;
        }
        for network in &diff.to_link {
            self.link_network(network).await?;
        }
        for network in rest {
            self.update_network_link(network).await?;
        }
        Ok(())
    }

    async fn update_network_link(&self, network: &NetworkAttachment) -> Result<(), ProviderError> {
        info!("Updating network {} relation of server {}", network.object_uuid, self.server_uuid);
        self.client
            .update_network_link(self.server_uuid, &network.object_uuid, &network_request(network))
            .await
            .context(|| {
                format!(
                    "Error updating network ({}) relation of server ({})",
                    network.object_uuid, self.server_uuid
                )
            })
    }

    /// Unlink storages no longer wanted, link new ones, fix boot flags of kept ones
    pub async fn update_storage_rel(&self, old: &[StorageAttachment], new: &[StorageAttachment]) -> Result<(), ProviderError> {
        let diff = SetDiff::between(old, new);
        for storage in &diff.to_unlink {
            info!("Unlinking storage {} from server {}", storage.object_uuid, self.server_uuid);
            let result = self.client.unlink_storage(self.server_uuid, &storage.object_uuid).await;
            tolerate_not_found(result, "storage relation").context(|| {
                format!(
                    "Error unlinking storage ({}) from server ({})",
                    storage.object_uuid, self.server_uuid
                )
            })?;
        }
        // Only one storage boots; the old boot device gives up its flag first
        let (clearing, rest): (Vec<_>, Vec<_>) = diff.to_update.iter().partition(|s| !s.bootdevice);
        for storage in clearing {
            self.update_storage_link(storage).await?;
        }
        for storage in &diff.to_link {
            self.link_storage(storage).await?;
        }
        for storage in rest {
            self.update_storage_link(storage).await?;
        }
        Ok(())
    }

    async fn update_storage_link(&self, storage: &StorageAttachment) -> Result<(), ProviderError> {
        info!("Updating storage {} relation of server {}", storage.object_uuid, self.server_uuid);
        self.client
            .update_storage_link(self.server_uuid, &storage.object_uuid, storage.bootdevice)
            .await
            .context(|| {
                format!(
                    "Error updating storage ({}) relation of server ({})",
                    storage.object_uuid, self.server_uuid
                )
            })
    }

    /// Move the server from `old` (its live remote state) to `new`
    pub async fn reconcile_update(&self, old: &ServerConfig, new: &ServerConfig) -> Result<(), ProviderError> {
        let changes = ChangeSet::between(old, new);
        let (old_att, new_att) = (&old.attachments, &new.attachments);

        // Reject wrong address families before touching anything
        self.validate_ip_families(
            new_att.ipv4.as_deref().filter(|_| changes.ipv4_changed),
            new_att.ipv6.as_deref().filter(|_| changes.ipv6_changed),
        )
        .await?;
        self.validate_not_public(&new_att.networks).await?;

        let power = self.power();
        let running = old.spec.power;
        let shutdown = running && changes.requires_shutdown();
        if shutdown {
            power.shutdown(self.server_uuid).await?;
        }

        if changes.fields_changed {
            info!("Updating server {}", self.server_uuid);
            let request = ServerUpdateRequest {
                name: new.spec.name.clone(),
                cores: new.spec.cores,
                memory: new.spec.memory,
                availability_zone: new.spec.availability_zone.clone(),
                labels: new.spec.labels.clone(),
            };
            self.client
                .update_server(self.server_uuid, &request)
                .await
                .context(|| format!("Error updating server ({})", self.server_uuid))?;
        } else {
            debug!("Server {} fields are unchanged", self.server_uuid);
        }

        self.update_iso_image_rel(old_att.iso_image.as_deref(), new_att.iso_image.as_deref())
            .await?;
        let has_ipv4 = self
            .update_ipv4_rel(old_att.ipv4.as_deref(), new_att.ipv4.as_deref())
            .await?;
        let has_ipv6 = self
            .update_ipv6_rel(old_att.ipv6.as_deref(), new_att.ipv6.as_deref())
            .await?;
        let needs_public = has_ipv4 || has_ipv6;
        if needs_public != old_att.public_network {
            self.update_public_network_rel(needs_public).await?;
        }
        self.update_other_network_rel(&old_att.networks, &new_att.networks)
            .await?;
        self.update_storage_rel(&old_att.storages, &new_att.storages)
            .await?;

        let powered = running && !shutdown;
        match (new.spec.power, powered) {
            (true, false) => power.start(self.server_uuid).await,
            (false, true) => power.shutdown(self.server_uuid).await,
            _ => Ok(()),
        }
    }
}
