//! Resource and data source handlers
//!
//! Each handler turns host attribute JSON into client calls:
//! - `server`: `gridscale_server`, built on the dependency reconciler
//! - `ip`: `gridscale_ipv4` and `gridscale_ipv6`
//! - `snapshot`: `gridscale_snapshot`
//! - `security_zone`: `gridscale_paas_securityzone`
//! - `network`: the `gridscale_network` data source
//! - `object_storage`: the `gridscale_object_storage` data source

pub mod ip;
pub mod network;
pub mod object_storage;
pub mod security_zone;
pub mod server;
pub mod snapshot;

use crate::config::Timeouts;
use crate::error::ProviderError;
use crate::poller::StatusPoller;
use crate::power::PowerControl;
use gridscale_client::{GridscaleClientTrait, GridscaleError};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resource types served by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Server,
    Ipv4,
    Ipv6,
    Snapshot,
    SecurityZone,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "gridscale_server",
            Self::Ipv4 => "gridscale_ipv4",
            Self::Ipv6 => "gridscale_ipv6",
            Self::Snapshot => "gridscale_snapshot",
            Self::SecurityZone => "gridscale_paas_securityzone",
        }
    }
}

impl FromStr for ResourceType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gridscale_server" => Ok(Self::Server),
            "gridscale_ipv4" => Ok(Self::Ipv4),
            "gridscale_ipv6" => Ok(Self::Ipv6),
            "gridscale_snapshot" => Ok(Self::Snapshot),
            "gridscale_paas_securityzone" => Ok(Self::SecurityZone),
            other => Err(ProviderError::UnknownResourceType(other.to_string())),
        }
    }
}

/// Data source types served by the provider
pub const NETWORK_DATA_SOURCE: &str = "gridscale_network";
pub const OBJECT_STORAGE_DATA_SOURCE: &str = "gridscale_object_storage";

/// Entry point for every resource operation
#[derive(Clone)]
pub struct Provider {
    client: Arc<dyn GridscaleClientTrait>,
    timeouts: Timeouts,
}

impl Provider {
    pub fn new(client: Arc<dyn GridscaleClientTrait>, timeouts: Timeouts) -> Self {
        Self { client, timeouts }
    }

    pub fn client(&self) -> &dyn GridscaleClientTrait {
        self.client.as_ref()
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub(crate) fn poller(&self) -> StatusPoller<'_> {
        StatusPoller::new(self.client(), self.timeouts.poll_delay)
    }

    pub(crate) fn power(&self) -> PowerControl<'_> {
        PowerControl::new(self.client(), self.timeouts)
    }

    /// Create a resource from its planned attributes; returns the new state
    pub async fn create(&self, resource_type: &str, planned: &Value) -> Result<Value, ProviderError> {
        let kind: ResourceType = resource_type.parse()?;
        info!("Creating {}", kind.as_str());
        match kind {
            ResourceType::Server => server::create(self, planned).await,
            ResourceType::Ipv4 => ip::create(self, planned, 4).await,
            ResourceType::Ipv6 => ip::create(self, planned, 6).await,
            ResourceType::Snapshot => snapshot::create(self, planned).await,
            ResourceType::SecurityZone => security_zone::create(self, planned).await,
        }
    }

    /// Refresh a resource; `None` when it was removed outside of the provider
    pub async fn read(&self, resource_type: &str, state: &Value) -> Result<Option<Value>, ProviderError> {
        let kind: ResourceType = resource_type.parse()?;
        let result = match kind {
            ResourceType::Server => server::read(self, state).await,
            ResourceType::Ipv4 => ip::read(self, state, 4).await,
            ResourceType::Ipv6 => ip::read(self, state, 6).await,
            ResourceType::Snapshot => snapshot::read(self, state).await,
            ResourceType::SecurityZone => security_zone::read(self, state).await,
        };
        match result {
            Ok(state) => Ok(Some(state)),
            Err(ProviderError::RemovedExternally(what)) => {
                warn!("{} was removed outside of the provider, dropping it from state", what);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Move a resource from its prior state to the planned attributes
    pub async fn update(&self, resource_type: &str, prior: &Value, planned: &Value) -> Result<Value, ProviderError> {
        let kind: ResourceType = resource_type.parse()?;
        info!("Updating {}", kind.as_str());
        match kind {
            ResourceType::Server => server::update(self, prior, planned).await,
            ResourceType::Ipv4 => ip::update(self, prior, planned, 4).await,
            ResourceType::Ipv6 => ip::update(self, prior, planned, 6).await,
            ResourceType::Snapshot => snapshot::update(self, prior, planned).await,
            ResourceType::SecurityZone => security_zone::update(self, prior, planned).await,
        }
    }

    /// Delete a resource; an already deleted resource is not an error
    pub async fn delete(&self, resource_type: &str, state: &Value) -> Result<(), ProviderError> {
        let kind: ResourceType = resource_type.parse()?;
        info!("Deleting {}", kind.as_str());
        match kind {
            ResourceType::Server => server::delete(self, state).await,
            ResourceType::Ipv4 | ResourceType::Ipv6 => ip::delete(self, state).await,
            ResourceType::Snapshot => snapshot::delete(self, state).await,
            ResourceType::SecurityZone => security_zone::delete(self, state).await,
        }
    }

    /// Look up an existing object
    pub async fn read_data_source(&self, data_source_type: &str, config: &Value) -> Result<Value, ProviderError> {
        match data_source_type {
            NETWORK_DATA_SOURCE => network::read(self, config).await,
            OBJECT_STORAGE_DATA_SOURCE => object_storage::read(self, config).await,
            other => Err(ProviderError::UnknownResourceType(other.to_string())),
        }
    }
}

/// Map a not-found read of the resource itself to [`ProviderError::RemovedExternally`]
pub(crate) fn removed_if_not_found<T>(
    result: Result<T, GridscaleError>,
    what: impl FnOnce() -> String,
    context: impl FnOnce() -> String,
) -> Result<T, ProviderError> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_not_found() => Err(ProviderError::RemovedExternally(what())),
        Err(e) => Err(ProviderError::remote(context(), e)),
    }
}

/// Treat a not-found answer to a delete as success
pub(crate) fn deleted_if_not_found(result: Result<(), GridscaleError>, what: &str) -> Result<(), GridscaleError> {
    match result {
        Err(e) if e.is_not_found() => {
            debug!("{} was already deleted", what);
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seeded_mock, test_timeouts, uuid};
    use serde_json::json;

    #[test]
    fn test_resource_type_names() {
        for kind in [
            ResourceType::Server,
            ResourceType::Ipv4,
            ResourceType::Ipv6,
            ResourceType::Snapshot,
            ResourceType::SecurityZone,
        ] {
            assert_eq!(kind.as_str().parse::<ResourceType>().unwrap(), kind);
        }
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let provider = Provider::new(Arc::new(seeded_mock()), test_timeouts());

        let err = provider.create("gridscale_bucket", &json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResourceType(t) if t == "gridscale_bucket"));

        let err = provider
            .read_data_source("gridscale_storage", &json!({"id": uuid(2)}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResourceType(_)));
    }

    #[tokio::test]
    async fn test_read_of_removed_resource_returns_none() {
        let provider = Provider::new(Arc::new(seeded_mock()), test_timeouts());

        let state = provider
            .read("gridscale_server", &json!({"id": uuid(99)}))
            .await
            .unwrap();
        assert!(state.is_none());
    }

    #[test]
    fn test_removed_if_not_found() {
        let result: Result<(), GridscaleError> = Err(GridscaleError::from_status(404, "gone"));
        let err = removed_if_not_found(result, || "Server x".to_string(), || "Error reading server (x)".to_string())
            .unwrap_err();
        assert!(matches!(err, ProviderError::RemovedExternally(w) if w == "Server x"));

        let result: Result<(), GridscaleError> = Err(GridscaleError::from_status(500, "boom"));
        let err = removed_if_not_found(result, || "Server x".to_string(), || "Error reading server (x)".to_string())
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }
}
