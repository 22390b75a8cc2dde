//! Provider configuration
//!
//! Loaded from environment variables:
//! - `GRIDSCALE_URL` - API endpoint (default `https://api.gridscale.io`)
//! - `GRIDSCALE_UUID` - API user UUID (required)
//! - `GRIDSCALE_TOKEN` - API token (required)
//! - `GRIDSCALE_TIMEOUT_SECS` - per-operation timeout (default 180)
//! - `GRIDSCALE_POLL_DELAY_MS` - status polling interval (default 500)

use crate::error::ProviderError;
use gridscale_client::DEFAULT_API_URL;
use std::env;
use std::fmt;
use std::time::Duration;

/// Default timeout for create/update/delete operations
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Default delay between two status polls
pub const DEFAULT_POLL_DELAY: Duration = Duration::from_millis(500);

/// Time limits shared by every resource operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Upper bound for waiting on a status, a deletion or a power change
    pub operation: Duration,
    /// Delay between two status polls
    pub poll_delay: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            operation: DEFAULT_TIMEOUT,
            poll_delay: DEFAULT_POLL_DELAY,
        }
    }
}

/// Connection settings and timeouts
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_url: String,
    pub user_uuid: String,
    pub token: String,
    pub timeouts: Timeouts,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_url", &self.api_url)
            .field("user_uuid", &self.user_uuid)
            .field("token", &"<redacted>")
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl ProviderConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("GRIDSCALE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let user_uuid = required(&lookup, "GRIDSCALE_UUID")?;
        let token = required(&lookup, "GRIDSCALE_TOKEN")?;

        if uuid::Uuid::parse_str(&user_uuid).is_err() {
            return Err(ProviderError::InvalidConfig(format!(
                "GRIDSCALE_UUID is not a valid UUID: {}",
                user_uuid
            )));
        }

        let mut timeouts = Timeouts::default();
        if let Some(secs) = number(&lookup, "GRIDSCALE_TIMEOUT_SECS")? {
            timeouts.operation = Duration::from_secs(secs);
        }
        if let Some(millis) = number(&lookup, "GRIDSCALE_POLL_DELAY_MS")? {
            timeouts.poll_delay = Duration::from_millis(millis);
        }

        Ok(Self {
            api_url,
            user_uuid,
            token,
            timeouts,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ProviderError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::InvalidConfig(format!("{} environment variable is required", key)))
}

fn number<F>(lookup: &F, key: &str) -> Result<Option<u64>, ProviderError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => match raw.parse::<u64>() {
            Ok(0) | Err(_) => Err(ProviderError::InvalidConfig(format!(
                "{} must be a positive integer, got '{}'",
                key, raw
            ))),
            Ok(value) => Ok(Some(value)),
        },
    }
}
