//! Server dependency reconciliation.
//!
//! Decides which link/unlink/resize calls a server needs, in which order and
//! under which power state:
//! - `link`: attaching everything a freshly created server depends on
//! - `update`: moving an existing server from its current to its desired configuration

pub mod link;
pub mod update;
#[cfg(test)]
mod link_test;

pub use update::is_shutdown_required;

use crate::config::Timeouts;
use crate::power::PowerControl;
use gridscale_client::{GridscaleClientTrait, GridscaleError};
use tracing::debug;

/// Reconciles the dependencies of one server.
pub struct ServerReconciler<'a> {
    pub(crate) client: &'a dyn GridscaleClientTrait,
    pub(crate) server_uuid: &'a str,
    pub(crate) timeouts: Timeouts,
}

impl<'a> ServerReconciler<'a> {
    pub fn new(client: &'a dyn GridscaleClientTrait, server_uuid: &'a str, timeouts: Timeouts) -> Self {
        Self {
            client,
            server_uuid,
            timeouts,
        }
    }

    pub(crate) fn power(&self) -> PowerControl<'a> {
        PowerControl::new(self.client, self.timeouts)
    }
}

/// Treat a not-found answer to an unlink as success: the relation is already gone.
pub(crate) fn tolerate_not_found(result: Result<(), GridscaleError>, what: &str) -> Result<(), GridscaleError> {
    match result {
        Err(e) if e.is_not_found() => {
            debug!("{} was already gone", what);
            Ok(())
        }
        other => other,
    }
}
