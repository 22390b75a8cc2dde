//! gridscale provider
//!
//! Infrastructure-as-code provider for gridscale. A host tool hands it one
//! lifecycle request at a time (create, read, update, delete of a resource, or
//! a data source read) and gets the resulting state back.
//!
//! The heart of the provider is the server dependency reconciler: given the
//! current and desired configuration of a server it works out which storages,
//! networks, IP addresses and ISO images to link or unlink, whether the server
//! must be powered off for that, and in which order to issue the calls. The
//! status poller blocks operations until the objects involved settle.
//!
//! Modules:
//! - `adapter`: host attribute JSON to typed configuration and back
//! - `model`: typed server configuration and set diffs
//! - `validation`: enumerations and attribute checks
//! - `reconciler`: link/unlink/resize planning and execution
//! - `poller`: waiting for objects to become active or disappear
//! - `power`: start/stop/shutdown with conflict retry
//! - `resources`: per-resource handlers and the [`Provider`](resources::Provider) entry point
//! - `protocol`: host request and response messages

pub mod adapter;
pub mod backoff;
pub mod config;
pub mod error;
pub mod model;
pub mod poller;
pub mod power;
pub mod protocol;
pub mod reconciler;
pub mod resources;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{ProviderConfig, Timeouts};
pub use error::ProviderError;
pub use protocol::{Request, Response};
pub use resources::Provider;
