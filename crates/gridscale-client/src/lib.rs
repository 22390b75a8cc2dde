//! gridscale REST API Client
//!
//! A Rust client library for the gridscale REST API.
//! Provides typed models and methods for servers and the objects linked to
//! them (storages, networks, IP addresses, ISO images), plus the object kinds
//! the provider polls for status (snapshots, security zones, PaaS services, ...).
//!
//! # Example
//!
//! ```no_run
//! use gridscale_client::{GridscaleClient, GridscaleClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GridscaleClient::new(
//!     "https://api.gridscale.io".to_string(),
//!     "user-uuid".to_string(),
//!     "api-token".to_string(),
//! )?;
//!
//! let server = client.get_server("0b8e5a1c-2f2d-4b8e-9f3a-6b1f7f2c9d10").await?;
//! println!("{} is powered {}", server.name, if server.power { "on" } else { "off" });
//!
//! client.link_storage(&server.object_uuid, "5d3c1e0f-8a6b-4c2d-9e7f-1a2b3c4d5e6f", true).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Every call fails with [`GridscaleError`], which exposes the HTTP status code
//! of the failed request: 404 means the target is absent, 409 that it is busy.

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod gridscale_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{GridscaleClient, DEFAULT_API_URL};
pub use common::HttpClient;
pub use error::GridscaleError;
pub use gridscale_trait::GridscaleClientTrait;
pub use models::*;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockCall, MockGridscaleClient, MockOp};
