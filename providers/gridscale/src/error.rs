//! Provider-specific error types.
//!
//! This module defines the errors raised while translating host requests into
//! gridscale API calls that are not covered by the client library's errors.

use gridscale_client::GridscaleError;
use thiserror::Error;

/// Errors that can occur in the gridscale provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// gridscale API error without further context
    #[error("gridscale error: {0}")]
    Client(#[from] GridscaleError),

    /// gridscale API error raised while performing a named action
    #[error("{context}: {source}")]
    Remote {
        /// What was being done, naming the objects involved
        context: String,
        /// Underlying client error
        #[source]
        source: GridscaleError,
    },

    /// Local precondition failure; retrying will not help
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Waiting for a resource exceeded the operation timeout
    #[error("Timeout reached while waiting for {kind} ({ids}) to {goal}")]
    Timeout {
        /// Resource kind being waited on
        kind: String,
        /// Comma separated identifiers
        ids: String,
        /// Condition that never held, e.g. "become active"
        goal: String,
    },

    /// Waiting for a deletion exceeded the operation timeout
    #[error("Timeout reached while waiting for {kind} ({ids}) to be deleted")]
    DeleteTimeout {
        /// Resource kind being waited on
        kind: String,
        /// Comma separated identifiers
        ids: String,
    },

    /// Wrong number of identifiers for a resource kind
    #[error("{kind} is addressed by {expected} id(s), got {got}")]
    InvalidIds {
        /// Resource kind
        kind: String,
        /// Identifiers the kind needs
        expected: usize,
        /// Identifiers supplied
        got: usize,
    },

    /// Invalid provider configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The host asked for a resource or data source this provider does not serve
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    /// The resource no longer exists remotely
    #[error("{0} was removed outside of the provider")]
    RemovedExternally(String),

    /// Attribute JSON could not be decoded or encoded
    #[error("Attribute serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Wrap a client error with the action that failed.
    pub fn remote(context: impl Into<String>, source: GridscaleError) -> Self {
        Self::Remote {
            context: context.into(),
            source,
        }
    }

    /// Status code of the underlying client error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Client(e) | Self::Remote { source: e, .. } => e.status_code(),
            _ => None,
        }
    }
}

/// Attach context to client results.
pub trait RemoteContext<T> {
    /// Convert the error into [`ProviderError::Remote`] with a lazily built message.
    fn context<F>(self, context: F) -> Result<T, ProviderError>
    where
        F: FnOnce() -> String;
}

impl<T> RemoteContext<T> for Result<T, GridscaleError> {
    fn context<F>(self, context: F) -> Result<T, ProviderError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ProviderError::remote(context(), e))
    }
}
