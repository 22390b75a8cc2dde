//! gridscale client errors

use thiserror::Error;

/// Errors that can occur when interacting with the gridscale API
#[derive(Debug, Error)]
pub enum GridscaleError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// gridscale API returned an error status that has no dedicated variant
    #[error("gridscale API error ({status_code}): {message}")]
    Api {
        /// HTTP status code returned by the API
        status_code: u16,
        /// Response body or a short description
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid user UUID or token)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource (or relation) not found (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource is busy or the request conflicts with its current state (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GridscaleError {
    /// Build an error from a non-success HTTP status and its body.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::Authentication(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::Api { status_code, message },
        }
    }

    /// Numeric status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status_code, .. } => Some(*status_code),
            Self::Authentication(_) => Some(401),
            Self::NotFound(_) => Some(404),
            Self::Conflict(_) => Some(409),
            Self::Serialization(_) | Self::InvalidRequest(_) => None,
        }
    }

    /// The target object or relation no longer exists.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// The target is busy (e.g. a server mid power transition).
    pub fn is_conflict(&self) -> bool {
        self.status_code() == Some(409)
    }

    /// Errors worth retrying while polling: gateway hiccups and transport timeouts.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status_code, .. } => matches!(status_code, 502..=504),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(GridscaleError::from_status(404, "gone").is_not_found());
        assert!(GridscaleError::from_status(409, "busy").is_conflict());
        assert!(matches!(
            GridscaleError::from_status(403, "nope"),
            GridscaleError::Authentication(_)
        ));
        let err = GridscaleError::from_status(500, "boom");
        assert_eq!(err.status_code(), Some(500));
        assert!(!err.is_not_found());
        assert!(!err.is_conflict());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_gateway_errors_are_transient() {
        assert!(GridscaleError::from_status(503, "maintenance").is_transient());
        assert!(!GridscaleError::NotFound("x".to_string()).is_transient());
    }
}
