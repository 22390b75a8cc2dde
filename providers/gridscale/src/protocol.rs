//! Host request/response messages
//!
//! The host sends one JSON [`Request`] per invocation and expects one JSON
//! [`Response`] back. Failures travel as error diagnostics, never as a
//! non-JSON answer.

use crate::error::ProviderError;
use crate::resources::Provider;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error as _;
use tracing::error;

/// Lifecycle operation requested by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    ReadDataSource,
}

/// One host request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    pub operation: Operation,
    /// Resource type, or data source type for [`Operation::ReadDataSource`]
    pub resource_type: String,
    #[serde(default)]
    pub prior_state: Option<Value>,
    /// Planned attributes; the data source configuration for reads of data sources
    #[serde(default)]
    pub planned_state: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Diagnostic {
    /// Error diagnostic carrying the error chain
    pub fn from_error(err: &ProviderError) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            severity: Severity::Error,
            summary: err.to_string(),
            detail: (!causes.is_empty()).then(|| causes.join(": ")),
        }
    }
}

/// Answer to one host request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    /// New state; `null` once a resource is deleted or found gone
    pub state: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Response {
    fn ok(state: Option<Value>) -> Self {
        Self {
            state,
            diagnostics: Vec::new(),
        }
    }

    /// Failed operation; `state` is what the host should keep
    fn failed(state: Option<Value>, err: &ProviderError) -> Self {
        Self {
            state,
            diagnostics: vec![Diagnostic::from_error(err)],
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }
}

fn required<'a>(value: &'a Option<Value>, name: &str, operation: Operation) -> Result<&'a Value, ProviderError> {
    value
        .as_ref()
        .ok_or_else(|| ProviderError::Validation(format!("{:?} requires {}", operation, name)))
}

impl Provider {
    /// Run one host request to completion
    pub async fn handle(&self, request: Request) -> Response {
        let Request {
            operation,
            resource_type,
            prior_state,
            planned_state,
        } = request;

        let result = match operation {
            Operation::Create => match required(&planned_state, "planned_state", operation) {
                Ok(planned) => self.create(&resource_type, planned).await.map(Some),
                Err(e) => Err(e),
            },
            Operation::Read => match required(&prior_state, "prior_state", operation) {
                Ok(prior) => self.read(&resource_type, prior).await,
                Err(e) => Err(e),
            },
            Operation::Update => {
                match (
                    required(&prior_state, "prior_state", operation),
                    required(&planned_state, "planned_state", operation),
                ) {
                    (Ok(prior), Ok(planned)) => self.update(&resource_type, prior, planned).await.map(Some),
                    (Err(e), _) | (_, Err(e)) => Err(e),
                }
            }
            Operation::Delete => match required(&prior_state, "prior_state", operation) {
                Ok(prior) => self.delete(&resource_type, prior).await.map(|()| None),
                Err(e) => Err(e),
            },
            Operation::ReadDataSource => match required(&planned_state, "planned_state", operation) {
                Ok(config) => self.read_data_source(&resource_type, config).await.map(Some),
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(state) => Response::ok(state),
            Err(e) => {
                error!("{:?} of {} failed: {}", operation, resource_type, e);
                // The host keeps what it had before the failed operation
                let keep = match operation {
                    Operation::Create | Operation::ReadDataSource => None,
                    _ => prior_state,
                };
                Response::failed(keep, &e)
            }
        }
    }
}
