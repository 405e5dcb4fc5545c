//! Ports and Adapters Infrastructure
//!
//! This module provides the shared types for the ports and adapters layout used
//! by the domain crate.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Demo Orchestrator                        │
//! │                (interface_cli / crm-demo binary)             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   RecordService<E>                           │
//! │          (one generic service per entity schema)             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    OrganizationPort                          │
//! │   create / retrieve / retrieve_multiple / update / delete    │
//! └─────────────────────────────────────────────────────────────┘
//!                    ▲                         ▲
//!                    │                         │
//!         ┌─────────┴─────────┐     ┌────────┴────────┐
//!         │  WebApiConnection │     │ MockOrganization │
//!         │  (Dataverse REST) │     │  Port (in-memory)│
//!         └───────────────────┘     └──────────────────┘
//! ```
//!
//! Every adapter reports failures as a [`RemoteFault`]. The service layer never
//! recovers from one: it logs the detail text and hands the fault back.

use std::fmt;
use thiserror::Error;
use serde::{Deserialize, Serialize};

/// Failure reported by the remote platform or the path to it
///
/// Each variant carries the human-readable detail text the platform returned
/// (or the transport error text), so callers can surface it unchanged.
#[derive(Debug, Error)]
pub enum RemoteFault {
    /// The requested record does not exist
    #[error("Not found: {entity} with id {id}: {detail}")]
    NotFound {
        entity: String,
        id: String,
        detail: String,
    },

    /// The platform rejected the payload (missing required field, bad value)
    #[error("Validation error: {detail}")]
    Validation {
        detail: String,
        attribute: Option<String>,
    },

    /// Authentication failed or the caller lacks the privilege
    #[error("Unauthorized: {detail}")]
    Unauthorized {
        detail: String,
    },

    /// The platform throttled the request
    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        retry_after_secs: u64,
    },

    /// The platform answered with a server-side failure
    #[error("Service unavailable: {service}: {detail}")]
    ServiceUnavailable {
        service: String,
        detail: String,
    },

    /// The request did not complete in the configured time
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },

    /// The platform could not be reached
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A payload could not be mapped to or from a record
    #[error("Transformation error: {message}")]
    Transformation {
        message: String,
    },

    /// Any other failure
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RemoteFault {
    /// Creates a NotFound fault
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display, detail: impl Into<String>) -> Self {
        RemoteFault::NotFound {
            entity: entity.into(),
            id: id.to_string(),
            detail: detail.into(),
        }
    }

    /// Creates a Validation fault
    pub fn validation(detail: impl Into<String>) -> Self {
        RemoteFault::Validation {
            detail: detail.into(),
            attribute: None,
        }
    }

    /// Creates a Validation fault naming the offending attribute
    pub fn validation_attribute(detail: impl Into<String>, attribute: impl Into<String>) -> Self {
        RemoteFault::Validation {
            detail: detail.into(),
            attribute: Some(attribute.into()),
        }
    }

    /// Creates an Unauthorized fault
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        RemoteFault::Unauthorized {
            detail: detail.into(),
        }
    }

    /// Creates a Connection fault
    pub fn connection(message: impl Into<String>) -> Self {
        RemoteFault::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a Transformation fault
    pub fn transformation(message: impl Into<String>) -> Self {
        RemoteFault::Transformation {
            message: message.into(),
        }
    }

    /// Creates an Internal fault
    pub fn internal(message: impl Into<String>) -> Self {
        RemoteFault::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the detail text without the variant prefix
    pub fn detail(&self) -> String {
        match self {
            RemoteFault::NotFound { detail, .. }
            | RemoteFault::Validation { detail, .. }
            | RemoteFault::Unauthorized { detail }
            | RemoteFault::ServiceUnavailable { detail, .. } => detail.clone(),
            RemoteFault::Connection { message, .. }
            | RemoteFault::Transformation { message }
            | RemoteFault::Internal { message, .. } => message.clone(),
            RemoteFault::RateLimited { .. } | RemoteFault::Timeout { .. } => self.to_string(),
        }
    }

    /// Returns true if this fault indicates a transient failure that may succeed on retry
    ///
    /// Services never retry; this is for callers that want to decide for themselves.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteFault::Connection { .. }
                | RemoteFault::Timeout { .. }
                | RemoteFault::RateLimited { .. }
                | RemoteFault::ServiceUnavailable { .. }
        )
    }

    /// Returns true if this fault indicates the record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteFault::NotFound { .. })
    }
}

/// Marker trait for all domain ports
///
/// Ports are shared across tasks behind an `Arc`.
pub trait DomainPort: Send + Sync + 'static {}

/// Reachability of an organization connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionHealth {
    /// The platform answered
    Healthy,
    /// The platform failed in a way that may clear up (throttling, outage, timeout)
    Degraded,
    /// The platform refused the connection outright
    Unhealthy,
}

/// Outcome of one health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Which connection was probed
    pub connection: String,
    pub status: ConnectionHealth,
    /// Round trip of the probe in milliseconds
    pub latency_ms: u64,
    /// Fault detail when not healthy
    pub detail: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    /// Classifies a probe outcome
    pub fn from_probe<T>(
        connection: impl Into<String>,
        outcome: &Result<T, RemoteFault>,
        latency_ms: u64,
    ) -> Self {
        let (status, detail) = match outcome {
            Ok(_) => (ConnectionHealth::Healthy, None),
            Err(fault) if fault.is_transient() => (ConnectionHealth::Degraded, Some(fault.detail())),
            Err(fault) => (ConnectionHealth::Unhealthy, Some(fault.detail())),
        };
        Self {
            connection: connection.into(),
            status,
            latency_ms,
            detail,
            checked_at: chrono::Utc::now(),
        }
    }
}

/// Connections that can probe the platform they talk to
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthReport;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_fault_not_found() {
        let fault = RemoteFault::not_found("contact", "123", "contact With Id = 123 Does Not Exist");
        assert!(fault.is_not_found());
        assert!(!fault.is_transient());
        assert!(fault.to_string().contains("contact"));
        assert_eq!(fault.detail(), "contact With Id = 123 Does Not Exist");
    }

    #[test]
    fn test_remote_fault_transient() {
        let timeout = RemoteFault::Timeout {
            operation: "retrieve_multiple".to_string(),
            duration_ms: 5000,
        };
        assert!(timeout.is_transient());

        let rate_limited = RemoteFault::RateLimited {
            retry_after_secs: 60,
        };
        assert!(rate_limited.is_transient());

        let validation = RemoteFault::validation("Required field missing");
        assert!(!validation.is_transient());
    }

    #[test]
    fn test_health_report_classifies_faults() {
        let ok: Result<(), RemoteFault> = Ok(());
        assert_eq!(HealthReport::from_probe("c", &ok, 3).status, ConnectionHealth::Healthy);

        let throttled: Result<(), RemoteFault> = Err(RemoteFault::RateLimited { retry_after_secs: 5 });
        assert_eq!(HealthReport::from_probe("c", &throttled, 3).status, ConnectionHealth::Degraded);

        let refused: Result<(), RemoteFault> = Err(RemoteFault::unauthorized("AADSTS7000215: Invalid client secret"));
        let report = HealthReport::from_probe("c", &refused, 3);
        assert_eq!(report.status, ConnectionHealth::Unhealthy);
        assert_eq!(report.detail.as_deref(), Some("AADSTS7000215: Invalid client secret"));
    }

    #[test]
    fn test_validation_attribute() {
        let fault = RemoteFault::validation_attribute("name is required", "name");
        match fault {
            RemoteFault::Validation { attribute, .. } => assert_eq!(attribute.as_deref(), Some("name")),
            _ => panic!("Expected Validation fault"),
        }
    }
}
