//! Core Kernel - Foundational types shared by the CRM capstone crates
//!
//! This crate provides the building blocks used by the domain and interface layers:
//! - Strongly-typed GUID identifiers for records and platform principals
//! - The `RemoteFault` error every organization connection reports
//! - Marker and health-check traits for ports and their adapters

pub mod identifiers;
pub mod ports;

pub use identifiers::{RecordId, UserId, BusinessUnitId, OrganizationId};
pub use ports::{
    RemoteFault, DomainPort, HealthCheckable, HealthReport, ConnectionHealth,
};
