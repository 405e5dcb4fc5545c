//! Organization connection adapters
//!
//! Implementations of [`OrganizationPort`](crate::OrganizationPort) that talk to
//! a real environment. The in-memory [`MockOrganizationPort`](crate::ports::mock::MockOrganizationPort)
//! lives next to the port itself.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use domain_crm::adapters::WebApiConnection;
//! use domain_crm::{ContactService, OrganizationPort};
//!
//! let connection: Arc<dyn OrganizationPort> = Arc::new(WebApiConnection::connect(
//!     "AuthType=ClientSecret; url=https://org.crm.dynamics.com; ClientId=...; Secret=...",
//! )?);
//! let contacts = ContactService::new(connection);
//! ```

pub mod connection_string;
mod odata;
pub mod web_api;

pub use connection_string::{AuthType, ConnectionDescriptor};
pub use odata::fetch_xml;
pub use web_api::{WebApiConnection, API_PATH};
