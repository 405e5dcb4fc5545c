//! CRM Record Domain
//!
//! This crate manages Contact, Account and Case (incident) records held in a
//! Dataverse environment.
//!
//! # Layers
//!
//! - **Records**: [`Record`] is a loosely-typed row; [`Contact`], [`Account`]
//!   and [`Incident`] are typed views over it, described by an [`EntityDescriptor`]
//! - **Port**: [`OrganizationPort`] is the organization service surface
//!   (create, retrieve, retrieve multiple, update, delete, execute)
//! - **Services**: [`RecordService`] offers typed CRUD plus paged bulk retrieval
//!   for one entity kind
//! - **Adapters**: [`adapters::WebApiConnection`] talks to a real environment;
//!   `MockOrganizationPort` (feature `mock`) keeps records in memory
//!
//! # Examples
//!
//! ```rust
//! use domain_crm::{Contact, EntitySchema, AttributeValue};
//!
//! let contact = Contact {
//!     company: Some("RI Shipping plc".to_string()),
//!     ..Contact::new("Bucky", "OHaire")
//! };
//!
//! let record = contact.to_record();
//! assert_eq!(record.logical_name(), "contact");
//! assert_eq!(record.get("lastname"), Some(&AttributeValue::String("OHaire".to_string())));
//! ```

pub mod record;
pub mod schema;
pub mod contact;
pub mod account;
pub mod incident;
pub mod query;
pub mod error;
pub mod ports;
pub mod paging;
pub mod service;
pub mod adapters;

pub use record::{AttributeValue, EntityReference, Record};
pub use schema::{
    descriptor_for, AttributeDescriptor, AttributeKind, EntityDescriptor, EntitySchema,
    KNOWN_ENTITIES,
};
pub use contact::{Contact, CONTACT};
pub use account::{Account, ACCOUNT};
pub use incident::{CaseOrigin, Incident, IncidentPriority, IncidentStatus, INCIDENT};
pub use query::{ColumnSet, EntityCollection, PagingInfo, QueryExpression, DEFAULT_PAGE_SIZE};
pub use error::RecordError;
pub use ports::{OrganizationPort, OrganizationRequest, OrganizationResponse, WhoAmIResponse};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockOrganizationPort;
pub use paging::retrieve_all;
pub use service::{AccountService, CaseService, ContactService, RecordService};
pub use adapters::{ConnectionDescriptor, WebApiConnection};
