//! Organization Connection Port
//!
//! This module defines the port every record service talks through. It mirrors
//! the organization service surface of the platform: create, retrieve,
//! retrieve-multiple, update, delete and execute.
//!
//! # Architecture
//!
//! Two adapters implement [`OrganizationPort`]:
//!
//! - **WebApiConnection**: Dataverse Web API over HTTPS (`adapters::web_api`)
//! - **MockOrganizationPort**: in-memory store for tests and offline demos
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_crm::{ContactService, OrganizationPort};
//! use std::sync::Arc;
//!
//! let connection: Arc<dyn OrganizationPort> = Arc::new(WebApiConnection::connect(&descriptor)?);
//! let contacts = ContactService::new(connection.clone());
//! let everyone = contacts.get_all().await?;
//! ```
//!
//! The services never construct a connection; whoever owns the run scope does,
//! and dropping the last `Arc` releases it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{
    BusinessUnitId, DomainPort, HealthCheckable, OrganizationId, RecordId, RemoteFault, UserId,
};

use crate::query::{ColumnSet, EntityCollection, QueryExpression};
use crate::record::Record;

/// Messages sent through [`OrganizationPort::execute`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrganizationRequest {
    /// Identify the calling principal
    WhoAmI,
}

/// Responses returned by [`OrganizationPort::execute`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrganizationResponse {
    WhoAmI(WhoAmIResponse),
}

/// The principal a connection is authenticated as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    pub user_id: UserId,
    pub business_unit_id: BusinessUnitId,
    pub organization_id: OrganizationId,
}

/// The organization service surface consumed by record services
///
/// Implementations report every failure as a [`RemoteFault`] carrying the
/// platform's detail text. They must not retry on their own.
#[async_trait]
pub trait OrganizationPort: DomainPort + HealthCheckable {
    /// Inserts a record and returns the identifier the platform assigned
    async fn create(&self, record: &Record) -> Result<RecordId, RemoteFault>;

    /// Fetches one record by identifier
    async fn retrieve(
        &self,
        entity_name: &str,
        id: RecordId,
        columns: &ColumnSet,
    ) -> Result<Record, RemoteFault>;

    /// Fetches one page of records for a query
    async fn retrieve_multiple(&self, query: &QueryExpression) -> Result<EntityCollection, RemoteFault>;

    /// Writes the set attributes of a record that carries its identifier
    async fn update(&self, record: &Record) -> Result<(), RemoteFault>;

    /// Removes a record permanently
    async fn delete(&self, entity_name: &str, id: RecordId) -> Result<(), RemoteFault>;

    /// Executes a platform message
    async fn execute(&self, request: OrganizationRequest) -> Result<OrganizationResponse, RemoteFault>;
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use chrono::{DateTime, Duration, Utc};
    use tokio::sync::RwLock;

    use core_kernel::HealthReport;

    use crate::query::PagingInfo;
    use crate::record::{AttributeValue, EntityReference};
    use crate::schema::descriptor_for;

    /// Port operations a fault can be injected into
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Operation {
        Create,
        Retrieve,
        RetrieveMultiple,
        Update,
        Delete,
        Execute,
    }

    /// A fault the mock raises instead of performing an operation
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum InjectedFault {
        Unauthorized(String),
        ServiceUnavailable(String),
        Validation(String),
    }

    impl InjectedFault {
        fn to_fault(&self) -> RemoteFault {
            match self {
                InjectedFault::Unauthorized(detail) => RemoteFault::unauthorized(detail.clone()),
                InjectedFault::ServiceUnavailable(detail) => RemoteFault::ServiceUnavailable {
                    service: "mock-organization".to_string(),
                    detail: detail.clone(),
                },
                InjectedFault::Validation(detail) => RemoteFault::validation(detail.clone()),
            }
        }
    }

    #[derive(Debug, Default)]
    struct MockState {
        // Insertion order doubles as platform return order
        records: Vec<Record>,
        required: HashMap<String, Vec<String>>,
        operation_faults: HashMap<Operation, InjectedFault>,
        page_faults: HashMap<u32, InjectedFault>,
        max_page_len: Option<usize>,
        page_requests: Vec<PagingInfo>,
        last_stamp: Option<DateTime<Utc>>,
    }

    impl MockState {
        /// Current time, strictly after the previous stamp
        fn next_stamp(&mut self) -> DateTime<Utc> {
            let now = Utc::now();
            let stamp = match self.last_stamp {
                Some(last) if now <= last => last + Duration::milliseconds(1),
                _ => now,
            };
            self.last_stamp = Some(stamp);
            stamp
        }

        fn position(&self, entity_name: &str, id: RecordId) -> Option<usize> {
            self.records
                .iter()
                .position(|r| r.logical_name() == entity_name && r.id() == Some(id))
        }

        fn check_operation(&self, operation: Operation) -> Result<(), RemoteFault> {
            match self.operation_faults.get(&operation) {
                Some(fault) => Err(fault.to_fault()),
                None => Ok(()),
            }
        }

        /// Fills reference display names from the target's primary name column
        fn resolve_names(&self, record: &mut Record) {
            let references: Vec<(String, EntityReference)> = record
                .attributes()
                .filter_map(|(name, value)| match value {
                    AttributeValue::Reference(r) => Some((name.to_string(), r.clone())),
                    _ => None,
                })
                .collect();

            for (attribute, mut reference) in references {
                let name = descriptor_for(&reference.logical_name).and_then(|descriptor| {
                    let target = &self.records[self.position(&reference.logical_name, reference.id)?];
                    target.get_string(descriptor.primary_name_attribute).ok().flatten()
                });
                reference.name = name;
                record.set(attribute, reference);
            }
        }
    }

    fn not_found(entity_name: &str, id: RecordId) -> RemoteFault {
        RemoteFault::not_found(
            entity_name,
            id,
            format!("{} With Id = {} Does Not Exist", entity_name, id),
        )
    }

    /// Drops columns the platform maintains itself
    fn strip_read_only(record: &mut Record) {
        if let Some(descriptor) = descriptor_for(record.logical_name()) {
            for attribute in descriptor.attributes.iter().filter(|a| a.read_only) {
                record.remove(attribute.name);
            }
        }
    }

    /// The platform composes a contact's full name from its parts
    fn compose_full_name(record: &mut Record) {
        if record.logical_name() != "contact" {
            return;
        }
        let parts: Vec<String> = ["firstname", "lastname"]
            .iter()
            .filter_map(|name| record.get_string(name).ok().flatten())
            .collect();
        if !parts.is_empty() {
            record.set("fullname", parts.join(" "));
        }
    }

    /// In-memory mock implementation of OrganizationPort
    #[derive(Debug)]
    pub struct MockOrganizationPort {
        state: Arc<RwLock<MockState>>,
        whoami: WhoAmIResponse,
    }

    impl Default for MockOrganizationPort {
        fn default() -> Self {
            Self {
                state: Arc::new(RwLock::new(MockState::default())),
                whoami: WhoAmIResponse {
                    user_id: UserId::new(),
                    business_unit_id: BusinessUnitId::new(),
                    organization_id: OrganizationId::new(),
                },
            }
        }
    }

    impl MockOrganizationPort {
        /// Creates a new, empty mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with records, assigning ids and timestamps where missing
        pub async fn with_records(records: Vec<Record>) -> Self {
            let port = Self::new();
            {
                let mut state = port.state.write().await;
                for mut record in records {
                    if record.id().is_none() {
                        record.set_id(RecordId::new());
                    }
                    let stamp = state.next_stamp();
                    record.set("createdon", stamp);
                    record.set("modifiedon", stamp);
                    state.records.push(record);
                }
            }
            port
        }

        /// The principal WhoAmI reports
        pub fn whoami(&self) -> WhoAmIResponse {
            self.whoami
        }

        /// Makes create fail with a validation fault unless `attribute` is set
        pub async fn require_attribute(&self, entity_name: &str, attribute: &str) {
            self.state
                .write()
                .await
                .required
                .entry(entity_name.to_string())
                .or_default()
                .push(attribute.to_string());
        }

        /// Makes every call of `operation` fail until faults are cleared
        pub async fn fail_operation(&self, operation: Operation, fault: InjectedFault) {
            self.state.write().await.operation_faults.insert(operation, fault);
        }

        /// Makes retrieve_multiple fail when asked for `page_number`
        pub async fn fail_page(&self, page_number: u32, fault: InjectedFault) {
            self.state.write().await.page_faults.insert(page_number, fault);
        }

        pub async fn clear_faults(&self) {
            let mut state = self.state.write().await;
            state.operation_faults.clear();
            state.page_faults.clear();
        }

        /// Serves at most `len` records per page regardless of the requested count
        pub async fn cap_page_len(&self, len: usize) {
            self.state.write().await.max_page_len = Some(len.max(1));
        }

        /// Every paging request received, in order
        pub async fn page_requests(&self) -> Vec<PagingInfo> {
            self.state.read().await.page_requests.clone()
        }

        /// Number of stored records of one kind
        pub async fn count(&self, entity_name: &str) -> usize {
            self.state
                .read()
                .await
                .records
                .iter()
                .filter(|r| r.logical_name() == entity_name)
                .count()
        }
    }

    impl DomainPort for MockOrganizationPort {}

    #[async_trait]
    impl HealthCheckable for MockOrganizationPort {
        async fn health_check(&self) -> HealthReport {
            let outcome = self.execute(OrganizationRequest::WhoAmI).await;
            HealthReport::from_probe("mock-organization", &outcome, 0)
        }
    }

    #[async_trait]
    impl OrganizationPort for MockOrganizationPort {
        async fn create(&self, record: &Record) -> Result<RecordId, RemoteFault> {
            let mut state = self.state.write().await;
            state.check_operation(Operation::Create)?;

            if let Some(required) = state.required.get(record.logical_name()) {
                for attribute in required {
                    if record.get(attribute).map_or(true, AttributeValue::is_null) {
                        return Err(RemoteFault::validation_attribute(
                            format!("Required field '{}' is missing", attribute),
                            attribute.clone(),
                        ));
                    }
                }
            }

            let id = record.id().unwrap_or_else(RecordId::new);
            if state.position(record.logical_name(), id).is_some() {
                return Err(RemoteFault::validation("Cannot insert duplicate key."));
            }

            let mut stored = Record::new(record.logical_name()).with_id(id);
            stored.merge(record);
            strip_read_only(&mut stored);
            compose_full_name(&mut stored);
            let stamp = state.next_stamp();
            stored.set("createdon", stamp);
            stored.set("modifiedon", stamp);
            state.records.push(stored);

            Ok(id)
        }

        async fn retrieve(
            &self,
            entity_name: &str,
            id: RecordId,
            columns: &ColumnSet,
        ) -> Result<Record, RemoteFault> {
            let state = self.state.read().await;
            state.check_operation(Operation::Retrieve)?;

            let index = state
                .position(entity_name, id)
                .ok_or_else(|| not_found(entity_name, id))?;
            let mut record = state.records[index].clone();
            if let ColumnSet::Columns(names) = columns {
                record.retain_columns(names);
            }
            state.resolve_names(&mut record);
            Ok(record)
        }

        async fn retrieve_multiple(&self, query: &QueryExpression) -> Result<EntityCollection, RemoteFault> {
            let mut state = self.state.write().await;
            state.page_requests.push(query.page_info);
            state.check_operation(Operation::RetrieveMultiple)?;
            if let Some(fault) = state.page_faults.get(&query.page_info.page_number) {
                return Err(fault.to_fault());
            }

            let page_len = match state.max_page_len {
                Some(cap) => cap.min(query.page_info.count as usize),
                None => query.page_info.count as usize,
            };
            let start = (query.page_info.page_number.max(1) as usize - 1) * page_len;

            let matching: Vec<&Record> = state
                .records
                .iter()
                .filter(|r| r.logical_name() == query.entity_name)
                .collect();
            let more_records = start + page_len < matching.len();

            let mut entities: Vec<Record> = matching
                .into_iter()
                .skip(start)
                .take(page_len)
                .cloned()
                .collect();
            for record in &mut entities {
                if let ColumnSet::Columns(names) = &query.column_set {
                    record.retain_columns(names);
                }
                state.resolve_names(record);
            }

            Ok(EntityCollection {
                entity_name: query.entity_name.clone(),
                entities,
                more_records,
            })
        }

        async fn update(&self, record: &Record) -> Result<(), RemoteFault> {
            let mut state = self.state.write().await;
            state.check_operation(Operation::Update)?;

            let id = record
                .id()
                .ok_or_else(|| RemoteFault::validation("Entity Id must be specified for Update"))?;
            let index = state
                .position(record.logical_name(), id)
                .ok_or_else(|| not_found(record.logical_name(), id))?;

            let mut changes = record.clone();
            strip_read_only(&mut changes);
            let stamp = state.next_stamp();
            let stored = &mut state.records[index];
            stored.merge(&changes);
            compose_full_name(stored);
            stored.set("modifiedon", stamp);
            Ok(())
        }

        async fn delete(&self, entity_name: &str, id: RecordId) -> Result<(), RemoteFault> {
            let mut state = self.state.write().await;
            state.check_operation(Operation::Delete)?;

            let index = state
                .position(entity_name, id)
                .ok_or_else(|| not_found(entity_name, id))?;
            state.records.remove(index);
            Ok(())
        }

        async fn execute(&self, request: OrganizationRequest) -> Result<OrganizationResponse, RemoteFault> {
            self.state.read().await.check_operation(Operation::Execute)?;
            match request {
                OrganizationRequest::WhoAmI => Ok(OrganizationResponse::WhoAmI(self.whoami)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use core_kernel::ConnectionHealth;

    #[tokio::test]
    async fn test_mock_assigns_ids_and_timestamps() {
        let port = MockOrganizationPort::new();
        let id = port
            .create(&Record::new("contact").with("firstname", "Ian").with("lastname", "Garroway"))
            .await
            .unwrap();

        let record = port.retrieve("contact", id, &ColumnSet::All).await.unwrap();
        assert_eq!(record.id(), Some(id));
        assert_eq!(record.get_string("fullname").unwrap().as_deref(), Some("Ian Garroway"));
        assert!(record.get_datetime("createdon").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mock_required_attribute() {
        let port = MockOrganizationPort::new();
        port.require_attribute("account", "name").await;

        let err = port.create(&Record::new("account")).await.unwrap_err();
        assert!(matches!(err, RemoteFault::Validation { .. }));
        assert_eq!(port.count("account").await, 0);
    }

    #[tokio::test]
    async fn test_mock_update_needs_id() {
        let port = MockOrganizationPort::new();
        let err = port.update(&Record::new("contact")).await.unwrap_err();
        assert!(matches!(err, RemoteFault::Validation { .. }));
    }

    #[tokio::test]
    async fn test_mock_whoami() {
        let port = MockOrganizationPort::new();
        let response = port.execute(OrganizationRequest::WhoAmI).await.unwrap();
        assert_eq!(response, OrganizationResponse::WhoAmI(port.whoami()));
    }

    #[tokio::test]
    async fn test_mock_operation_fault() {
        let port = MockOrganizationPort::new();
        port.fail_operation(Operation::Delete, InjectedFault::Unauthorized("no delete".into()))
            .await;

        let err = port.delete("contact", RecordId::new()).await.unwrap_err();
        assert!(matches!(err, RemoteFault::Unauthorized { .. }));

        port.clear_faults().await;
        let err = port.delete("contact", RecordId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mock_health_follows_whoami() {
        let port = MockOrganizationPort::new();
        assert_eq!(port.health_check().await.status, ConnectionHealth::Healthy);

        port.fail_operation(Operation::Execute, InjectedFault::ServiceUnavailable("busy".into()))
            .await;
        let report = port.health_check().await;
        assert_eq!(report.status, ConnectionHealth::Degraded);
        assert_eq!(report.detail.as_deref(), Some("busy"));
    }
}
