//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use std::sync::Arc;

use domain_crm::ports::mock::{InjectedFault, Operation};
use domain_crm::{Contact, MockOrganizationPort, OrganizationPort, Record};

use crate::fixtures::{ContactFixtures, RecordFixtures};

/// Builder for constructing test contacts
pub struct TestContactBuilder {
    contact: Contact,
}

impl Default for TestContactBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContactBuilder {
    /// Creates a new builder starting from the demo contact
    pub fn new() -> Self {
        Self {
            contact: ContactFixtures::bucky(),
        }
    }

    pub fn first_name(mut self, first_name: impl Into<String>) -> Self {
        self.contact.first_name = Some(first_name.into());
        self
    }

    pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
        self.contact.last_name = Some(last_name.into());
        self
    }

    pub fn company(mut self, company: Option<&str>) -> Self {
        self.contact.company = company.map(str::to_string);
        self
    }

    pub fn email(mut self, email: Option<&str>) -> Self {
        self.contact.email_address1 = email.map(str::to_string);
        self
    }

    pub fn build(self) -> Contact {
        self.contact
    }
}

/// Builder for a seeded in-memory organization connection
///
/// By default the mock enforces the platform's required columns: `lastname`
/// on contacts, `name` on accounts, `title` and `customerid` on cases.
pub struct MockConnectionBuilder {
    records: Vec<Record>,
    page_cap: Option<usize>,
    page_faults: Vec<(u32, InjectedFault)>,
    operation_faults: Vec<(Operation, InjectedFault)>,
    enforce_required: bool,
}

impl Default for MockConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnectionBuilder {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            page_cap: None,
            page_faults: Vec::new(),
            operation_faults: Vec::new(),
            enforce_required: true,
        }
    }

    /// Seeds raw records, stored in the given order
    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.records.extend(records);
        self
    }

    /// Seeds `n` ordered contact records
    pub fn with_contacts(self, n: usize) -> Self {
        self.with_records(RecordFixtures::contacts(n))
    }

    /// Serves at most `len` records per page
    pub fn page_cap(mut self, len: usize) -> Self {
        self.page_cap = Some(len);
        self
    }

    pub fn fail_page(mut self, page_number: u32, fault: InjectedFault) -> Self {
        self.page_faults.push((page_number, fault));
        self
    }

    pub fn fail_operation(mut self, operation: Operation, fault: InjectedFault) -> Self {
        self.operation_faults.push((operation, fault));
        self
    }

    /// Accepts records without required columns
    pub fn lenient(mut self) -> Self {
        self.enforce_required = false;
        self
    }

    pub async fn build(self) -> Arc<MockOrganizationPort> {
        let port = MockOrganizationPort::with_records(self.records).await;

        if self.enforce_required {
            port.require_attribute("contact", "lastname").await;
            port.require_attribute("account", "name").await;
            port.require_attribute("incident", "title").await;
            port.require_attribute("incident", "customerid").await;
        }
        if let Some(len) = self.page_cap {
            port.cap_page_len(len).await;
        }
        for (page_number, fault) in self.page_faults {
            port.fail_page(page_number, fault).await;
        }
        for (operation, fault) in self.operation_faults {
            port.fail_operation(operation, fault).await;
        }

        Arc::new(port)
    }

    /// Builds and erases the concrete type
    pub async fn build_port(self) -> Arc<dyn OrganizationPort> {
        self.build().await
    }
}
