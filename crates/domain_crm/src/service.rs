//! Record services
//!
//! [`RecordService`] is the typed facade over an [`OrganizationPort`] for one
//! entity kind. It holds no state besides the shared connection and the page
//! size, and it never recovers from a fault: every failure is logged with the
//! platform's detail text and handed back unchanged.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{error, instrument};

use core_kernel::{RecordId, RemoteFault};

use crate::account::Account;
use crate::contact::Contact;
use crate::incident::Incident;
use crate::paging::retrieve_all;
use crate::ports::OrganizationPort;
use crate::query::{ColumnSet, QueryExpression, DEFAULT_PAGE_SIZE};
use crate::schema::EntitySchema;

/// Service for the `contact` table
pub type ContactService = RecordService<Contact>;

/// Service for the `account` table
pub type AccountService = RecordService<Account>;

/// Service for the `incident` (case) table
pub type CaseService = RecordService<Incident>;

/// CRUD and bulk retrieval for one entity kind
///
/// # Example
///
/// ```rust,ignore
/// use domain_crm::{Contact, ContactService};
///
/// let contacts = ContactService::new(connection.clone());
/// let id = contacts.create(&Contact::new("Bucky", "OHaire")).await?;
/// let mut bucky = contacts.get(id).await?;
/// bucky.last_name = Some("O'Haire".to_string());
/// contacts.update(&bucky).await?;
/// contacts.delete(id).await?;
/// ```
pub struct RecordService<E: EntitySchema> {
    connection: Arc<dyn OrganizationPort>,
    page_size: u32,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntitySchema> RecordService<E> {
    /// Creates a service over a shared connection with the default page size
    pub fn new(connection: Arc<dyn OrganizationPort>) -> Self {
        Self {
            connection,
            page_size: DEFAULT_PAGE_SIZE,
            _entity: PhantomData,
        }
    }

    /// Overrides the number of records requested per page by [`get_all`](Self::get_all)
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Logical name of the entity this service manages
    pub fn entity_name(&self) -> &'static str {
        E::DESCRIPTOR.logical_name
    }

    fn report(&self, operation: &'static str, fault: RemoteFault) -> RemoteFault {
        error!(
            entity = E::DESCRIPTOR.logical_name,
            operation,
            detail = %fault.detail(),
            "{}",
            fault
        );
        fault
    }

    /// Inserts a new record and returns its platform-assigned identifier
    ///
    /// # Errors
    ///
    /// Returns the platform's fault if required fields are missing or the caller
    /// lacks the create privilege.
    #[instrument(skip(self, entity), fields(entity = E::DESCRIPTOR.logical_name))]
    pub async fn create(&self, entity: &E) -> Result<RecordId, RemoteFault> {
        self.connection
            .create(&entity.to_record())
            .await
            .map_err(|fault| self.report("create", fault))
    }

    /// Retrieves one record with all columns
    ///
    /// # Errors
    ///
    /// Not-found, invalid id and missing privilege all surface as the platform's
    /// fault; only its detail text tells them apart.
    #[instrument(skip(self), fields(entity = E::DESCRIPTOR.logical_name))]
    pub async fn get(&self, id: RecordId) -> Result<E, RemoteFault> {
        let record = self
            .connection
            .retrieve(E::DESCRIPTOR.logical_name, id, &ColumnSet::All)
            .await
            .map_err(|fault| self.report("get", fault))?;

        E::from_record(record).map_err(|err| self.report("get", err.into()))
    }

    /// Writes the set fields of an existing record
    ///
    /// The entity must carry its identifier.
    #[instrument(skip(self, entity), fields(entity = E::DESCRIPTOR.logical_name, id = ?entity.id()))]
    pub async fn update(&self, entity: &E) -> Result<(), RemoteFault> {
        if entity.id().is_none() {
            let fault = RemoteFault::validation_attribute(
                format!("{} must carry its identifier to be updated", E::DESCRIPTOR.logical_name),
                E::DESCRIPTOR.primary_id_attribute,
            );
            return Err(self.report("update", fault));
        }

        self.connection
            .update(&entity.to_record())
            .await
            .map_err(|fault| self.report("update", fault))
    }

    /// Removes a record permanently
    #[instrument(skip(self), fields(entity = E::DESCRIPTOR.logical_name))]
    pub async fn delete(&self, id: RecordId) -> Result<(), RemoteFault> {
        self.connection
            .delete(E::DESCRIPTOR.logical_name, id)
            .await
            .map_err(|fault| self.report("delete", fault))
    }

    /// Retrieves every record of this kind, page by page, in platform order
    ///
    /// A fault on any page aborts the retrieval with no partial result.
    #[instrument(skip(self), fields(entity = E::DESCRIPTOR.logical_name, page_size = self.page_size))]
    pub async fn get_all(&self) -> Result<Vec<E>, RemoteFault> {
        let query = QueryExpression::new(E::DESCRIPTOR.logical_name)
            .with_columns(ColumnSet::All)
            .with_page_size(self.page_size);

        let records = retrieve_all(self.connection.as_ref(), query)
            .await
            .map_err(|fault| self.report("get_all", fault))?;

        records
            .into_iter()
            .map(E::from_record)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| self.report("get_all", err.into()))
    }
}

impl<E: EntitySchema> Clone for RecordService<E> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            page_size: self.page_size,
            _entity: PhantomData,
        }
    }
}

impl<E: EntitySchema> fmt::Debug for RecordService<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordService")
            .field("entity", &E::DESCRIPTOR.logical_name)
            .field("page_size", &self.page_size)
            .finish()
    }
}
