//! Account entity
//!
//! An organization the business deals with, optionally linked to a primary
//! contact.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::RecordId;

use crate::error::RecordError;
use crate::record::{AttributeValue, EntityReference, Record};
use crate::schema::{AttributeDescriptor, AttributeKind, EntityDescriptor, EntitySchema};

pub const ACCOUNT: EntityDescriptor = EntityDescriptor {
    logical_name: "account",
    entity_set_name: "accounts",
    primary_id_attribute: "accountid",
    primary_name_attribute: "name",
    attributes: &[
        AttributeDescriptor::writable("name", AttributeKind::String),
        AttributeDescriptor::writable("telephone1", AttributeKind::String),
        AttributeDescriptor::writable("address1_line1", AttributeKind::String),
        AttributeDescriptor::writable("address1_city", AttributeKind::String),
        AttributeDescriptor::writable(
            "primarycontactid",
            AttributeKind::Lookup { targets: &["contact"] },
        ),
        AttributeDescriptor::writable("revenue", AttributeKind::Money),
        AttributeDescriptor::read_only("createdon", AttributeKind::DateTime),
        AttributeDescriptor::read_only("modifiedon", AttributeKind::DateTime),
    ],
};

/// Typed view of an `account` record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<RecordId>,
    pub name: Option<String>,
    pub telephone1: Option<String>,
    pub address1_line1: Option<String>,
    pub address1_city: Option<String>,
    pub primary_contact_id: Option<EntityReference>,
    pub revenue: Option<Decimal>,
    pub created_on: Option<DateTime<Utc>>,
    pub modified_on: Option<DateTime<Utc>>,
}

impl Account {
    /// Creates an unsaved account with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

impl EntitySchema for Account {
    const DESCRIPTOR: &'static EntityDescriptor = &ACCOUNT;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new(ACCOUNT.logical_name);
        if let Some(id) = self.id {
            record.set_id(id);
        }
        record.set_opt("name", self.name.clone());
        record.set_opt("telephone1", self.telephone1.clone());
        record.set_opt("address1_line1", self.address1_line1.clone());
        record.set_opt("address1_city", self.address1_city.clone());
        record.set_opt("primarycontactid", self.primary_contact_id.clone());
        record.set_opt("revenue", self.revenue.map(AttributeValue::Money));
        record
    }

    fn from_record(record: Record) -> Result<Self, RecordError> {
        ACCOUNT.check(&record)?;
        Ok(Self {
            id: record.id(),
            name: record.get_string("name")?,
            telephone1: record.get_string("telephone1")?,
            address1_line1: record.get_string("address1_line1")?,
            address1_city: record.get_string("address1_city")?,
            primary_contact_id: record.get_reference("primarycontactid")?,
            revenue: record.get_decimal("revenue")?,
            created_on: record.get_datetime("createdon")?,
            modified_on: record.get_datetime("modifiedon")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_contact_round_trips_through_record() {
        let contact_id = RecordId::new();
        let account = Account {
            primary_contact_id: Some(EntityReference::new("contact", contact_id)),
            ..Account::new("Righteous Indignation")
        };

        let record = account.to_record();
        let back = Account::from_record(record).unwrap();

        assert_eq!(back.primary_contact_id.unwrap().id, contact_id);
        assert_eq!(back.name.as_deref(), Some("Righteous Indignation"));
    }
}
