//! Contact entity
//!
//! A person known to the organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::RecordId;

use crate::error::RecordError;
use crate::record::Record;
use crate::schema::{AttributeDescriptor, AttributeKind, EntityDescriptor, EntitySchema};

pub const CONTACT: EntityDescriptor = EntityDescriptor {
    logical_name: "contact",
    entity_set_name: "contacts",
    primary_id_attribute: "contactid",
    primary_name_attribute: "fullname",
    attributes: &[
        AttributeDescriptor::writable("firstname", AttributeKind::String),
        AttributeDescriptor::writable("lastname", AttributeKind::String),
        AttributeDescriptor::read_only("fullname", AttributeKind::String),
        AttributeDescriptor::writable("emailaddress1", AttributeKind::String),
        AttributeDescriptor::writable("telephone1", AttributeKind::String),
        AttributeDescriptor::writable("company", AttributeKind::String),
        AttributeDescriptor::read_only("createdon", AttributeKind::DateTime),
        AttributeDescriptor::read_only("modifiedon", AttributeKind::DateTime),
    ],
};

/// Typed view of a `contact` record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Option<RecordId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Composed by the platform from first and last name
    pub full_name: Option<String>,
    pub email_address1: Option<String>,
    pub telephone1: Option<String>,
    pub company: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    pub modified_on: Option<DateTime<Utc>>,
}

impl Contact {
    /// Creates an unsaved contact with a first and last name
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            ..Default::default()
        }
    }

    /// Full name as the platform composed it, or first and last name joined
    pub fn display_name(&self) -> Option<String> {
        if let Some(full_name) = self.full_name.as_ref().filter(|n| !n.is_empty()) {
            return Some(full_name.clone());
        }
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

impl EntitySchema for Contact {
    const DESCRIPTOR: &'static EntityDescriptor = &CONTACT;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new(CONTACT.logical_name);
        if let Some(id) = self.id {
            record.set_id(id);
        }
        record.set_opt("firstname", self.first_name.clone());
        record.set_opt("lastname", self.last_name.clone());
        record.set_opt("emailaddress1", self.email_address1.clone());
        record.set_opt("telephone1", self.telephone1.clone());
        record.set_opt("company", self.company.clone());
        record
    }

    fn from_record(record: Record) -> Result<Self, RecordError> {
        CONTACT.check(&record)?;
        Ok(Self {
            id: record.id(),
            first_name: record.get_string("firstname")?,
            last_name: record.get_string("lastname")?,
            full_name: record.get_string("fullname")?,
            email_address1: record.get_string("emailaddress1")?,
            telephone1: record.get_string("telephone1")?,
            company: record.get_string("company")?,
            created_on: record.get_datetime("createdon")?,
            modified_on: record.get_datetime("modifiedon")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_record_skips_unset_and_read_only() {
        let mut contact = Contact::new("Bucky", "OHaire");
        contact.full_name = Some("Bucky OHaire".to_string());
        contact.created_on = Some(Utc::now());

        let record = contact.to_record();

        assert_eq!(record.logical_name(), "contact");
        assert_eq!(record.len(), 2);
        assert!(!record.contains("fullname"));
        assert!(!record.contains("createdon"));
        assert!(record.id().is_none());
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        let mut contact = Contact::new("Ian", "Garroway");
        assert_eq!(contact.display_name().as_deref(), Some("Ian Garroway"));

        contact.full_name = Some("Garroway, Ian".to_string());
        assert_eq!(contact.display_name().as_deref(), Some("Garroway, Ian"));

        assert_eq!(Contact::default().display_name(), None);
    }

    #[test]
    fn test_from_record_rejects_accounts() {
        let err = Contact::from_record(Record::new("account")).unwrap_err();
        assert!(matches!(err, RecordError::EntityMismatch { .. }));
    }
}
