//! Case (incident) entity
//!
//! A customer service ticket raised against a contact or account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::RecordId;

use crate::error::RecordError;
use crate::record::{AttributeValue, EntityReference, Record};
use crate::schema::{
    define_option_set, AttributeDescriptor, AttributeKind, EntityDescriptor, EntitySchema,
};

pub const INCIDENT: EntityDescriptor = EntityDescriptor {
    logical_name: "incident",
    entity_set_name: "incidents",
    primary_id_attribute: "incidentid",
    primary_name_attribute: "title",
    attributes: &[
        AttributeDescriptor::writable("title", AttributeKind::String),
        AttributeDescriptor::writable("description", AttributeKind::String),
        AttributeDescriptor::writable("prioritycode", AttributeKind::OptionSet),
        AttributeDescriptor::writable("caseorigincode", AttributeKind::OptionSet),
        AttributeDescriptor::writable("statuscode", AttributeKind::OptionSet),
        AttributeDescriptor::writable(
            "customerid",
            AttributeKind::Lookup { targets: &["contact", "account"] },
        ),
        AttributeDescriptor::read_only("ticketnumber", AttributeKind::String),
        AttributeDescriptor::read_only("createdon", AttributeKind::DateTime),
        AttributeDescriptor::read_only("modifiedon", AttributeKind::DateTime),
    ],
};

define_option_set! {
    /// Case priority
    IncidentPriority, "prioritycode" {
        High = 1 => "High",
        Normal = 2 => "Normal",
        Low = 3 => "Low",
    }
}

define_option_set! {
    /// Channel the case arrived through
    CaseOrigin, "caseorigincode" {
        Phone = 1 => "Phone",
        Email = 2 => "Email",
        Web = 3 => "Web",
        Facebook = 2483 => "Facebook",
        Twitter = 3986 => "Twitter",
        IoT = 700610000 => "IoT",
    }
}

define_option_set! {
    /// Status reason of a case
    IncidentStatus, "statuscode" {
        InProgress = 1 => "In Progress",
        OnHold = 2 => "On Hold",
        WaitingForDetails = 3 => "Waiting for Details",
        Researching = 4 => "Researching",
        ProblemSolved = 5 => "Problem Solved",
        Cancelled = 6 => "Cancelled",
        InformationProvided = 1000 => "Information Provided",
        Merged = 2000 => "Merged",
    }
}

/// Typed view of an `incident` record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: Option<RecordId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority_code: Option<IncidentPriority>,
    pub case_origin_code: Option<CaseOrigin>,
    pub status_code: Option<IncidentStatus>,
    /// The contact or account the case is for
    pub customer_id: Option<EntityReference>,
    /// Assigned by the platform on create
    pub ticket_number: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    pub modified_on: Option<DateTime<Utc>>,
}

impl Incident {
    /// Creates an unsaved case for a customer
    pub fn new(title: impl Into<String>, customer: EntityReference) -> Self {
        Self {
            title: Some(title.into()),
            customer_id: Some(customer),
            ..Default::default()
        }
    }
}

fn option_value(value: Option<i32>) -> Option<AttributeValue> {
    value.map(AttributeValue::OptionSet)
}

impl EntitySchema for Incident {
    const DESCRIPTOR: &'static EntityDescriptor = &INCIDENT;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new(INCIDENT.logical_name);
        if let Some(id) = self.id {
            record.set_id(id);
        }
        record.set_opt("title", self.title.clone());
        record.set_opt("description", self.description.clone());
        record.set_opt("prioritycode", option_value(self.priority_code.map(IncidentPriority::value)));
        record.set_opt("caseorigincode", option_value(self.case_origin_code.map(CaseOrigin::value)));
        record.set_opt("statuscode", option_value(self.status_code.map(IncidentStatus::value)));
        record.set_opt("customerid", self.customer_id.clone());
        record
    }

    fn from_record(record: Record) -> Result<Self, RecordError> {
        INCIDENT.check(&record)?;
        Ok(Self {
            id: record.id(),
            title: record.get_string("title")?,
            description: record.get_string("description")?,
            priority_code: record
                .get_option_set("prioritycode")?
                .map(IncidentPriority::from_value)
                .transpose()?,
            case_origin_code: record
                .get_option_set("caseorigincode")?
                .map(CaseOrigin::from_value)
                .transpose()?,
            status_code: record
                .get_option_set("statuscode")?
                .map(IncidentStatus::from_value)
                .transpose()?,
            customer_id: record.get_reference("customerid")?,
            ticket_number: record.get_string("ticketnumber")?,
            created_on: record.get_datetime("createdon")?,
            modified_on: record.get_datetime("modifiedon")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_set_values() {
        assert_eq!(IncidentPriority::High.value(), 1);
        assert_eq!(CaseOrigin::IoT.value(), 700610000);
        assert_eq!(IncidentStatus::from_value(4).unwrap(), IncidentStatus::Researching);
        assert_eq!(IncidentStatus::WaitingForDetails.to_string(), "Waiting for Details");
    }

    #[test]
    fn test_unknown_option_value() {
        let record = Record::new("incident").with("prioritycode", AttributeValue::OptionSet(99));
        let err = Incident::from_record(record).unwrap_err();
        assert_eq!(
            err,
            RecordError::UnknownOptionValue {
                attribute: "prioritycode".to_string(),
                value: 99,
            }
        );
    }

    #[test]
    fn test_to_record_writes_option_values() {
        let customer = EntityReference::new("contact", RecordId::new());
        let incident = Incident {
            priority_code: Some(IncidentPriority::Normal),
            case_origin_code: Some(CaseOrigin::Phone),
            status_code: Some(IncidentStatus::Researching),
            ticket_number: Some("CAS-01001-X1Y2Z3".to_string()),
            ..Incident::new("Manifold Replacement", customer)
        };

        let record = incident.to_record();

        assert_eq!(record.get_option_set("prioritycode").unwrap(), Some(2));
        assert_eq!(record.get_option_set("caseorigincode").unwrap(), Some(1));
        assert_eq!(record.get_option_set("statuscode").unwrap(), Some(4));
        assert!(!record.contains("ticketnumber"));
    }
}
