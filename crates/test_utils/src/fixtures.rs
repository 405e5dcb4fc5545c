//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the records the demos work with and for
//! configuration files. These fixtures are consistent and predictable.

use std::io::Write;

use chrono::{DateTime, TimeZone, Utc};
use core_kernel::RecordId;
use domain_crm::{
    Account, CaseOrigin, Contact, EntityReference, Incident, IncidentPriority, IncidentStatus, Record,
};
use rust_decimal_macros::dec;
use serde_json::json;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Fixture for contact test data
pub struct ContactFixtures;

impl ContactFixtures {
    /// The contact the demos create, with the last-name typo
    pub fn bucky() -> Contact {
        Contact {
            email_address1: Some("Bucky@RIShipping.com".to_string()),
            telephone1: Some("0777 2456 567".to_string()),
            company: Some("RI Shipping".to_string()),
            ..Contact::new("Bucky", "OHaire")
        }
    }

    /// A contact with every display column unset
    pub fn blank() -> Contact {
        Contact::default()
    }

    /// A contact record as the platform returns it
    pub fn stored(id: RecordId) -> Contact {
        Contact {
            id: Some(id),
            full_name: Some("Bucky OHaire".to_string()),
            created_on: Some(TimeFixtures::created()),
            modified_on: Some(TimeFixtures::created()),
            ..Self::bucky()
        }
    }
}

/// Fixture for account test data
pub struct AccountFixtures;

impl AccountFixtures {
    /// The account the demos create
    pub fn righteous_indignation(primary_contact: Option<EntityReference>) -> Account {
        Account {
            address1_line1: Some("RIShipping House".to_string()),
            address1_city: Some("Leeds".to_string()),
            telephone1: Some("0777 2456 567".to_string()),
            primary_contact_id: primary_contact,
            revenue: Some(dec!(1250000.00)),
            ..Account::new("Righteous Indignation")
        }
    }
}

/// Fixture for case test data
pub struct CaseFixtures;

impl CaseFixtures {
    /// The case the demos create
    pub fn manifold_replacement(customer: EntityReference) -> Incident {
        Incident {
            description: Some("Manifold in need of replacement".to_string()),
            priority_code: Some(IncidentPriority::Normal),
            case_origin_code: Some(CaseOrigin::Phone),
            status_code: Some(IncidentStatus::Researching),
            ..Incident::new("Manifold Replacement", customer)
        }
    }
}

/// Fixture for raw record data
pub struct RecordFixtures;

impl RecordFixtures {
    /// `n` contact records with zero-padded, ordered last names
    pub fn contacts(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                Record::new("contact")
                    .with("firstname", "Test")
                    .with("lastname", format!("Contact {:05}", i))
            })
            .collect()
    }
}

/// Fixture for timestamps
pub struct TimeFixtures;

impl TimeFixtures {
    /// A fixed creation time
    pub fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    /// A fixed record identifier
    pub fn record_id() -> RecordId {
        RecordId::from_uuid(Uuid::from_u128(0x1f2e_3d4c_5b6a_7988_9766_5544_3322_1100))
    }
}

/// Fixture for credential configuration files
pub struct ConfigFixtures;

impl ConfigFixtures {
    pub const RESOURCE: &'static str = "https://orgtest.crm11.dynamics.com";
    pub const SECRET: &'static str = "test-secret";
    pub const CLIENT_ID: &'static str = "5a9b6d1e-2c4f-4e8a-9b7c-0d1e2f3a4b5c";
    pub const REDIRECT_URI: &'static str = "http://localhost";

    /// A complete credential document
    pub fn valid_json() -> String {
        json!({
            "Resource": Self::RESOURCE,
            "Secret": Self::SECRET,
            "ClientID": Self::CLIENT_ID,
            "RedirectURI": Self::REDIRECT_URI,
        })
        .to_string()
    }

    /// A credential document with one field removed
    pub fn json_without(field: &str) -> String {
        let mut document = json!({
            "Resource": Self::RESOURCE,
            "Secret": Self::SECRET,
            "ClientID": Self::CLIENT_ID,
            "RedirectURI": Self::REDIRECT_URI,
        });
        if let Some(object) = document.as_object_mut() {
            object.remove(field);
        }
        document.to_string()
    }

    /// Writes `contents` to a temporary file that lives as long as the handle
    pub fn write(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp config file");
        file.write_all(contents.as_bytes()).expect("write temp config file");
        file
    }
}
