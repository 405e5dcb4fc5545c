//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for records and faults that give
//! more meaningful error messages than standard assertions.

use core_kernel::RemoteFault;
use domain_crm::Contact;

/// Asserts that a fault is a NotFound fault
///
/// # Panics
///
/// Panics with the actual fault if it is any other variant
pub fn assert_not_found<T: std::fmt::Debug>(result: &Result<T, RemoteFault>) {
    match result {
        Err(RemoteFault::NotFound { .. }) => {}
        other => panic!("Expected NotFound fault, got {:?}", other),
    }
}

/// Asserts that a fault is a Validation fault naming `attribute`
pub fn assert_validation_on<T: std::fmt::Debug>(result: &Result<T, RemoteFault>, attribute: &str) {
    match result {
        Err(RemoteFault::Validation { detail, .. }) => assert!(
            detail.contains(attribute),
            "Validation detail does not mention {}: {}",
            attribute,
            detail
        ),
        other => panic!("Expected Validation fault on {}, got {:?}", attribute, other),
    }
}

/// Asserts that a retrieved contact carries the caller-set fields of `expected`
///
/// Platform-maintained fields (id, full name, timestamps) are not compared.
pub fn assert_contact_fields_eq(actual: &Contact, expected: &Contact) {
    assert_eq!(actual.first_name, expected.first_name, "first_name differs");
    assert_eq!(actual.last_name, expected.last_name, "last_name differs");
    assert_eq!(actual.email_address1, expected.email_address1, "email_address1 differs");
    assert_eq!(actual.telephone1, expected.telephone1, "telephone1 differs");
    assert_eq!(actual.company, expected.company, "company differs");
}

/// Asserts that every line of a rendered table has a `| ` separator at the
/// given byte offsets
pub fn assert_columns_at(table: &str, offsets: &[usize]) {
    for line in table.lines().filter(|l| l.contains("| ")) {
        for &offset in offsets {
            assert_eq!(
                line.get(offset..offset + 2),
                Some("| "),
                "Expected column separator at {} in {:?}",
                offset,
                line
            );
        }
    }
}
