//! Property-Based Test Generators
//!
//! Provides proptest strategies and fake-data helpers for generating contacts
//! and paging parameters.

use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use proptest::prelude::*;

use domain_crm::Contact;

/// Strategy for generating valid email addresses
pub fn email_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{5,10}", "[a-z]{3,8}")
        .prop_map(|(local, domain)| format!("{}@{}.com", local, domain))
}

/// Strategy for generating UK-style phone numbers
pub fn phone_strategy() -> impl Strategy<Value = String> {
    (1000u32..9999u32, 100u32..999u32)
        .prop_map(|(block, line)| format!("0777 {} {}", block, line))
}

/// Strategy for generating names
pub fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,10}"
}

/// Strategy for generating unsaved contacts
pub fn contact_strategy() -> impl Strategy<Value = Contact> {
    (
        name_strategy(),
        name_strategy(),
        proptest::option::of(email_strategy()),
        proptest::option::of(phone_strategy()),
    )
        .prop_map(|(first, last, email, phone)| Contact {
            email_address1: email,
            telephone1: phone,
            ..Contact::new(first, last)
        })
}

/// Strategy for a table size and page size pair
///
/// Covers empty tables, exact multiples and partial final pages.
pub fn table_and_page_strategy() -> impl Strategy<Value = (usize, u32)> {
    (0usize..60, 1u32..12)
}

/// A contact filled with realistic fake data
pub fn fake_contact() -> Contact {
    let first: String = FirstName().fake();
    let last: String = LastName().fake();
    Contact {
        email_address1: Some(SafeEmail().fake()),
        telephone1: Some(PhoneNumber().fake()),
        company: Some(CompanyName().fake()),
        ..Contact::new(first, last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn contact_strategy_always_names(contact in contact_strategy()) {
            prop_assert!(contact.first_name.is_some());
            prop_assert!(contact.last_name.is_some());
            prop_assert!(contact.id.is_none());
        }

        #[test]
        fn page_size_is_positive((_, page) in table_and_page_strategy()) {
            prop_assert!(page >= 1);
        }
    }

    #[test]
    fn fake_contact_has_display_name() {
        let contact = fake_contact();
        assert!(contact.display_name().is_some());
    }
}
