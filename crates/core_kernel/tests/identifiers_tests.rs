//! Unit tests for the identifier newtypes
//!
//! Tests cover creation, parsing of the forms the platform emits,
//! conversion, and display formatting.

use core_kernel::{RecordId, UserId, BusinessUnitId, OrganizationId};
use proptest::prelude::*;
use uuid::Uuid;

mod record_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = RecordId::new();
        let id2 = RecordId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = RecordId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = RecordId::new_v7();
        assert!(id1 < id2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = RecordId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_display_is_lowercase_hyphenated() {
        let id: RecordId = "6A1B2C3D-4E5F-4071-8293-A4B5C6D7E8F9".parse().unwrap();
        assert_eq!(id.to_string(), "6a1b2c3d-4e5f-4071-8293-a4b5c6d7e8f9");
    }

    #[test]
    fn test_from_str_accepts_braces_and_whitespace() {
        let id: RecordId = " {6a1b2c3d-4e5f-4071-8293-a4b5c6d7e8f9} ".parse().unwrap();
        assert_eq!(id.to_string(), "6a1b2c3d-4e5f-4071-8293-a4b5c6d7e8f9");
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("not-a-guid".parse::<RecordId>().is_err());
        assert!("{6a1b2c3d-4e5f-4071-8293-a4b5c6d7e8f9".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_nil() {
        assert!(RecordId::from_uuid(Uuid::nil()).is_nil());
        assert!(!RecordId::new().is_nil());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = RecordId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }
}

mod principal_id_tests {
    use super::*;

    #[test]
    fn test_principal_ids_share_format() {
        let uuid = Uuid::new_v4();
        assert_eq!(UserId::from(uuid).to_string(), uuid.to_string());
        assert_eq!(BusinessUnitId::from(uuid).to_string(), uuid.to_string());
        assert_eq!(OrganizationId::from(uuid).to_string(), uuid.to_string());
    }
}

proptest! {
    #[test]
    fn prop_display_parse_roundtrip(bytes in any::<[u8; 16]>()) {
        let id = RecordId::from_uuid(Uuid::from_bytes(bytes));
        let parsed: RecordId = id.to_string().parse().unwrap();
        prop_assert_eq!(id, parsed);
    }
}
