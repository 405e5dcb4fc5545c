//! Entity schemas
//!
//! An [`EntityDescriptor`] is everything the generic machinery needs to know
//! about one entity kind: its logical name, the Web API entity set, the primary
//! id and name columns, and the typed column list. Typed views such as
//! [`Contact`](crate::Contact) implement [`EntitySchema`] to plug a descriptor
//! into [`RecordService`](crate::RecordService).

use core_kernel::RecordId;

use crate::error::RecordError;
use crate::record::{EntityReference, Record};

/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    String,
    Integer,
    Decimal,
    Money,
    Boolean,
    DateTime,
    Guid,
    OptionSet,
    /// Reference to one of the listed entity kinds
    Lookup {
        targets: &'static [&'static str],
    },
}

impl AttributeKind {
    /// True for lookups that may point at more than one entity kind
    pub fn is_polymorphic_lookup(&self) -> bool {
        matches!(self, AttributeKind::Lookup { targets } if targets.len() > 1)
    }
}

/// One column of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: &'static str,
    pub kind: AttributeKind,
    /// Platform-maintained column; never sent on create or update
    pub read_only: bool,
}

impl AttributeDescriptor {
    pub const fn writable(name: &'static str, kind: AttributeKind) -> Self {
        Self { name, kind, read_only: false }
    }

    pub const fn read_only(name: &'static str, kind: AttributeKind) -> Self {
        Self { name, kind, read_only: true }
    }
}

/// Static description of one entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Logical name (e.g. "incident")
    pub logical_name: &'static str,
    /// Web API entity set name (e.g. "incidents")
    pub entity_set_name: &'static str,
    /// Primary key column (e.g. "incidentid")
    pub primary_id_attribute: &'static str,
    /// Primary name column (e.g. "title")
    pub primary_name_attribute: &'static str,
    pub attributes: &'static [AttributeDescriptor],
}

impl EntityDescriptor {
    /// Looks up a column by name
    pub fn attribute(&self, name: &str) -> Option<&'static AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Fails unless `record` belongs to this entity kind
    pub fn check(&self, record: &Record) -> Result<(), RecordError> {
        if record.logical_name() == self.logical_name {
            Ok(())
        } else {
            Err(RecordError::EntityMismatch {
                expected: self.logical_name.to_string(),
                actual: record.logical_name().to_string(),
            })
        }
    }
}

/// A typed view over one entity kind
pub trait EntitySchema: Sized + Send + Sync + 'static {
    /// The entity kind this view maps
    const DESCRIPTOR: &'static EntityDescriptor;

    /// Identifier, once the record has been created
    fn id(&self) -> Option<RecordId>;

    /// Converts to a record carrying every writable, set column
    fn to_record(&self) -> Record;

    /// Converts from a record returned by the platform
    fn from_record(record: Record) -> Result<Self, RecordError>;

    /// Reference to this record, once it has an identifier
    fn to_reference(&self) -> Option<EntityReference> {
        self.id()
            .map(|id| EntityReference::new(Self::DESCRIPTOR.logical_name, id))
    }
}

/// Entity kinds known to this crate
pub const KNOWN_ENTITIES: &[&EntityDescriptor] = &[
    &crate::contact::CONTACT,
    &crate::account::ACCOUNT,
    &crate::incident::INCIDENT,
];

/// Finds the descriptor for a logical name
pub fn descriptor_for(logical_name: &str) -> Option<&'static EntityDescriptor> {
    KNOWN_ENTITIES
        .iter()
        .copied()
        .find(|d| d.logical_name == logical_name)
}

/// Defines a choice column enum with its numeric values and display labels
macro_rules! define_option_set {
    (
        $(#[$meta:meta])*
        $name:ident, $attribute:literal {
            $($variant:ident = $value:literal => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Column this option set belongs to
            pub const ATTRIBUTE: &'static str = $attribute;

            /// Numeric value stored by the platform
            pub fn value(self) -> i32 {
                match self {
                    $($name::$variant => $value),+
                }
            }

            /// Maps a stored value back to the enum
            pub fn from_value(value: i32) -> Result<Self, $crate::error::RecordError> {
                match value {
                    $($value => Ok($name::$variant),)+
                    other => Err($crate::error::RecordError::UnknownOptionValue {
                        attribute: $attribute.to_string(),
                        value: other,
                    }),
                }
            }

            /// Display label
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

pub(crate) use define_option_set;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_lookup() {
        let contact = descriptor_for("contact").unwrap();
        assert_eq!(contact.entity_set_name, "contacts");
        assert_eq!(contact.primary_id_attribute, "contactid");
        assert!(descriptor_for("lead").is_none());
    }

    #[test]
    fn test_check_rejects_other_kinds() {
        let account = descriptor_for("account").unwrap();
        let err = account.check(&Record::new("contact")).unwrap_err();
        assert!(matches!(err, RecordError::EntityMismatch { .. }));
    }

    #[test]
    fn test_polymorphic_lookup() {
        let incident = descriptor_for("incident").unwrap();
        let customer = incident.attribute("customerid").unwrap();
        assert!(customer.kind.is_polymorphic_lookup());

        let account = descriptor_for("account").unwrap();
        let primary_contact = account.attribute("primarycontactid").unwrap();
        assert!(!primary_contact.kind.is_polymorphic_lookup());
    }
}
