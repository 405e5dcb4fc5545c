//! Dynamic records
//!
//! A [`Record`] is the untyped shape every organization connection speaks: a
//! logical name, an optional identifier, and a bag of named attribute values.
//! Absence of an attribute means "not set"; an explicit [`AttributeValue::Null`]
//! asks the platform to clear the column on update.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::RecordId;

use crate::error::RecordError;

/// A link from one record to another
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityReference {
    /// Logical name of the target entity (e.g. "contact")
    pub logical_name: String,
    /// Identifier of the target record
    pub id: RecordId,
    /// Display name of the target, when the platform supplied one
    pub name: Option<String>,
}

impl EntityReference {
    /// Creates a reference without a display name
    pub fn new(logical_name: impl Into<String>, id: RecordId) -> Self {
        Self {
            logical_name: logical_name.into(),
            id,
            name: None,
        }
    }

    /// Attaches a display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// Explicitly cleared
    Null,
    String(String),
    Integer(i64),
    Decimal(Decimal),
    Money(Decimal),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Guid(Uuid),
    /// Numeric value of a choice column
    OptionSet(i32),
    Reference(EntityReference),
}

impl AttributeValue {
    /// Short name of the value's type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Null => "null",
            AttributeValue::String(_) => "string",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::Decimal(_) => "decimal",
            AttributeValue::Money(_) => "money",
            AttributeValue::Boolean(_) => "boolean",
            AttributeValue::DateTime(_) => "datetime",
            AttributeValue::Guid(_) => "guid",
            AttributeValue::OptionSet(_) => "optionset",
            AttributeValue::Reference(_) => "reference",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttributeValue::DateTime(value)
    }
}

impl From<EntityReference> for AttributeValue {
    fn from(value: EntityReference) -> Self {
        AttributeValue::Reference(value)
    }
}

/// One row of one entity kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    logical_name: String,
    id: Option<RecordId>,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeValue>,
}

impl Record {
    /// Creates an empty record of the given entity kind
    pub fn new(logical_name: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            id: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder form of [`Record::set_id`]
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// Builder form of [`Record::set`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    /// Returns a reference to this record, if it has an identifier
    pub fn to_reference(&self) -> Option<EntityReference> {
        self.id.map(|id| EntityReference::new(self.logical_name.clone(), id))
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Sets an attribute, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Sets an attribute only when a value is present
    pub fn set_opt<V: Into<AttributeValue>>(&mut self, name: &str, value: Option<V>) {
        if let Some(value) = value {
            self.set(name, value);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Applies the attributes of `changes` on top of this record
    ///
    /// Explicit nulls remove the attribute; everything else overwrites.
    pub fn merge(&mut self, changes: &Record) {
        for (name, value) in &changes.attributes {
            if value.is_null() {
                self.attributes.remove(name);
            } else {
                self.attributes.insert(name.clone(), value.clone());
            }
        }
    }

    /// Keeps only the named attributes
    pub fn retain_columns(&mut self, columns: &[String]) {
        self.attributes.retain(|name, _| columns.iter().any(|c| c == name));
    }

    // ------------------------------------------------------------------------
    // Typed getters: Ok(None) when absent or null, Err on a type mismatch
    // ------------------------------------------------------------------------

    fn typed<T>(
        &self,
        name: &str,
        expected: &'static str,
        extract: impl FnOnce(&AttributeValue) -> Option<T>,
    ) -> Result<Option<T>, RecordError> {
        match self.attributes.get(name) {
            None | Some(AttributeValue::Null) => Ok(None),
            Some(value) => extract(value)
                .map(Some)
                .ok_or_else(|| RecordError::type_mismatch(name, expected, value.type_name())),
        }
    }

    pub fn get_string(&self, name: &str) -> Result<Option<String>, RecordError> {
        self.typed(name, "string", |v| match v {
            AttributeValue::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    pub fn get_integer(&self, name: &str) -> Result<Option<i64>, RecordError> {
        self.typed(name, "integer", |v| match v {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        })
    }

    /// Reads a money or decimal column
    pub fn get_decimal(&self, name: &str) -> Result<Option<Decimal>, RecordError> {
        self.typed(name, "decimal", |v| match v {
            AttributeValue::Decimal(d) | AttributeValue::Money(d) => Some(*d),
            _ => None,
        })
    }

    pub fn get_bool(&self, name: &str) -> Result<Option<bool>, RecordError> {
        self.typed(name, "boolean", |v| match v {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        })
    }

    pub fn get_datetime(&self, name: &str) -> Result<Option<DateTime<Utc>>, RecordError> {
        self.typed(name, "datetime", |v| match v {
            AttributeValue::DateTime(dt) => Some(*dt),
            _ => None,
        })
    }

    pub fn get_option_set(&self, name: &str) -> Result<Option<i32>, RecordError> {
        self.typed(name, "optionset", |v| match v {
            AttributeValue::OptionSet(value) => Some(*value),
            _ => None,
        })
    }

    pub fn get_reference(&self, name: &str) -> Result<Option<EntityReference>, RecordError> {
        self.typed(name, "reference", |v| match v {
            AttributeValue::Reference(r) => Some(r.clone()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_and_null_read_as_none() {
        let record = Record::new("contact").with("firstname", AttributeValue::Null);
        assert_eq!(record.get_string("firstname").unwrap(), None);
        assert_eq!(record.get_string("lastname").unwrap(), None);
    }

    #[test]
    fn test_type_mismatch() {
        let record = Record::new("contact").with("firstname", 42_i64);
        let err = record.get_string("firstname").unwrap_err();
        assert_eq!(err, RecordError::type_mismatch("firstname", "string", "integer"));
    }

    #[test]
    fn test_merge_overwrites_and_clears() {
        let mut stored = Record::new("contact")
            .with("firstname", "Bucky")
            .with("company", "RI Shipping");
        let changes = Record::new("contact")
            .with("firstname", "Buck")
            .with("company", AttributeValue::Null);

        stored.merge(&changes);

        assert_eq!(stored.get_string("firstname").unwrap().as_deref(), Some("Buck"));
        assert!(!stored.contains("company"));
    }

    #[test]
    fn test_retain_columns() {
        let mut record = Record::new("account").with("name", "A").with("telephone1", "1");
        record.retain_columns(&["name".to_string()]);
        assert_eq!(record.len(), 1);
        assert!(record.contains("name"));
    }

    #[test]
    fn test_to_reference_requires_id() {
        let record = Record::new("contact");
        assert!(record.to_reference().is_none());

        let id = RecordId::new();
        let reference = record.with_id(id).to_reference().unwrap();
        assert_eq!(reference.logical_name, "contact");
        assert_eq!(reference.id, id);
    }
}
