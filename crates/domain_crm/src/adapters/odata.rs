//! Mapping between [`Record`]s and Web API JSON payloads
//!
//! Writes follow the Web API conventions: lookups are bound through
//! `<navigation>@odata.bind` with a `/<entityset>(<id>)` path, and polymorphic
//! lookups name their target in the navigation property (`customerid_contact`).
//! Reads take lookups from the `_<name>_value` column and its
//! `lookuplogicalname` and `FormattedValue` annotations, which the platform only
//! returns when asked with `Prefer: odata.include-annotations="*"`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use core_kernel::{RecordId, RemoteFault};

use crate::query::{ColumnSet, QueryExpression};
use crate::record::{AttributeValue, EntityReference, Record};
use crate::schema::{descriptor_for, AttributeDescriptor, AttributeKind, EntityDescriptor};

pub(crate) const LOOKUP_LOGICAL_NAME: &str = "@Microsoft.Dynamics.CRM.lookuplogicalname";
pub(crate) const FORMATTED_VALUE: &str = "@OData.Community.Display.V1.FormattedValue";
pub(crate) const MORE_RECORDS: &str = "@Microsoft.Dynamics.CRM.morerecords";

/// Resolves a logical name to its descriptor or fails with a validation fault
pub(crate) fn descriptor(logical_name: &str) -> Result<&'static EntityDescriptor, RemoteFault> {
    descriptor_for(logical_name).ok_or_else(|| {
        RemoteFault::validation(format!(
            "The entity with a name = '{}' was not found in the MetadataCache.",
            logical_name
        ))
    })
}

fn lookup_value_column(name: &str) -> String {
    format!("_{}_value", name)
}

/// Column names to `$select` for a single-record retrieve
///
/// Returns `None` for [`ColumnSet::All`].
pub(crate) fn select_clause(descriptor: &EntityDescriptor, columns: &ColumnSet) -> Option<String> {
    let ColumnSet::Columns(names) = columns else {
        return None;
    };

    let mut select = vec![descriptor.primary_id_attribute.to_string()];
    for name in names {
        let column = match descriptor.attribute(name).map(|a| a.kind) {
            Some(AttributeKind::Lookup { .. }) => lookup_value_column(name),
            _ => name.clone(),
        };
        if !select.contains(&column) {
            select.push(column);
        }
    }
    Some(select.join(","))
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Builds the FetchXML for one page of `query`
pub fn fetch_xml(query: &QueryExpression) -> String {
    let mut xml = format!(
        r#"<fetch version="1.0" mapping="logical" page="{}" count="{}"><entity name="{}">"#,
        query.page_info.page_number,
        query.page_info.count,
        escape_xml(&query.entity_name)
    );

    match &query.column_set {
        ColumnSet::All => xml.push_str("<all-attributes />"),
        ColumnSet::Columns(names) => {
            for name in names {
                xml.push_str(&format!(r#"<attribute name="{}" />"#, escape_xml(name)));
            }
        }
    }

    xml.push_str("</entity></fetch>");
    xml
}

/// Written from the decimal's own digits, so every stored place survives
fn decimal_number(attribute: &str, value: Decimal) -> Result<Value, RemoteFault> {
    Number::from_str(&value.to_string())
        .map(Value::Number)
        .map_err(|_| RemoteFault::transformation(format!("{} is not representable: {}", attribute, value)))
}

fn bind_path(reference: &EntityReference) -> Result<String, RemoteFault> {
    let target = descriptor(&reference.logical_name)?;
    Ok(format!("/{}({})", target.entity_set_name, reference.id))
}

fn navigation_property(attribute: Option<&AttributeDescriptor>, name: &str, target: &str) -> String {
    match attribute {
        Some(a) if a.kind.is_polymorphic_lookup() => format!("{}_{}", name, target),
        _ => name.to_string(),
    }
}

/// Builds the body for a create or update
///
/// Read-only columns are skipped. The primary id is only written when
/// `include_id` is set (create with a caller-chosen id).
pub(crate) fn to_payload(
    descriptor: &EntityDescriptor,
    record: &Record,
    include_id: bool,
) -> Result<Map<String, Value>, RemoteFault> {
    let mut body = Map::new();

    if include_id {
        if let Some(id) = record.id() {
            body.insert(descriptor.primary_id_attribute.to_string(), Value::String(id.to_string()));
        }
    }

    for (name, value) in record.attributes() {
        let attribute = descriptor.attribute(name);
        if attribute.is_some_and(|a| a.read_only) {
            continue;
        }

        match value {
            AttributeValue::Reference(reference) => {
                let property = navigation_property(attribute, name, &reference.logical_name);
                body.insert(format!("{}@odata.bind", property), Value::String(bind_path(reference)?));
            }
            AttributeValue::Null => match attribute.map(|a| a.kind) {
                Some(AttributeKind::Lookup { targets }) => {
                    // Clearing a polymorphic lookup goes through any of its navigation properties
                    let target = targets.first().copied().unwrap_or_default();
                    let property = navigation_property(attribute, name, target);
                    body.insert(format!("{}@odata.bind", property), Value::Null);
                }
                _ => {
                    body.insert(name.to_string(), Value::Null);
                }
            },
            AttributeValue::String(s) => {
                body.insert(name.to_string(), Value::String(s.clone()));
            }
            AttributeValue::Integer(i) => {
                body.insert(name.to_string(), Value::from(*i));
            }
            AttributeValue::Decimal(d) | AttributeValue::Money(d) => {
                body.insert(name.to_string(), decimal_number(name, *d)?);
            }
            AttributeValue::Boolean(b) => {
                body.insert(name.to_string(), Value::Bool(*b));
            }
            AttributeValue::DateTime(dt) => {
                body.insert(name.to_string(), Value::String(dt.to_rfc3339()));
            }
            AttributeValue::Guid(g) => {
                body.insert(name.to_string(), Value::String(g.to_string()));
            }
            AttributeValue::OptionSet(o) => {
                body.insert(name.to_string(), Value::from(*o));
            }
        }
    }

    Ok(body)
}

fn mismatch(entity: &str, name: &str, expected: &str, value: &Value) -> RemoteFault {
    RemoteFault::transformation(format!(
        "{}.{}: expected {}, got {}",
        entity, name, expected, value
    ))
}

fn parse_value(entity: &str, name: &str, kind: AttributeKind, value: &Value) -> Result<AttributeValue, RemoteFault> {
    let bad = || mismatch(entity, name, kind_label(kind), value);

    Ok(match kind {
        AttributeKind::String => AttributeValue::String(value.as_str().ok_or_else(bad)?.to_string()),
        AttributeKind::Integer => AttributeValue::Integer(value.as_i64().ok_or_else(bad)?),
        AttributeKind::Decimal | AttributeKind::Money => {
            let Value::Number(number) = value else {
                return Err(bad());
            };
            // Digits as they arrived on the wire
            let text = number.as_str();
            let decimal = Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .map_err(|_| bad())?;
            if kind == AttributeKind::Money {
                AttributeValue::Money(decimal)
            } else {
                AttributeValue::Decimal(decimal)
            }
        }
        AttributeKind::Boolean => AttributeValue::Boolean(value.as_bool().ok_or_else(bad)?),
        AttributeKind::DateTime => {
            let text = value.as_str().ok_or_else(bad)?;
            let parsed = DateTime::parse_from_rfc3339(text).map_err(|_| bad())?;
            AttributeValue::DateTime(parsed.with_timezone(&Utc))
        }
        AttributeKind::Guid => {
            let text = value.as_str().ok_or_else(bad)?;
            AttributeValue::Guid(Uuid::parse_str(text).map_err(|_| bad())?)
        }
        AttributeKind::OptionSet => {
            let raw = value.as_i64().ok_or_else(bad)?;
            AttributeValue::OptionSet(i32::try_from(raw).map_err(|_| bad())?)
        }
        AttributeKind::Lookup { .. } => return Err(bad()),
    })
}

fn kind_label(kind: AttributeKind) -> &'static str {
    match kind {
        AttributeKind::String => "string",
        AttributeKind::Integer => "integer",
        AttributeKind::Decimal => "decimal",
        AttributeKind::Money => "money",
        AttributeKind::Boolean => "boolean",
        AttributeKind::DateTime => "datetime",
        AttributeKind::Guid => "guid",
        AttributeKind::OptionSet => "optionset",
        AttributeKind::Lookup { .. } => "lookup",
    }
}

fn parse_lookup(
    entity: &str,
    name: &str,
    targets: &[&str],
    row: &Map<String, Value>,
) -> Result<Option<AttributeValue>, RemoteFault> {
    let column = lookup_value_column(name);
    let value = match row.get(&column) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };

    let id = value
        .as_str()
        .and_then(|s| RecordId::from_str(s).ok())
        .ok_or_else(|| mismatch(entity, name, "lookup", value))?;

    let logical_name = row
        .get(&format!("{}{}", column, LOOKUP_LOGICAL_NAME))
        .and_then(Value::as_str)
        .or_else(|| targets.first().copied())
        .ok_or_else(|| mismatch(entity, name, "lookup", value))?;

    let mut reference = EntityReference::new(logical_name, id);
    if let Some(display) = row
        .get(&format!("{}{}", column, FORMATTED_VALUE))
        .and_then(Value::as_str)
    {
        reference = reference.with_name(display);
    }

    Ok(Some(AttributeValue::Reference(reference)))
}

/// Maps one row returned by the platform into a [`Record`]
///
/// Only the descriptor's columns are read; annotations and columns this crate
/// does not model are ignored. Null columns are left unset.
pub(crate) fn from_payload(descriptor: &EntityDescriptor, row: &Map<String, Value>) -> Result<Record, RemoteFault> {
    let entity = descriptor.logical_name;
    let mut record = Record::new(entity);

    if let Some(value) = row.get(descriptor.primary_id_attribute) {
        let id = value
            .as_str()
            .and_then(|s| RecordId::from_str(s).ok())
            .ok_or_else(|| mismatch(entity, descriptor.primary_id_attribute, "guid", value))?;
        record.set_id(id);
    }

    for attribute in descriptor.attributes {
        let parsed = match attribute.kind {
            AttributeKind::Lookup { targets } => parse_lookup(entity, attribute.name, targets, row)?,
            kind => match row.get(attribute.name) {
                None | Some(Value::Null) => None,
                Some(value) => Some(parse_value(entity, attribute.name, kind, value)?),
            },
        };
        if let Some(value) = parsed {
            record.set(attribute.name, value);
        }
    }

    Ok(record)
}

/// Extracts the record id from an `OData-EntityId` header value
///
/// The header carries the new record's URL, e.g.
/// `https://org.crm.dynamics.com/api/data/v9.2/contacts(00000000-0000-0000-0000-000000000001)`.
pub(crate) fn id_from_entity_url(url: &str) -> Result<RecordId, RemoteFault> {
    url.rfind('(')
        .and_then(|open| {
            let rest = &url[open + 1..];
            rest.find(')').map(|close| &rest[..close])
        })
        .and_then(|id| RecordId::from_str(id).ok())
        .ok_or_else(|| RemoteFault::transformation(format!("No record id in OData-EntityId '{}'", url)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::ACCOUNT;
    use crate::incident::INCIDENT;
    use serde_json::json;

    #[test]
    fn test_fetch_xml_all_attributes() {
        let mut query = QueryExpression::new("contact").with_page_size(50);
        query.page_info.page_number = 3;
        assert_eq!(
            fetch_xml(&query),
            r#"<fetch version="1.0" mapping="logical" page="3" count="50"><entity name="contact"><all-attributes /></entity></fetch>"#
        );
    }

    #[test]
    fn test_select_uses_lookup_value_column() {
        let select = select_clause(&ACCOUNT, &ColumnSet::columns(["name", "primarycontactid"])).unwrap();
        assert_eq!(select, "accountid,name,_primarycontactid_value");
        assert!(select_clause(&ACCOUNT, &ColumnSet::All).is_none());
    }

    #[test]
    fn test_polymorphic_bind() {
        let customer = RecordId::new();
        let record = Record::new("incident")
            .with("title", "Manifold Replacement")
            .with("customerid", EntityReference::new("account", customer))
            .with("ticketnumber", "CAS-01000");

        let body = to_payload(&INCIDENT, &record, false).unwrap();

        assert_eq!(body["customerid_account@odata.bind"], json!(format!("/accounts({})", customer)));
        assert!(!body.contains_key("ticketnumber"));
        assert_eq!(body["title"], json!("Manifold Replacement"));
    }

    #[test]
    fn test_read_lookup_annotations() {
        let id = RecordId::new();
        let contact = RecordId::new();
        let row = json!({
            "incidentid": id.to_string(),
            "title": "Manifold Replacement",
            "prioritycode": 2,
            "_customerid_value": contact.to_string(),
            "_customerid_value@Microsoft.Dynamics.CRM.lookuplogicalname": "contact",
            "_customerid_value@OData.Community.Display.V1.FormattedValue": "Bucky O'Haire",
            "createdon": "2024-05-01T10:00:00Z",
            "description": null
        });

        let record = from_payload(&INCIDENT, row.as_object().unwrap()).unwrap();

        assert_eq!(record.id(), Some(id));
        assert_eq!(record.get_option_set("prioritycode").unwrap(), Some(2));
        let customer = record.get_reference("customerid").unwrap().unwrap();
        assert_eq!(customer.logical_name, "contact");
        assert_eq!(customer.id, contact);
        assert_eq!(customer.name.as_deref(), Some("Bucky O'Haire"));
        assert!(!record.contains("description"));
    }

    #[test]
    fn test_read_type_mismatch() {
        let row = json!({ "title": 42 });
        let err = from_payload(&INCIDENT, row.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, RemoteFault::Transformation { .. }));
    }

    #[test]
    fn test_id_from_entity_url() {
        let id = RecordId::new();
        let url = format!("https://org.crm.dynamics.com/api/data/v9.2/contacts({})", id);
        assert_eq!(id_from_entity_url(&url).unwrap(), id);
        assert!(id_from_entity_url("https://org.crm.dynamics.com/api/data/v9.2/contacts").is_err());
    }

    #[test]
    fn test_money_keeps_every_place_over_the_wire() {
        let revenue = rust_decimal_macros::dec!(12345678901234.5678);
        let record = Record::new("account")
            .with("name", "Righteous Indignation")
            .with("revenue", AttributeValue::Money(revenue));

        let wire = Value::Object(to_payload(&ACCOUNT, &record, false).unwrap()).to_string();
        assert!(wire.contains("\"revenue\":12345678901234.5678"));

        let row: Map<String, Value> = serde_json::from_str(&wire).unwrap();
        let back = from_payload(&ACCOUNT, &row).unwrap();
        assert_eq!(back.get("revenue"), Some(&AttributeValue::Money(revenue)));
    }
}
