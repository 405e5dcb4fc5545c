//! Console tables
//!
//! Each entity kind renders as a fixed-width table: a header line, then one
//! line per record. Columns are joined with `| `, padded on the right and never
//! truncated, so an over-long value pushes the rest of its line along. Missing
//! values print as `N/A`.

use std::io::{self, Write};

use domain_crm::{Account, Contact, Incident};

const MISSING: &str = "N/A";
const SEPARATOR: &str = "| ";

/// Writes one line per item, as produced by `selector`
pub fn display_list_by_property<T, W, F>(out: &mut W, items: &[T], selector: F) -> io::Result<()>
where
    W: Write + ?Sized,
    F: Fn(&T) -> String,
{
    for item in items {
        writeln!(out, "{}", selector(item))?;
    }
    Ok(())
}

/// A record that can be shown as a table row
pub trait TableRow {
    /// Plural noun used in the empty-table message
    const KIND: &'static str;

    /// Column titles with their widths; the last column is unpadded
    const COLUMNS: &'static [(&'static str, usize)];

    /// Cell values in column order
    fn cells(&self) -> Vec<Option<String>>;
}

fn join_padded<'a>(columns: &[(&str, usize)], values: impl Iterator<Item = &'a str>) -> String {
    let last = columns.len().saturating_sub(1);
    let mut line = String::new();
    for (i, ((_, width), value)) in columns.iter().zip(values).enumerate() {
        if i == last {
            line.push_str(value);
        } else {
            line.push_str(&format!("{:<width$}{}", value, SEPARATOR, width = *width));
        }
    }
    line
}

/// Header line of a table
pub fn header<T: TableRow>() -> String {
    join_padded(T::COLUMNS, T::COLUMNS.iter().map(|(title, _)| *title))
}

/// One row of a table
pub fn row<T: TableRow>(item: &T) -> String {
    let cells = item.cells();
    join_padded(T::COLUMNS, cells.iter().map(|c| c.as_deref().unwrap_or(MISSING)))
}

/// Writes the header and one row per item, or `No <Kind> to display`
pub fn display_table<T, W>(out: &mut W, items: &[T]) -> io::Result<()>
where
    T: TableRow,
    W: Write + ?Sized,
{
    writeln!(out, "{}", header::<T>())?;
    if items.is_empty() {
        return writeln!(out, "No {} to display", T::KIND);
    }
    display_list_by_property(out, items, row::<T>)
}

impl TableRow for Contact {
    const KIND: &'static str = "Contacts";
    const COLUMNS: &'static [(&'static str, usize)] =
        &[("Name", 25), ("Company Name", 25), ("Email", 40), ("Phone", 0)];

    fn cells(&self) -> Vec<Option<String>> {
        vec![
            self.full_name.clone(),
            self.company.clone(),
            self.email_address1.clone(),
            self.telephone1.clone(),
        ]
    }
}

impl TableRow for Account {
    const KIND: &'static str = "Accounts";
    const COLUMNS: &'static [(&'static str, usize)] = &[
        ("Account Name", 25),
        ("Phone", 15),
        ("Address", 30),
        ("City", 10),
        ("Contact", 0),
    ];

    fn cells(&self) -> Vec<Option<String>> {
        vec![
            self.name.clone(),
            self.telephone1.clone(),
            self.address1_line1.clone(),
            self.address1_city.clone(),
            self.primary_contact_id.as_ref().and_then(|c| c.name.clone()),
        ]
    }
}

impl TableRow for Incident {
    const KIND: &'static str = "Cases";
    const COLUMNS: &'static [(&'static str, usize)] = &[
        ("Title", 60),
        ("Case #", 16),
        ("Priority", 10),
        ("Origin", 10),
        ("Customer", 30),
        ("Status", 15),
        ("Created", 23),
        ("Description", 0),
    ];

    fn cells(&self) -> Vec<Option<String>> {
        vec![
            self.title.clone(),
            self.ticket_number.clone(),
            self.priority_code.map(|p| p.to_string()),
            self.case_origin_code.map(|o| o.to_string()),
            self.customer_id.as_ref().and_then(|c| c.name.clone()),
            self.status_code.map(|s| s.to_string()),
            self.created_on.map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string()),
            self.description.clone(),
        ]
    }
}
