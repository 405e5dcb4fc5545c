use std::io::Write;

use tracing::instrument;

use domain_crm::{Contact, ContactService};

use super::{or_na, start_banner, timestamp};
use crate::display::display_table;
use crate::error::DemoError;

fn bucky() -> Contact {
    Contact {
        email_address1: Some("Bucky@RIShipping.com".to_string()),
        telephone1: Some("0777 2456 567".to_string()),
        company: Some("RI Shipping".to_string()),
        ..Contact::new("Bucky", "OHaire")
    }
}

/// Contact table walkthrough: create Bucky OHaire, fix the typo, delete
#[instrument(skip_all)]
pub async fn contact_crud<W: Write>(contacts: &ContactService, out: &mut W) -> Result<(), DemoError> {
    start_banner(out, "Contact")?;

    writeln!(out, "\nBefore:")?;
    display_table(out, &contacts.get_all().await?)?;

    let contact_id = contacts.create(&bucky()).await?;

    writeln!(out, "\nAfter creation")?;
    display_table(out, &contacts.get_all().await?)?;

    let mut retrieved = contacts.get(contact_id).await?;
    writeln!(
        out,
        "\nRetrieved Contact: {}: {} created on: {}",
        or_na(retrieved.id),
        or_na(retrieved.full_name.as_deref()),
        timestamp(retrieved.created_on)
    )?;

    retrieved.last_name = Some("O'Haire".to_string());
    retrieved.company = Some("RI Shipping plc".to_string());
    contacts.update(&retrieved).await?;

    let retrieved = contacts.get(contact_id).await?;
    writeln!(
        out,
        "\nRetrieved Contact after typo correction: {}: {} created on: {} modified: {}",
        or_na(retrieved.id),
        or_na(retrieved.full_name.as_deref()),
        timestamp(retrieved.created_on),
        timestamp(retrieved.modified_on)
    )?;

    writeln!(out, "\nAfter Update:")?;
    display_table(out, &contacts.get_all().await?)?;

    contacts.delete(contact_id).await?;

    writeln!(out, "\nAfter Deletion:")?;
    display_table(out, &contacts.get_all().await?)?;
    Ok(())
}
