use std::io::Write;

use tracing::instrument;

use domain_crm::{Account, AccountService, Contact, ContactService, EntitySchema};

use super::{or_na, start_banner, timestamp};
use crate::display::display_table;
use crate::error::DemoError;

/// Account table walkthrough with a supporting primary contact
#[instrument(skip_all)]
pub async fn account_crud<W: Write>(
    accounts: &AccountService,
    contacts: &ContactService,
    out: &mut W,
) -> Result<(), DemoError> {
    start_banner(out, "Account")?;

    let contact = Contact {
        email_address1: Some("Bucky@RIShipping.com".to_string()),
        telephone1: Some("0777 2456 567".to_string()),
        ..Contact::new("Bucky", "OHaire")
    };
    let contact_id = contacts.create(&contact).await?;
    let contact = contacts.get(contact_id).await?;

    writeln!(out, "\nBefore creation:")?;
    display_table(out, &accounts.get_all().await?)?;

    writeln!(out, "Creating an Account...")?;
    let account = Account {
        address1_line1: Some("RIShipping House".to_string()),
        address1_city: Some("Leeds".to_string()),
        telephone1: Some("0777 2456 567".to_string()),
        primary_contact_id: contact.to_reference(),
        ..Account::new("Righteous Indignation")
    };
    let account_id = accounts.create(&account).await?;
    writeln!(out, "Account Created.")?;

    writeln!(out, "\nAfter Creation:")?;
    display_table(out, &accounts.get_all().await?)?;

    let mut account = accounts.get(account_id).await?;
    writeln!(
        out,
        "\nAccount: {} created on: {}",
        or_na(account.name.as_deref()),
        timestamp(account.created_on)
    )?;

    account.name = Some("Righteous Indignation plc".to_string());
    accounts.update(&account).await?;

    let account = accounts.get(account_id).await?;
    writeln!(
        out,
        "\nAccount after modification: {} created on: {} modified on: {}",
        or_na(account.name.as_deref()),
        timestamp(account.created_on),
        timestamp(account.modified_on)
    )?;
    writeln!(out, "\nAfter Update: ")?;
    display_table(out, &accounts.get_all().await?)?;

    accounts.delete(account_id).await?;
    contacts.delete(contact_id).await?;

    writeln!(out, "\nAfter Deletion: ")?;
    display_table(out, &accounts.get_all().await?)?;
    Ok(())
}
