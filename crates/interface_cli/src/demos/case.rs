use std::io::Write;

use tracing::instrument;

use domain_crm::{
    CaseOrigin, CaseService, Contact, ContactService, EntitySchema, Incident, IncidentPriority,
    IncidentStatus,
};

use super::{or_na, start_banner, timestamp};
use crate::display::display_table;
use crate::error::DemoError;

/// Case table walkthrough: a manifold replacement raised by a supporting contact
#[instrument(skip_all)]
pub async fn case_crud<W: Write>(
    cases: &CaseService,
    contacts: &ContactService,
    out: &mut W,
) -> Result<(), DemoError> {
    start_banner(out, "Case")?;

    let contact_id = contacts.create(&Contact::new("Bucky", "OHaire")).await?;
    let contact = contacts.get(contact_id).await?;

    writeln!(out, "\nBefore creation:")?;
    display_table(out, &cases.get_all().await?)?;

    writeln!(out, "Creating an Incident Case...")?;
    let customer = contact
        .to_reference()
        .ok_or_else(|| core_kernel::RemoteFault::internal("Retrieved contact carried no id"))?;
    let case = Incident {
        description: Some("Manifold in need of replacement".to_string()),
        priority_code: Some(IncidentPriority::Normal),
        case_origin_code: Some(CaseOrigin::Phone),
        status_code: Some(IncidentStatus::Researching),
        ..Incident::new("Manifold Replacement", customer)
    };
    let case_id = cases.create(&case).await?;
    writeln!(out, "Incident Case created")?;

    writeln!(out, "\nAfter Creation:")?;
    display_table(out, &cases.get_all().await?)?;

    let mut case = cases.get(case_id).await?;
    writeln!(
        out,
        "\nCase: {} priority: {} created on: {}",
        or_na(case.description.as_deref()),
        or_na(case.priority_code),
        timestamp(case.created_on)
    )?;

    writeln!(out, "Updating the Case...")?;
    case.description = Some("Manifold in DESPERATE need of replacement".to_string());
    case.priority_code = Some(IncidentPriority::High);
    cases.update(&case).await?;

    let case = cases.get(case_id).await?;
    writeln!(
        out,
        "\nCase after modification: {} priority: {} created on: {} modified on: {}",
        or_na(case.description.as_deref()),
        or_na(case.priority_code),
        timestamp(case.created_on),
        timestamp(case.modified_on)
    )?;

    writeln!(out, "\nAfter Modification: ")?;
    display_table(out, &cases.get_all().await?)?;

    cases.delete(case_id).await?;
    contacts.delete(contact_id).await?;

    writeln!(out, "\nAfter Deletion: ")?;
    display_table(out, &cases.get_all().await?)?;
    Ok(())
}
