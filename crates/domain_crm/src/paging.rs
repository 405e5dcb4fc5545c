//! Paged bulk retrieval
//!
//! The platform caps every response, so reading a whole table means asking for
//! page 1, 2, 3, ... until the platform stops setting `more_records`. Page
//! fullness is never used to detect the end: a final page may be full, and a
//! throttled page may be short while more remain.

use tracing::{debug, instrument};

use core_kernel::RemoteFault;

use crate::ports::OrganizationPort;
use crate::query::QueryExpression;
use crate::record::Record;

/// Retrieves every record matching `query`, starting at its page number
///
/// Records are returned in the order the platform served them. A fault on any
/// page aborts the whole retrieval; records from earlier pages are discarded
/// and the fault is returned unchanged.
#[instrument(skip(connection, query), fields(entity = %query.entity_name, page_size = query.page_info.count))]
pub async fn retrieve_all(
    connection: &dyn OrganizationPort,
    mut query: QueryExpression,
) -> Result<Vec<Record>, RemoteFault> {
    let mut records = Vec::new();

    loop {
        let page = connection.retrieve_multiple(&query).await?;
        debug!(
            page_number = query.page_info.page_number,
            returned = page.entities.len(),
            more_records = page.more_records,
            "Fetched page"
        );

        records.extend(page.entities);

        if !page.more_records {
            break;
        }
        query.page_info.page_number += 1;
    }

    Ok(records)
}
