//! Identifies the principal a connection is authenticated as

use tracing::{info, instrument};

use core_kernel::{RemoteFault, UserId};
use domain_crm::{OrganizationPort, OrganizationRequest, OrganizationResponse};

/// Executes WhoAmI and returns the calling user's id
#[instrument(skip(connection))]
pub async fn who_am_i(connection: &dyn OrganizationPort) -> Result<UserId, RemoteFault> {
    match connection.execute(OrganizationRequest::WhoAmI).await? {
        OrganizationResponse::WhoAmI(response) => {
            info!(user_id = %response.user_id, "Connected");
            Ok(response.user_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_crm::MockOrganizationPort;

    #[tokio::test]
    async fn test_who_am_i_returns_user() {
        let port = MockOrganizationPort::new();
        assert_eq!(who_am_i(&port).await.unwrap(), port.whoami().user_id);
    }
}
