//! Web API connection tests against a local HTTP double

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use core_kernel::{RecordId, RemoteFault};
use domain_crm::adapters::{fetch_xml, WebApiConnection};
use domain_crm::{
    Account, AccountService, ColumnSet, Contact, ContactService, EntityReference, OrganizationPort,
    OrganizationRequest, OrganizationResponse, QueryExpression,
};

const TOKEN_PATH: &str = "/tenant/oauth2/v2.0/token";

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "test-token"
        })))
        .mount(server)
        .await;
}

fn connection(server: &MockServer) -> WebApiConnection {
    WebApiConnection::connect(&format!(
        "AuthType=ClientSecret; url={uri}; ClientId=app-id; Secret=app-secret; Authority={uri}/tenant",
        uri = server.uri()
    ))
    .unwrap()
}

// ============================================================================
// Authentication Tests
// ============================================================================

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_token_is_cached_across_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "expires_in": 3599,
                "access_token": "test-token"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/WhoAmI"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "BusinessUnitId": RecordId::new().to_string(),
                "UserId": "6f1c8a2e-0000-4000-8000-000000000001",
                "OrganizationId": RecordId::new().to_string()
            })))
            .expect(2)
            .mount(&server)
            .await;

        let connection = connection(&server);
        for _ in 0..2 {
            let OrganizationResponse::WhoAmI(response) =
                connection.execute(OrganizationRequest::WhoAmI).await.unwrap();
            assert_eq!(response.user_id.to_string(), "6f1c8a2e-0000-4000-8000-000000000001");
        }
    }

    #[tokio::test]
    async fn test_authority_discovered_from_challenge() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/"))
            .respond_with(ResponseTemplate::new(401).insert_header(
                "WWW-Authenticate",
                format!(
                    "Bearer authorization_uri={}/tenant/oauth2/authorize, resource_id={}/",
                    server.uri(),
                    server.uri()
                )
                .as_str(),
            ))
            .expect(1)
            .mount(&server)
            .await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/WhoAmI"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "BusinessUnitId": RecordId::new().to_string(),
                "UserId": RecordId::new().to_string(),
                "OrganizationId": RecordId::new().to_string()
            })))
            .mount(&server)
            .await;

        let connection = WebApiConnection::connect(&format!(
            "AuthType=ClientSecret; SkipDiscovery=true; url={}; Secret=s; ClientId=c; RequireNewInstance=true",
            server.uri()
        ))
        .unwrap();

        assert!(connection.execute(OrganizationRequest::WhoAmI).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .mount(&server)
            .await;

        let err = connection(&server)
            .execute(OrganizationRequest::WhoAmI)
            .await
            .unwrap_err();

        match err {
            RemoteFault::Unauthorized { detail } => assert!(detail.contains("AADSTS7000215")),
            other => panic!("Expected Unauthorized fault, got {other:?}"),
        }
    }
}

// ============================================================================
// Record Operation Tests
// ============================================================================

mod record_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_reads_entity_id_header() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        let id = RecordId::new();
        Mock::given(method("POST"))
            .and(path("/api/data/v9.2/contacts"))
            .and(body_partial_json(json!({ "firstname": "Bucky", "lastname": "OHaire" })))
            .respond_with(ResponseTemplate::new(204).insert_header(
                "OData-EntityId",
                format!("{}/api/data/v9.2/contacts({})", server.uri(), id).as_str(),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let contacts = ContactService::new(std::sync::Arc::new(connection(&server)));
        let created = contacts.create(&Contact::new("Bucky", "OHaire")).await.unwrap();

        assert_eq!(created, id);
    }

    #[tokio::test]
    async fn test_create_binds_lookup() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        let contact_id = RecordId::new();
        let account_id = RecordId::new();
        Mock::given(method("POST"))
            .and(path("/api/data/v9.2/accounts"))
            .and(body_partial_json(json!({
                "name": "Righteous Indignation",
                "primarycontactid@odata.bind": format!("/contacts({})", contact_id)
            })))
            .respond_with(ResponseTemplate::new(204).insert_header(
                "OData-EntityId",
                format!("{}/api/data/v9.2/accounts({})", server.uri(), account_id).as_str(),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let accounts = AccountService::new(std::sync::Arc::new(connection(&server)));
        let account = Account {
            primary_contact_id: Some(EntityReference::new("contact", contact_id)),
            ..Account::new("Righteous Indignation")
        };

        assert_eq!(accounts.create(&account).await.unwrap(), account_id);
    }

    #[tokio::test]
    async fn test_retrieve_maps_lookup_annotations() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        let account_id = RecordId::new();
        let contact_id = RecordId::new();
        Mock::given(method("GET"))
            .and(path(format!("/api/data/v9.2/accounts({})", account_id)))
            .and(header("Prefer", r#"odata.include-annotations="*""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accountid": account_id.to_string(),
                "name": "Righteous Indignation",
                "revenue": 1250000.5,
                "_primarycontactid_value": contact_id.to_string(),
                "_primarycontactid_value@Microsoft.Dynamics.CRM.lookuplogicalname": "contact",
                "_primarycontactid_value@OData.Community.Display.V1.FormattedValue": "Bucky OHaire",
                "createdon": "2024-05-01T09:30:00Z",
                "modifiedon": "2024-05-01T09:30:00Z"
            })))
            .mount(&server)
            .await;

        let accounts = AccountService::new(std::sync::Arc::new(connection(&server)));
        let account = accounts.get(account_id).await.unwrap();

        assert_eq!(account.id, Some(account_id));
        assert_eq!(account.name.as_deref(), Some("Righteous Indignation"));
        assert_eq!(account.revenue, Some(rust_decimal_macros::dec!(1250000.5)));
        let primary = account.primary_contact_id.unwrap();
        assert_eq!(primary.id, contact_id);
        assert_eq!(primary.name.as_deref(), Some("Bucky OHaire"));
        assert!(account.created_on.is_some());
    }

    #[tokio::test]
    async fn test_retrieve_selects_columns() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        let id = RecordId::new();
        Mock::given(method("GET"))
            .and(path(format!("/api/data/v9.2/contacts({})", id)))
            .and(query_param("$select", "contactid,fullname"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contactid": id.to_string(),
                "fullname": "Bucky OHaire"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = connection(&server)
            .retrieve("contact", id, &ColumnSet::columns(["fullname"]))
            .await
            .unwrap();

        assert_eq!(record.get_string("fullname").unwrap().as_deref(), Some("Bucky OHaire"));
    }

    #[tokio::test]
    async fn test_update_patches_with_if_match() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        let id = RecordId::new();
        Mock::given(method("PATCH"))
            .and(path(format!("/api/data/v9.2/contacts({})", id)))
            .and(header("If-Match", "*"))
            .and(body_partial_json(json!({ "lastname": "O'Haire" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let contacts = ContactService::new(std::sync::Arc::new(connection(&server)));
        let contact = Contact {
            id: Some(id),
            last_name: Some("O'Haire".to_string()),
            ..Contact::default()
        };

        contacts.update(&contact).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_record_is_not_found() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        let id = RecordId::new();
        let message = format!("contact With Id = {} Does Not Exist", id);
        Mock::given(method("DELETE"))
            .and(path(format!("/api/data/v9.2/contacts({})", id)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "0x80040217", "message": message }
            })))
            .mount(&server)
            .await;

        let contacts = ContactService::new(std::sync::Arc::new(connection(&server)));
        let err = contacts.delete(id).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.detail(), message);
    }
}

// ============================================================================
// Paging and Fault Mapping Tests
// ============================================================================

mod paging_tests {
    use super::*;

    fn contact_row(name: &str) -> serde_json::Value {
        json!({ "contactid": RecordId::new().to_string(), "lastname": name })
    }

    #[tokio::test]
    async fn test_get_all_follows_more_records() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        let mut first = QueryExpression::new("contact").with_page_size(2);
        let mut second = first.clone();
        second.page_info.page_number = 2;
        first.page_info.page_number = 1;

        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/contacts"))
            .and(query_param("fetchXml", fetch_xml(&first)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [contact_row("A"), contact_row("B")],
                "@Microsoft.Dynamics.CRM.morerecords": true
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/contacts"))
            .and(query_param("fetchXml", fetch_xml(&second)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [contact_row("C")],
                "@Microsoft.Dynamics.CRM.morerecords": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let contacts = ContactService::new(std::sync::Arc::new(connection(&server))).with_page_size(2);
        let all = contacts.get_all().await.unwrap();

        let names: Vec<_> = all.iter().filter_map(|c| c.last_name.as_deref()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_throttling_maps_to_rate_limited() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/contacts"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
            .mount(&server)
            .await;

        let err = ContactService::new(std::sync::Arc::new(connection(&server)))
            .get_all()
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteFault::RateLimited { retry_after_secs: 12 }));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_service_unavailable() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/contacts"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "code": "0x80040216", "message": "Generic SQL error." }
            })))
            .mount(&server)
            .await;

        let err = ContactService::new(std::sync::Arc::new(connection(&server)))
            .get_all()
            .await
            .unwrap_err();

        match err {
            RemoteFault::ServiceUnavailable { detail, .. } => assert_eq!(detail, "Generic SQL error."),
            other => panic!("Expected ServiceUnavailable fault, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_request_maps_to_validation() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/data/v9.2/accounts"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": "0x80040203", "message": "Attribute 'name' cannot be NULL" }
            })))
            .mount(&server)
            .await;

        let err = connection(&server)
            .create(&domain_crm::Record::new("account"))
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteFault::Validation { .. }));
        assert!(err.detail().contains("cannot be NULL"));
    }

    #[tokio::test]
    async fn test_unknown_entity_is_rejected_locally() {
        let server = MockServer::start().await;
        let err = connection(&server)
            .retrieve_multiple(&QueryExpression::new("opportunity"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteFault::Validation { .. }));
    }
}

// ============================================================================
// Health Tests
// ============================================================================

mod health_tests {
    use super::*;
    use core_kernel::{ConnectionHealth, HealthCheckable};

    #[tokio::test]
    async fn test_whoami_success_is_healthy() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/WhoAmI"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "BusinessUnitId": RecordId::new().to_string(),
                "UserId": RecordId::new().to_string(),
                "OrganizationId": RecordId::new().to_string()
            })))
            .mount(&server)
            .await;

        let report = connection(&server).health_check().await;

        assert_eq!(report.status, ConnectionHealth::Healthy);
        assert_eq!(report.connection, server.uri());
        assert!(report.detail.is_none());
    }

    #[tokio::test]
    async fn test_throttled_probe_is_degraded() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/WhoAmI"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let report = connection(&server).health_check().await;
        assert_eq!(report.status, ConnectionHealth::Degraded);
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_unhealthy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .mount(&server)
            .await;

        let report = connection(&server).health_check().await;

        assert_eq!(report.status, ConnectionHealth::Unhealthy);
        assert!(report.detail.unwrap().contains("AADSTS7000215"));
    }
}
