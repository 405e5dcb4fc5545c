//! Dataverse Web API connection
//!
//! [`WebApiConnection`] implements [`OrganizationPort`] over the platform's
//! OData v4 endpoint (`<url>/api/data/v9.2`).
//!
//! # Authentication
//!
//! Only the OAuth2 client-credentials flow is supported. The token authority is
//! taken from the descriptor's `Authority` key when present; otherwise it is
//! read from the `WWW-Authenticate` challenge the environment returns to an
//! anonymous request. Tokens are cached and refreshed a minute before they
//! expire.
//!
//! # Error Handling
//!
//! Platform errors are mapped to `RemoteFault` variants, keeping the
//! `error.message` text from the response body as the detail:
//! - 404 -> `RemoteFault::NotFound`
//! - 400 -> `RemoteFault::Validation`
//! - 401/403 -> `RemoteFault::Unauthorized`
//! - 429 -> `RemoteFault::RateLimited`
//! - 5xx -> `RemoteFault::ServiceUnavailable`
//! - Timeouts -> `RemoteFault::Timeout`
//! - Unreachable host -> `RemoteFault::Connection`
//!
//! Nothing is retried.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER, WWW_AUTHENTICATE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use core_kernel::{
    BusinessUnitId, DomainPort, HealthCheckable, HealthReport, OrganizationId,
    RecordId, RemoteFault, UserId,
};

use super::connection_string::ConnectionDescriptor;
use super::odata;
use crate::ports::{OrganizationPort, OrganizationRequest, OrganizationResponse, WhoAmIResponse};
use crate::query::{ColumnSet, EntityCollection, QueryExpression};
use crate::record::Record;

/// Web API version path appended to the environment URL
pub const API_PATH: &str = "api/data/v9.2";

const SERVICE_NAME: &str = "Dataverse";
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const INCLUDE_ANNOTATIONS: &str = r#"odata.include-annotations="*""#;

/// Cached bearer token
#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WhoAmIBody {
    user_id: UserId,
    business_unit_id: BusinessUnitId,
    organization_id: OrganizationId,
}

/// Record a failed request is about, for not-found faults
#[derive(Debug, Clone, Copy)]
struct Target<'a> {
    entity: &'a str,
    id: Option<RecordId>,
}

/// Connection to one Dataverse environment
///
/// Dropping the connection releases it.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use domain_crm::adapters::WebApiConnection;
/// use domain_crm::OrganizationPort;
///
/// let connection = WebApiConnection::connect(&connection_string)?;
/// let port: Arc<dyn OrganizationPort> = Arc::new(connection);
/// ```
pub struct WebApiConnection {
    descriptor: ConnectionDescriptor,
    client: Client,
    api_base: String,
    token: RwLock<Option<AccessToken>>,
}

impl WebApiConnection {
    /// Parses a connection descriptor and opens a connection
    ///
    /// No request is made until the first operation.
    pub fn connect(descriptor: &str) -> Result<Self, RemoteFault> {
        Self::new(ConnectionDescriptor::parse(descriptor)?)
    }

    /// Opens a connection from a parsed descriptor
    pub fn new(descriptor: ConnectionDescriptor) -> Result<Self, RemoteFault> {
        let mut builder = Client::builder();
        if let Some(timeout) = descriptor.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| RemoteFault::Connection {
            message: format!("Failed to build HTTP client: {}", e),
            source: Some(Box::new(e)),
        })?;

        let api_base = format!("{}/{}", descriptor.url, API_PATH);
        info!(url = %descriptor.url, "Opened Dataverse connection");

        Ok(Self {
            descriptor,
            client,
            api_base,
            token: RwLock::new(None),
        })
    }

    /// Environment URL
    pub fn url(&self) -> &str {
        &self.descriptor.url
    }

    fn timeout_ms(&self) -> u64 {
        self.descriptor
            .timeout
            .map(|t| t.as_millis() as u64)
            .unwrap_or_default()
    }

    fn transport_fault(&self, operation: &str, err: reqwest::Error) -> RemoteFault {
        if err.is_timeout() {
            RemoteFault::Timeout {
                operation: operation.to_string(),
                duration_ms: self.timeout_ms(),
            }
        } else if err.is_decode() {
            RemoteFault::transformation(format!("{}: {}", operation, err))
        } else {
            RemoteFault::Connection {
                message: format!("{}: {}", operation, err),
                source: Some(Box::new(err)),
            }
        }
    }

    /// Returns a bearer token, acquiring a new one when the cached token is stale
    async fn access_token(&self) -> Result<String, RemoteFault> {
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.value.clone());
            }
        }

        let mut guard = self.token.write().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let token = self.acquire_token().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn acquire_token(&self) -> Result<AccessToken, RemoteFault> {
        let authority = match &self.descriptor.authority {
            Some(authority) => authority.clone(),
            None => self.discover_authority().await?,
        };

        debug!(%authority, "Requesting access token");

        let scope = format!("{}/.default", self.descriptor.url);
        let response = self
            .client
            .post(format!("{}/oauth2/v2.0/token", authority))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.descriptor.client_id.as_str()),
                ("client_secret", self.descriptor.secret.as_str()),
                ("scope", scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.transport_fault("acquire_token", e))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| e.error_description.unwrap_or(e.error))
                .unwrap_or(body);
            return Err(RemoteFault::unauthorized(detail));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| RemoteFault::transformation(format!("Failed to parse token response: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        Ok(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        })
    }

    /// Reads the authority from the environment's bearer challenge
    async fn discover_authority(&self) -> Result<String, RemoteFault> {
        let response = self
            .client
            .get(format!("{}/", self.api_base))
            .send()
            .await
            .map_err(|e| self.transport_fault("discover_authority", e))?;

        response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|h| h.to_str().ok())
            .and_then(authority_from_challenge)
            .ok_or_else(|| {
                RemoteFault::unauthorized(format!(
                    "{} did not return an authorization challenge",
                    self.descriptor.url
                ))
            })
    }

    /// Sends an authenticated request and maps non-success statuses to faults
    async fn send(&self, operation: &str, target: Target<'_>, request: RequestBuilder) -> Result<Response, RemoteFault> {
        let token = self.access_token().await?;
        let response = request
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
            .send()
            .await
            .map_err(|e| self.transport_fault(operation, e))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(fault_from_response(target, response).await)
        }
    }

    async fn json_object(&self, operation: &str, response: Response) -> Result<Map<String, Value>, RemoteFault> {
        match response.json::<Value>().await {
            Ok(Value::Object(object)) => Ok(object),
            Ok(other) => Err(RemoteFault::transformation(format!(
                "{}: expected a JSON object, got {}",
                operation, other
            ))),
            Err(e) => Err(self.transport_fault(operation, e)),
        }
    }

    fn record_url(&self, entity_set: &str, id: RecordId) -> String {
        format!("{}/{}({})", self.api_base, entity_set, id)
    }
}

/// Extracts `authorization_uri` from a `WWW-Authenticate: Bearer ...` challenge
///
/// The authority is the URI without its `/oauth2/authorize` suffix.
fn authority_from_challenge(challenge: &str) -> Option<String> {
    let params = challenge.trim().strip_prefix("Bearer")?;
    params
        .split(',')
        .filter_map(|p| p.trim().split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("authorization_uri"))
        .map(|(_, v)| v.trim().trim_matches('"'))
        .map(|uri| {
            uri.trim_end_matches('/')
                .trim_end_matches("/oauth2/authorize")
                .to_string()
        })
}

fn retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

async fn fault_from_response(target: Target<'_>, response: Response) -> RemoteFault {
    let status = response.status();
    let retry_after_secs = retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();

    let detail = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            }
        });

    warn!(status = status.as_u16(), entity = target.entity, %detail, "Request failed");

    match status {
        StatusCode::NOT_FOUND => RemoteFault::not_found(
            target.entity,
            target.id.map(|id| id.to_string()).unwrap_or_default(),
            detail,
        ),
        StatusCode::BAD_REQUEST => RemoteFault::validation(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteFault::unauthorized(detail),
        StatusCode::TOO_MANY_REQUESTS => RemoteFault::RateLimited { retry_after_secs },
        s if s.is_server_error() => RemoteFault::ServiceUnavailable {
            service: SERVICE_NAME.to_string(),
            detail,
        },
        _ => RemoteFault::internal(format!("{}: {}", status, detail)),
    }
}

impl DomainPort for WebApiConnection {}

#[async_trait]
impl HealthCheckable for WebApiConnection {
    /// WhoAmI round trip
    async fn health_check(&self) -> HealthReport {
        let start = Instant::now();
        let outcome = self.execute(OrganizationRequest::WhoAmI).await;
        let latency_ms = start.elapsed().as_millis() as u64;
        HealthReport::from_probe(self.descriptor.url.clone(), &outcome, latency_ms)
    }
}

#[async_trait]
impl OrganizationPort for WebApiConnection {
    #[instrument(skip(self, record), fields(entity = %record.logical_name()))]
    async fn create(&self, record: &Record) -> Result<RecordId, RemoteFault> {
        let descriptor = odata::descriptor(record.logical_name())?;
        let body = odata::to_payload(descriptor, record, true)?;
        let target = Target { entity: descriptor.logical_name, id: None };

        let request = self
            .client
            .post(format!("{}/{}", self.api_base, descriptor.entity_set_name))
            .json(&body);
        let response = self.send("create", target, request).await?;

        let entity_url = response
            .headers()
            .get("OData-EntityId")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| RemoteFault::transformation("Create response carried no OData-EntityId header"))?;
        let id = odata::id_from_entity_url(entity_url)?;

        debug!(%id, "Created record");
        Ok(id)
    }

    #[instrument(skip(self, columns))]
    async fn retrieve(
        &self,
        entity_name: &str,
        id: RecordId,
        columns: &ColumnSet,
    ) -> Result<Record, RemoteFault> {
        let descriptor = odata::descriptor(entity_name)?;
        let target = Target { entity: descriptor.logical_name, id: Some(id) };

        let mut request = self
            .client
            .get(self.record_url(descriptor.entity_set_name, id))
            .header("Prefer", INCLUDE_ANNOTATIONS);
        if let Some(select) = odata::select_clause(descriptor, columns) {
            request = request.query(&[("$select", select)]);
        }

        let response = self.send("retrieve", target, request).await?;
        let row = self.json_object("retrieve", response).await?;
        odata::from_payload(descriptor, &row)
    }

    #[instrument(skip(self, query), fields(entity = %query.entity_name, page = query.page_info.page_number))]
    async fn retrieve_multiple(&self, query: &QueryExpression) -> Result<EntityCollection, RemoteFault> {
        let descriptor = odata::descriptor(&query.entity_name)?;
        let target = Target { entity: descriptor.logical_name, id: None };

        let request = self
            .client
            .get(format!("{}/{}", self.api_base, descriptor.entity_set_name))
            .query(&[("fetchXml", odata::fetch_xml(query))])
            .header("Prefer", INCLUDE_ANNOTATIONS);

        let response = self.send("retrieve_multiple", target, request).await?;
        let body = self.json_object("retrieve_multiple", response).await?;

        let rows = match body.get("value") {
            Some(Value::Array(rows)) => rows,
            _ => return Err(RemoteFault::transformation("retrieve_multiple: response carried no value array")),
        };

        let entities = rows
            .iter()
            .map(|row| match row {
                Value::Object(row) => odata::from_payload(descriptor, row),
                other => Err(RemoteFault::transformation(format!(
                    "retrieve_multiple: expected a row object, got {}",
                    other
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let more_records = body
            .get(odata::MORE_RECORDS)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(EntityCollection {
            entity_name: descriptor.logical_name.to_string(),
            entities,
            more_records,
        })
    }

    #[instrument(skip(self, record), fields(entity = %record.logical_name(), id = ?record.id()))]
    async fn update(&self, record: &Record) -> Result<(), RemoteFault> {
        let descriptor = odata::descriptor(record.logical_name())?;
        let id = record.id().ok_or_else(|| {
            RemoteFault::validation_attribute(
                format!("{} must carry its identifier to be updated", descriptor.logical_name),
                descriptor.primary_id_attribute,
            )
        })?;
        let body = odata::to_payload(descriptor, record, false)?;
        let target = Target { entity: descriptor.logical_name, id: Some(id) };

        // If-Match keeps PATCH from creating the record when it does not exist
        let request = self
            .client
            .patch(self.record_url(descriptor.entity_set_name, id))
            .header("If-Match", "*")
            .json(&body);
        self.send("update", target, request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, entity_name: &str, id: RecordId) -> Result<(), RemoteFault> {
        let descriptor = odata::descriptor(entity_name)?;
        let target = Target { entity: descriptor.logical_name, id: Some(id) };

        let request = self.client.delete(self.record_url(descriptor.entity_set_name, id));
        self.send("delete", target, request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn execute(&self, request: OrganizationRequest) -> Result<OrganizationResponse, RemoteFault> {
        match request {
            OrganizationRequest::WhoAmI => {
                let target = Target { entity: "WhoAmI", id: None };
                let response = self
                    .send("WhoAmI", target, self.client.get(format!("{}/WhoAmI", self.api_base)))
                    .await?;
                let body: WhoAmIBody = response
                    .json()
                    .await
                    .map_err(|e| self.transport_fault("WhoAmI", e))?;

                Ok(OrganizationResponse::WhoAmI(WhoAmIResponse {
                    user_id: body.user_id,
                    business_unit_id: body.business_unit_id,
                    organization_id: body.organization_id,
                }))
            }
        }
    }
}

impl std::fmt::Debug for WebApiConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebApiConnection")
            .field("descriptor", &self.descriptor)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl Drop for WebApiConnection {
    fn drop(&mut self) {
        debug!(url = %self.descriptor.url, "Released Dataverse connection");
    }
}
