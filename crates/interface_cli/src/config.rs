//! Credential configuration
//!
//! Loads the four connection credentials from a JSON document:
//!
//! ```json
//! {
//!   "Resource": "https://yourorg.crm11.dynamics.com",
//!   "Secret": "<client secret>",
//!   "ClientID": "<application (client) id>",
//!   "RedirectURI": "http://localhost"
//! }
//! ```
//!
//! Keys are case-sensitive and unknown keys are ignored. Every failure is a
//! [`ConfigError`] whose display text is the console message shown to the user.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a configuration file could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error: Configuration file not found")]
    NotFound,

    #[error("Error: Invalid Json format.")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Error: Deserialization returned null. Check the JSON format or file path.")]
    NullDocument,

    #[error("Error:Value cannot be null. (Parameter '{0}') is null.")]
    MissingField(&'static str),

    #[error("Error: {0}")]
    Io(#[source] io::Error),
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(rename = "Resource")]
    resource: Option<String>,
    #[serde(rename = "Secret")]
    secret: Option<String>,
    #[serde(rename = "ClientID")]
    client_id: Option<String>,
    #[serde(rename = "RedirectURI")]
    redirect_uri: Option<String>,
}

/// Loaded credentials
///
/// Read-only once loaded.
#[derive(Clone, PartialEq, Eq)]
pub struct Configuration {
    resource: String,
    secret: String,
    client_id: String,
    redirect_uri: String,
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("resource", &self.resource)
            .field("secret", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

fn require(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value.ok_or(ConfigError::MissingField(field))
}

impl Configuration {
    /// Loads credentials from a JSON file
    ///
    /// # Errors
    ///
    /// Fields are checked in the order `Resource`, `Secret`, `ClientID`,
    /// `RedirectURI`; the first absent or null one is reported.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading configuration");

        let json = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound,
            _ => ConfigError::Io(e),
        })?;

        Self::from_json(&json)
    }

    /// Parses credentials from a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: Option<RawSettings> = serde_json::from_str(json).map_err(ConfigError::InvalidJson)?;
        let raw = raw.ok_or(ConfigError::NullDocument)?;

        Ok(Self {
            resource: require(raw.resource, "Resource")?,
            secret: require(raw.secret, "Secret")?,
            client_id: require(raw.client_id, "ClientID")?,
            redirect_uri: require(raw.redirect_uri, "RedirectURI")?,
        })
    }

    /// Environment URL
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Read but not used by the client-secret flow
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Connection descriptor for the client-secret flow
    pub fn connection_string(&self) -> String {
        format!(
            "AuthType=ClientSecret; SkipDiscovery=true; url={}; Secret={}; ClientId={}; RequireNewInstance=true",
            self.resource, self.secret, self.client_id
        )
    }
}

/// Loads credentials, writing the failure message to `out`
///
/// Returns `None` when loading failed; the message has then been written as a
/// single line.
pub fn load_or_report(path: impl AsRef<Path>, out: &mut impl Write) -> Option<Configuration> {
    match Configuration::load(path) {
        Ok(configuration) => Some(configuration),
        Err(err) => {
            warn!(error = ?err, "Configuration load failed");
            if let Err(write_err) = writeln!(out, "{}", err) {
                warn!(error = %write_err, "Could not write configuration failure");
            }
            None
        }
    }
}
