//! Connection descriptors
//!
//! Parses the `key=value; key=value` strings the configuration loader builds,
//! e.g.
//!
//! ```text
//! AuthType=ClientSecret; SkipDiscovery=true; url=https://org.crm.dynamics.com; Secret=...; ClientId=...; RequireNewInstance=true
//! ```
//!
//! Keys are case-insensitive and whitespace around keys and values is ignored.
//! A value may contain `=` but not `;`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use core_kernel::RemoteFault;

/// Authentication scheme named by `AuthType`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// OAuth2 client credentials with an application secret
    ClientSecret,
}

impl FromStr for AuthType {
    type Err = RemoteFault;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ClientSecret") {
            Ok(AuthType::ClientSecret)
        } else {
            Err(RemoteFault::validation_attribute(
                format!("Unsupported AuthType '{}'", s),
                "AuthType",
            ))
        }
    }
}

/// Parsed connection descriptor
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub auth_type: AuthType,
    /// Environment URL without a trailing slash
    pub url: String,
    pub client_id: String,
    pub secret: String,
    /// Token authority (e.g. `https://login.microsoftonline.com/<tenant>`);
    /// discovered from the environment when absent
    pub authority: Option<String>,
    pub skip_discovery: bool,
    pub require_new_instance: bool,
    /// Per-request timeout; none by default
    pub timeout: Option<Duration>,
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("auth_type", &self.auth_type)
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .field("authority", &self.authority)
            .field("skip_discovery", &self.skip_discovery)
            .field("require_new_instance", &self.require_new_instance)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, RemoteFault> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(RemoteFault::validation_attribute(
            format!("'{}' is not a valid value for {}", value, key),
            key,
        )),
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn required(value: Option<String>, key: &str) -> Result<String, RemoteFault> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| {
        RemoteFault::validation_attribute(format!("Connection string is missing '{}'", key), key)
    })
}

impl ConnectionDescriptor {
    /// Parses a descriptor string
    ///
    /// # Errors
    ///
    /// Returns a validation fault naming the key when a required key is missing
    /// or a value cannot be interpreted.
    pub fn parse(descriptor: &str) -> Result<Self, RemoteFault> {
        let mut auth_type = None;
        let mut url = None;
        let mut client_id = None;
        let mut secret = None;
        let mut authority = None;
        let mut skip_discovery = false;
        let mut require_new_instance = false;
        let mut timeout = None;

        for segment in descriptor.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                RemoteFault::validation(format!("Malformed connection string segment '{}'", segment))
            })?;
            let key = key.trim();
            let value = unquote(value.trim());

            match key.to_ascii_lowercase().as_str() {
                "authtype" => auth_type = Some(value.parse::<AuthType>()?),
                "url" | "serviceuri" | "server" => url = Some(value.trim_end_matches('/').to_string()),
                "clientid" | "appid" => client_id = Some(value.to_string()),
                "secret" | "clientsecret" => secret = Some(value.to_string()),
                "authority" => authority = Some(value.trim_end_matches('/').to_string()),
                "skipdiscovery" => skip_discovery = parse_bool("SkipDiscovery", value)?,
                "requirenewinstance" => require_new_instance = parse_bool("RequireNewInstance", value)?,
                "timeout" => {
                    let secs: u64 = value.parse().map_err(|_| {
                        RemoteFault::validation_attribute(
                            format!("'{}' is not a valid value for Timeout", value),
                            "Timeout",
                        )
                    })?;
                    timeout = Some(Duration::from_secs(secs));
                }
                other => debug!(key = other, "Ignoring unrecognized connection string key"),
            }
        }

        Ok(Self {
            auth_type: auth_type.ok_or_else(|| {
                RemoteFault::validation_attribute("Connection string is missing 'AuthType'", "AuthType")
            })?,
            url: required(url, "url")?,
            client_id: required(client_id, "ClientId")?,
            secret: required(secret, "Secret")?,
            authority,
            skip_discovery,
            require_new_instance,
            timeout,
        })
    }
}

impl FromStr for ConnectionDescriptor {
    type Err = RemoteFault;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "AuthType=ClientSecret; SkipDiscovery=true; url=https://org.crm.dynamics.com/; \
                            Secret=s3cr=t; ClientId=app-id; RequireNewInstance=true";

    #[test]
    fn test_parse_template() {
        let descriptor = ConnectionDescriptor::parse(TEMPLATE).unwrap();
        assert_eq!(descriptor.auth_type, AuthType::ClientSecret);
        assert_eq!(descriptor.url, "https://org.crm.dynamics.com");
        assert_eq!(descriptor.secret, "s3cr=t");
        assert_eq!(descriptor.client_id, "app-id");
        assert!(descriptor.skip_discovery);
        assert!(descriptor.require_new_instance);
        assert!(descriptor.authority.is_none());
        assert!(descriptor.timeout.is_none());
    }

    #[test]
    fn test_parse_multiline_and_case() {
        let descriptor = ConnectionDescriptor::parse(
            "authtype=clientsecret;\n   URL=https://org.crm.dynamics.com;\n   secret='x';\n   CLIENTID=y;\n   Timeout=30",
        )
        .unwrap();
        assert_eq!(descriptor.secret, "x");
        assert_eq!(descriptor.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_url() {
        let err = ConnectionDescriptor::parse("AuthType=ClientSecret; Secret=x; ClientId=y").unwrap_err();
        match err {
            RemoteFault::Validation { attribute, .. } => assert_eq!(attribute.as_deref(), Some("url")),
            other => panic!("Expected Validation fault, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_auth_type() {
        let err = ConnectionDescriptor::parse("AuthType=OAuth; url=u; Secret=x; ClientId=y").unwrap_err();
        assert!(err.detail().contains("OAuth"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let descriptor = ConnectionDescriptor::parse(TEMPLATE).unwrap();
        let debug = format!("{:?}", descriptor);
        assert!(!debug.contains("s3cr=t"));
        assert!(debug.contains("<redacted>"));
    }
}
