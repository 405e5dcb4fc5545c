//! Runtime settings
//!
//! Everything besides the credentials: where the credential file lives, how the
//! demos run, and how much is logged. Read from `CRM_`-prefixed environment
//! variables (a `.env` file is honoured by the binary), with defaults for
//! anything unset.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use domain_crm::DEFAULT_PAGE_SIZE;

/// One of the CRUD demos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoKind {
    Contact,
    Account,
    Case,
}

impl DemoKind {
    pub const ALL: [DemoKind; 3] = [DemoKind::Contact, DemoKind::Account, DemoKind::Case];
}

impl fmt::Display for DemoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoKind::Contact => write!(f, "contact"),
            DemoKind::Account => write!(f, "account"),
            DemoKind::Case => write!(f, "case"),
        }
    }
}

impl FromStr for DemoKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contact" | "contacts" => Ok(DemoKind::Contact),
            "account" | "accounts" => Ok(DemoKind::Account),
            "case" | "cases" | "incident" => Ok(DemoKind::Case),
            other => Err(format!("Unknown demo '{}'", other)),
        }
    }
}

/// CLI settings
#[derive(Debug, Clone, Deserialize)]
pub struct CliSettings {
    /// Path of the credential JSON file
    pub config_path: String,
    /// Records requested per page by bulk retrieval
    pub page_size: u32,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Comma-separated demo list, run in the given order
    pub demos: String,
    /// Wait for Enter after each demo
    pub pause: bool,
    /// Per-request timeout in seconds; none when unset
    pub timeout_secs: Option<u64>,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            config_path: "config/appsettings.json".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            log_level: "warn".to_string(),
            demos: "contact,account,case".to_string(),
            pause: true,
            timeout_secs: None,
        }
    }
}

impl CliSettings {
    /// Loads settings from the process environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::build(config::Environment::with_prefix("CRM").try_parsing(true))
    }

    /// Loads settings from an explicit variable map, as if it were the environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, config::ConfigError> {
        Self::build(
            config::Environment::with_prefix("CRM")
                .try_parsing(true)
                .source(Some(vars)),
        )
    }

    fn build(environment: config::Environment) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let settings: CliSettings = config::Config::builder()
            .set_default("config_path", defaults.config_path)?
            .set_default("page_size", defaults.page_size as i64)?
            .set_default("log_level", defaults.log_level)?
            .set_default("demos", defaults.demos)?
            .set_default("pause", defaults.pause)?
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        if settings.page_size == 0 {
            return Err(config::ConfigError::Message("page_size must be at least 1".to_string()));
        }
        settings.demo_list()?;
        Ok(settings)
    }

    /// The demos to run, in order
    pub fn demo_list(&self) -> Result<Vec<DemoKind>, config::ConfigError> {
        self.demos
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<DemoKind>().map_err(config::ConfigError::Message))
            .collect()
    }

    /// Appends the configured timeout to a connection descriptor
    pub fn apply_timeout(&self, connection_string: String) -> String {
        match self.timeout_secs {
            Some(secs) => format!("{}; Timeout={}", connection_string, secs),
            None => connection_string,
        }
    }
}
