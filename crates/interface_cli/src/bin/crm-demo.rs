//! CRM CRUD Demo Binary
//!
//! Connects to a Dataverse environment with client-secret credentials and
//! walks the Contact, Account and Case tables through create, read, update and
//! delete.
//!
//! # Usage
//!
//! ```bash
//! # Credentials from config/appsettings.json
//! cargo run --bin crm-demo
//!
//! # Run unattended, cases only
//! CRM_PAUSE=false CRM_DEMOS=case cargo run --bin crm-demo
//! ```
//!
//! # Environment Variables
//!
//! * `CRM_CONFIG_PATH` - Credential file (default: config/appsettings.json)
//! * `CRM_PAGE_SIZE` - Records per page when listing (default: 5000)
//! * `CRM_DEMOS` - Comma-separated demos to run (default: contact,account,case)
//! * `CRM_PAUSE` - Wait for Enter after each demo (default: true)
//! * `CRM_TIMEOUT_SECS` - Per-request timeout in seconds
//! * `CRM_LOG_LEVEL` - Log filter when `RUST_LOG` is unset (default: warn)

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_crm::{OrganizationPort, WebApiConnection};
use interface_cli::{
    load_or_report, run_demos, who_am_i, CliSettings, DemoServices, NoPause, Pause, StdinPause,
};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = CliSettings::from_env()?;
    init_tracing(&settings.log_level);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(settings))
}

async fn run(settings: CliSettings) -> anyhow::Result<()> {
    let mut out = io::stdout();

    let Some(configuration) = load_or_report(&settings.config_path, &mut out) else {
        writeln!(out, "Config Load Failed.")?;
        out.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        return Ok(());
    };

    tracing::info!(resource = configuration.resource(), "Configuration loaded");

    let connection_string = settings.apply_timeout(configuration.connection_string());
    let connection: Arc<dyn OrganizationPort> = match WebApiConnection::connect(&connection_string) {
        Ok(connection) => Arc::new(connection),
        Err(fault) => {
            writeln!(out, "Error: {}", fault.detail())?;
            return Ok(());
        }
    };

    match who_am_i(connection.as_ref()).await {
        Ok(user_id) => writeln!(out, "Connected as user {}", user_id)?,
        Err(fault) => {
            writeln!(out, "Error: {}", fault.detail())?;
            return Ok(());
        }
    }

    let services = DemoServices::new(connection, settings.page_size);
    let mut pause: Box<dyn Pause> = if settings.pause {
        Box::new(StdinPause)
    } else {
        Box::new(NoPause)
    };

    if let Err(err) = run_demos(&services, &settings.demo_list()?, &mut out, pause.as_mut()).await {
        tracing::error!(error = %err, "Demo stopped");
        writeln!(out, "Error: {}", err.detail())?;
    }

    // Dropping the services releases the last connection handle
    drop(services);
    tracing::info!("Demo complete");
    Ok(())
}

/// Initializes the tracing subscriber, writing to stderr so it stays out of the tables
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(io::stderr),
        )
        .init();
}
