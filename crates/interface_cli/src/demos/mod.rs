//! CRUD demonstrations
//!
//! Each demo walks one entity kind through list, create, list, get, update,
//! get, list, delete, list, printing tables as it goes. Supporting records a
//! demo creates are deleted before it finishes. Demos stop at the first fault.

mod account;
mod case;
mod contact;

use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use domain_crm::{AccountService, CaseService, ContactService, OrganizationPort};

use crate::error::DemoError;
use crate::settings::DemoKind;

pub use account::account_crud;
pub use case::case_crud;
pub use contact::contact_crud;

const RULE: &str = "******************************************";

/// What happens between demos
pub trait Pause {
    fn pause(&mut self) -> io::Result<()>;
}

/// Waits for a line on standard input
#[derive(Debug, Default)]
pub struct StdinPause;

impl Pause for StdinPause {
    fn pause(&mut self) -> io::Result<()> {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(())
    }
}

/// Carries straight on
#[derive(Debug, Default)]
pub struct NoPause;

impl Pause for NoPause {
    fn pause(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The services the demos use, sharing one connection
#[derive(Debug, Clone)]
pub struct DemoServices {
    pub contacts: ContactService,
    pub accounts: AccountService,
    pub cases: CaseService,
}

impl DemoServices {
    pub fn new(connection: Arc<dyn OrganizationPort>, page_size: u32) -> Self {
        Self {
            contacts: ContactService::new(connection.clone()).with_page_size(page_size),
            accounts: AccountService::new(connection.clone()).with_page_size(page_size),
            cases: CaseService::new(connection).with_page_size(page_size),
        }
    }
}

/// Runs the selected demos in order
pub async fn run_demos<W: Write>(
    services: &DemoServices,
    kinds: &[DemoKind],
    out: &mut W,
    pause: &mut dyn Pause,
) -> Result<(), DemoError> {
    for kind in kinds {
        info!(demo = %kind, "Starting demo");
        match kind {
            DemoKind::Contact => contact_crud(&services.contacts, out).await?,
            DemoKind::Account => account_crud(&services.accounts, &services.contacts, out).await?,
            DemoKind::Case => case_crud(&services.cases, &services.contacts, out).await?,
        }
        end_banner(out)?;
        pause.pause()?;
    }
    Ok(())
}

fn start_banner<W: Write>(out: &mut W, table: &str) -> io::Result<()> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "Demonstration of CRUD on the {} table", table)
}

fn end_banner<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "\n{}", RULE)?;
    writeln!(out, "Enter to Continue")?;
    writeln!(out, "{}", RULE)
}

/// Value or `N/A`
fn or_na<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    or_na(value.map(|d| d.format("%Y-%m-%d %H:%M:%S")))
}
