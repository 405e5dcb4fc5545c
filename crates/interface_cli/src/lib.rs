//! Console Layer
//!
//! Everything the demo binary needs on top of the record services.
//!
//! # Architecture
//!
//! - **Config**: credential file loading with user-facing failure messages
//! - **Settings**: `CRM_`-prefixed runtime settings
//! - **Display**: fixed-width console tables per entity kind
//! - **Demos**: the Contact, Account and Case CRUD walkthroughs
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_cli::{run_demos, DemoKind, DemoServices, NoPause};
//!
//! let services = DemoServices::new(connection, 5000);
//! run_demos(&services, &DemoKind::ALL, &mut std::io::stdout(), &mut NoPause).await?;
//! ```

pub mod config;
pub mod demos;
pub mod display;
pub mod error;
pub mod settings;
pub mod whoami;

pub use config::{load_or_report, ConfigError, Configuration};
pub use demos::{account_crud, case_crud, contact_crud, run_demos, DemoServices, NoPause, Pause, StdinPause};
pub use display::{display_list_by_property, display_table, TableRow};
pub use error::DemoError;
pub use settings::{CliSettings, DemoKind};
pub use whoami::who_am_i;
