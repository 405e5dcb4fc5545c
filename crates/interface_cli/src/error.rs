//! Console layer errors

use std::io;

use thiserror::Error;

use core_kernel::RemoteFault;

/// Why a demo stopped
#[derive(Debug, Error)]
pub enum DemoError {
    /// The organization service reported a fault
    #[error("{0}")]
    Remote(#[from] RemoteFault),

    /// The console could not be written or read
    #[error("Console error: {0}")]
    Console(#[from] io::Error),
}

impl DemoError {
    /// The fault's detail text, or the console error
    pub fn detail(&self) -> String {
        match self {
            DemoError::Remote(fault) => fault.detail(),
            DemoError::Console(err) => err.to_string(),
        }
    }
}
