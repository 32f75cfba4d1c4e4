//! Browser infrastructure for launching and owning the Chrome instance the agent drives

mod wrapper;

pub use crate::browser_setup::{download_managed_browser, resolve_executable};
pub use wrapper::{BrowserWrapper, create_blank_page, launch_browser};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),
}

pub type BrowserResult<T> = Result<T, BrowserError>;
