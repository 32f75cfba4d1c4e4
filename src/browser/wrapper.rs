//! Browser lifecycle for one agent process
//!
//! Owns the chromiumoxide `Browser`, its CDP event handler task and the
//! throwaway profile directory Chrome was started with.

use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{BrowserError, BrowserResult};
use crate::BrowserConfig;

/// Wrapper for Browser and its event handler task
///
/// The handler is aborted on drop so it never outlives the browser.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserWrapper {
    pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, user_data_dir: PathBuf) -> Self {
        Self {
            browser,
            handler,
            user_data_dir: Some(user_data_dir),
        }
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close Chrome, wait for the process to exit, then remove the profile.
    ///
    /// Close and wait failures are logged; the profile is removed regardless.
    pub async fn shutdown(mut self) {
        info!("Shutting down browser");

        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }

        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }

        self.cleanup_temp_dir();
    }

    /// Remove the profile directory.
    ///
    /// Must run after `Browser::wait` so Chrome has released its file handles.
    fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            info!("Cleaning up temp directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "Failed to clean up temp directory {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();

        if let Some(path) = &self.user_data_dir {
            warn!(
                "BrowserWrapper dropped without shutdown(). Temp directory will be orphaned: {}",
                path.display()
            );
        }
    }
}

/// Launch Chrome with a per-process profile directory
pub async fn launch_browser(config: &BrowserConfig) -> BrowserResult<BrowserWrapper> {
    info!(
        headless = config.headless,
        "Launching browser ({}x{})", config.window.width, config.window.height
    );

    let user_data_dir =
        std::env::temp_dir().join(format!("browser_code_agent_{}", std::process::id()));

    let (browser, handler) = crate::browser_setup::launch_browser(config, user_data_dir.clone())
        .await
        .map_err(|e| BrowserError::LaunchFailed(format!("{e:#}")))?;

    Ok(BrowserWrapper::new(browser, handler, user_data_dir))
}

/// Open the page the agent will own for the whole task
pub async fn create_blank_page(wrapper: &BrowserWrapper) -> BrowserResult<Page> {
    let page = wrapper
        .browser()
        .new_page("about:blank")
        .await
        .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

    info!("Created blank page");
    Ok(page)
}
