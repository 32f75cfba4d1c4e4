//! Locating, downloading and launching Chrome/Chromium

use anyhow::{Context, Result};
use chromiumoxide::Handler;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::detection::{DetectionOptions, default_executable};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::BrowserConfig;
use crate::utils::constants::CHROME_USER_AGENT;

/// Explicit executable override
const EXECUTABLE_ENV: &str = "CHROMIUM_PATH";

/// Flags applied to every launch
const BASE_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-notifications",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-extensions",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-features=TranslateUI",
    "--password-store=basic",
    "--use-mock-keychain",
    "--mute-audio",
];

/// Only with `disable_security: true`
const INSECURE_ARGS: &[&str] = &[
    "--disable-web-security",
    "--disable-features=IsolateOrigins,site-per-process",
    "--ignore-certificate-errors",
];

const NO_SANDBOX_ARGS: &[&str] = &["--no-sandbox", "--disable-setuid-sandbox"];

/// Removes the profile directory on drop unless released
struct ProfileDirGuard {
    path: PathBuf,
    released: bool,
}

impl ProfileDirGuard {
    fn create(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create profile directory {}", path.display()))?;
        Ok(Self {
            path,
            released: false,
        })
    }

    fn release(mut self) {
        self.released = true;
    }
}

impl Drop for ProfileDirGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed profile after failed launch: {}", self.path.display()),
            Err(e) => warn!("Failed to remove profile {}: {}", self.path.display(), e),
        }
    }
}

/// `CHROMIUM_PATH` if it points at a file, then chromiumoxide's platform
/// detection, then a managed download.
pub async fn resolve_executable() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(EXECUTABLE_ENV).map(PathBuf::from) {
        if path.is_file() {
            info!("Using browser from {}: {}", EXECUTABLE_ENV, path.display());
            return Ok(path);
        }
        warn!("{} points to a missing file: {}", EXECUTABLE_ENV, path.display());
    }

    match default_executable(DetectionOptions::default()) {
        Ok(path) => {
            info!("Found browser at: {}", path.display());
            Ok(path)
        }
        Err(reason) => {
            warn!("No local Chrome/Chromium ({}), downloading one", reason);
            download_managed_browser().await
        }
    }
}

/// Fetch a Chromium build into the user cache and return its executable
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("browser-code-agent")
        .join("chromium");
    std::fs::create_dir_all(&cache_dir).context("Failed to create browser cache directory")?;

    let options = BrowserFetcherOptions::builder()
        .with_path(&cache_dir)
        .build()
        .context("Failed to build fetcher options")?;
    let revision = BrowserFetcher::new(options)
        .fetch()
        .await
        .context("Failed to download Chromium")?;

    info!("Downloaded Chromium to: {}", revision.folder_path.display());
    Ok(revision.executable_path)
}

/// Launch Chrome with the configured window and security settings.
///
/// `user_data_dir` is created here and removed again if the launch fails; on
/// success the caller owns it.
pub async fn launch_browser(
    config: &BrowserConfig,
    user_data_dir: PathBuf,
) -> Result<(Browser, JoinHandle<()>)> {
    let executable = resolve_executable().await?;
    let profile = ProfileDirGuard::create(user_data_dir)?;

    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(config.window.width, config.window.height)
        .user_data_dir(&profile.path)
        .chrome_executable(executable)
        .arg(format!("--user-agent={}", CHROME_USER_AGENT))
        .args(launch_args(config, in_container()));

    builder = if config.headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    let browser_config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    debug!("Launching browser with config: {:?}", browser_config);
    let (browser, handler) = Browser::launch(browser_config)
        .await
        .context("Failed to launch browser")?;

    profile.release();
    Ok((browser, spawn_handler(handler)))
}

/// Extra command-line flags for one launch
fn launch_args(config: &BrowserConfig, in_container: bool) -> Vec<&'static str> {
    let mut args = BASE_ARGS.to_vec();
    if config.disable_security {
        warn!("Disabling browser security features (disable_security=true)");
        args.extend_from_slice(INSECURE_ARGS);
    }
    // setuid sandboxing does not work inside containers
    if in_container || config.disable_security {
        args.extend_from_slice(NO_SANDBOX_ARGS);
    }
    args
}

/// Drive the CDP event stream until the browser goes away
fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let message = e.to_string();
                if is_unknown_event_error(&message) {
                    trace!("Ignoring undecodable CDP event: {}", message);
                } else {
                    error!("Browser handler error: {:?}", e);
                }
            }
        }
        debug!("Browser handler task completed");
    })
}

/// Chrome emits events chromiumoxide has no type for; decoding them fails harmlessly
fn is_unknown_event_error(message: &str) -> bool {
    message.contains("data did not match any variant of untagged enum Message")
        || message.contains("Failed to deserialize WS response")
}

fn in_container() -> bool {
    Path::new("/.dockerenv").exists()
        || std::env::var_os("container").is_some()
        || std::env::var_os("KUBERNETES_SERVICE_HOST").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_launch_keeps_sandbox_outside_containers() {
        let args = launch_args(&BrowserConfig::default(), false);
        assert!(args.contains(&"--disable-blink-features=AutomationControlled"));
        assert!(!args.contains(&"--no-sandbox"));
        assert!(!args.contains(&"--disable-web-security"));
    }

    #[test]
    fn containers_and_insecure_mode_drop_the_sandbox() {
        let args = launch_args(&BrowserConfig::default(), true);
        assert!(args.contains(&"--no-sandbox"));
        assert!(!args.contains(&"--ignore-certificate-errors"));

        let insecure = BrowserConfig {
            disable_security: true,
            ..BrowserConfig::default()
        };
        let args = launch_args(&insecure, false);
        assert!(args.contains(&"--disable-web-security"));
        assert!(args.contains(&"--no-sandbox"));
    }

    #[test]
    fn unknown_event_errors_are_recognized() {
        assert!(is_unknown_event_error(
            "data did not match any variant of untagged enum Message"
        ));
        assert!(!is_unknown_event_error("connection reset by peer"));
    }

    #[test]
    fn failed_launch_removes_profile() {
        let dir = std::env::temp_dir().join(format!("bca_profile_{}", std::process::id()));
        {
            let _guard = ProfileDirGuard::create(dir.clone()).unwrap();
            assert!(dir.exists());
        }
        assert!(!dir.exists());
    }

    #[test]
    fn released_profile_is_kept() {
        let dir = std::env::temp_dir().join(format!("bca_profile_kept_{}", std::process::id()));
        ProfileDirGuard::create(dir.clone()).unwrap().release();
        assert!(dir.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
