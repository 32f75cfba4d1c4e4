//! navigate(url)

use tracing::{debug, info};
use url::Url;

use super::{ToolError, ToolResult, Toolbox};
use crate::dom::HandleMap;

impl Toolbox {
    /// Load `url`, waiting at most the navigation timeout for the load to finish.
    ///
    /// The handle map is emptied before the page is touched, so every index handed
    /// out before this call fails to resolve until the next perception cycle.
    pub async fn navigate(&self, url: &str) -> ToolResult<()> {
        let parsed = Url::parse(url)
            .map_err(|e| ToolError::InvalidArgument(format!("Invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https" | "file" | "about" | "data") {
            return Err(ToolError::InvalidArgument(format!(
                "Unsupported URL scheme '{}' in '{}'",
                parsed.scheme(),
                url
            )));
        }

        {
            let mut handles = self.handles.write();
            let next = handles.cycle() + 1;
            *handles = HandleMap::empty(next);
        }

        info!("Navigating to {}", url);
        let loaded = self
            .driver
            .navigate(url, self.navigation_timeout)
            .await
            .map_err(|source| ToolError::Navigation {
                url: url.to_string(),
                source,
            })?;

        if !loaded {
            debug!(
                "Page did not finish loading within {}ms, continuing",
                self.navigation_timeout.as_millis()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::tools::test_support::*;
    use crate::tools::{ToolError, Toolbox};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn navigation_invalidates_previous_indices() {
        let driver = Arc::new(RecordingDriver::default());
        let handles = indexed_handles();
        let tb = Toolbox::with_timing(driver.clone(), handles.clone(), Duration::ZERO, Duration::ZERO);

        tb.navigate("https://example.com").await.unwrap();

        assert!(handles.read().is_empty());
        assert_eq!(handles.read().cycle(), 2);
        let err = tb.click(&json!(0)).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownIndex { index: 0 }));
        assert_eq!(driver.calls(), vec!["navigate https://example.com"]);
    }

    #[tokio::test]
    async fn load_timeout_is_not_an_error() {
        let driver = Arc::new(RecordingDriver::default());
        let tb = Toolbox::with_timing(
            driver.clone(),
            empty_handles(),
            Duration::from_millis(250),
            Duration::ZERO,
        );
        assert!(tb.navigate("https://example.com/slow").await.is_ok());
        assert_eq!(*driver.navigation_timeouts.lock(), vec![Duration::from_millis(250)]);
    }

    #[tokio::test]
    async fn malformed_urls_never_reach_the_page() {
        let driver = Arc::new(RecordingDriver::default());
        let tb = Toolbox::with_timing(driver.clone(), empty_handles(), Duration::ZERO, Duration::ZERO);
        for bad in ["example.com", "not a url", "javascript:alert(1)"] {
            let err = tb.navigate(bad).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArgument(_)), "{bad}");
        }
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn driver_failure_surfaces_as_navigation_error() {
        let driver = Arc::new(RecordingDriver {
            fail_navigation: true,
            ..Default::default()
        });
        let tb = Toolbox::with_timing(driver, empty_handles(), Duration::ZERO, Duration::ZERO);
        let err = tb.navigate("https://nowhere.invalid").await.unwrap_err();
        assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));
    }
}
