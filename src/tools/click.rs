//! click(index)

use serde_json::Value;
use tracing::info;

use super::{ToolError, ToolResult, Toolbox};

impl Toolbox {
    /// Scroll the indexed element into view and click it, then let the UI settle
    pub async fn click(&self, index: &Value) -> ToolResult<()> {
        let (index, record) = self.resolve(index)?;

        self.driver
            .click_backend_node(record.backend_node_id)
            .await
            .map_err(|source| ToolError::Interaction { index, source })?;

        info!("Clicked element [i_{}] via CDP", index);
        tokio::time::sleep(self.settle_delay).await;
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
    async fn click_resolves_every_index_spelling() {
        let driver = Arc::new(RecordingDriver::default());
        let tb = Toolbox::with_timing(driver.clone(), indexed_handles(), Duration::ZERO, Duration::ZERO);

        tb.click(&json!(0)).await.unwrap();
        tb.click(&json!("[i_1]")).await.unwrap();
        tb.click(&json!("i_0")).await.unwrap();

        assert_eq!(driver.calls(), vec!["click 10", "click 11", "click 10"]);
    }

    #[tokio::test]
    async fn unresolvable_indices_do_not_touch_the_page() {
        let driver = Arc::new(RecordingDriver::default());
        let tb = Toolbox::with_timing(driver.clone(), indexed_handles(), Duration::ZERO, Duration::ZERO);

        let err = tb.click(&json!(99)).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownIndex { index: 99 }));
        let err = tb.click(&json!(-1)).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownIndex { index: -1 }));
        let err = tb.click(&json!("abc")).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));

        assert!(driver.calls().is_empty());
    }
}
