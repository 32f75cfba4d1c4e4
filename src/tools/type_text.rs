//! input_text(index, text)

use serde_json::Value;
use tracing::info;

use super::{ToolError, ToolResult, Toolbox};

impl Toolbox {
    /// Focus the indexed element by clicking it, then type `text` as key events.
    ///
    /// No settle delay between the two; existing content is not cleared.
    pub async fn input_text(&self, index: &Value, text: &str) -> ToolResult<()> {
        let (index, record) = self.resolve(index)?;

        self.driver
            .click_backend_node(record.backend_node_id)
            .await
            .map_err(|source| ToolError::Interaction { index, source })?;
        self.driver
            .insert_keystrokes(text)
            .await
            .map_err(|source| ToolError::Interaction { index, source })?;

        info!("Typed {} chars into [i_{}]", text.chars().count(), index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::tools::Toolbox;
    use crate::tools::test_support::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn focuses_then_types() {
        let driver = Arc::new(RecordingDriver::default());
        let tb = Toolbox::with_timing(driver.clone(), indexed_handles(), Duration::ZERO, Duration::ZERO);

        tb.input_text(&json!("[i_1]"), "hello").await.unwrap();

        assert_eq!(driver.calls(), vec!["click 11", "keys hello"]);
    }
}
