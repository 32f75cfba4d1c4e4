//! get_element(index, depth)

use serde_json::{Value, json};

use super::{ToolError, ToolResult, Toolbox};

impl Toolbox {
    /// Inspect an indexed element: recorded tag, attributes and text plus a live
    /// `DOM.describeNode` of its subtree down to `depth`.
    pub async fn get_element(&self, index: &Value, depth: u32) -> ToolResult<Value> {
        let (index, record) = self.resolve(index)?;

        let node = self
            .driver
            .describe_node(record.backend_node_id, depth)
            .await
            .map_err(|source| ToolError::Interaction { index, source })?;

        Ok(json!({
            "index": index,
            "tag": record.tag_name,
            "attributes": record.attributes,
            "text": record.text_content,
            "node": node,
        }))
    }
}
