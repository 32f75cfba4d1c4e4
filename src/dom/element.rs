use serde::Serialize;
use std::collections::HashMap;

/// Layout rectangle in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One captured DOM node, flattened out of the snapshot tree
#[derive(Debug, Clone, Serialize)]
pub struct ElementRecord {
    /// Position of this record in the capture-ordered list
    pub node_index: usize,

    /// Live-page handle; dereferenced at click time, never shown to the oracle
    #[serde(skip)]
    pub backend_node_id: i64,

    pub tag_name: String,
    pub attributes: HashMap<String, String>,
    pub text_content: String,
    pub clickable: bool,
    pub visible: bool,

    /// Index of the parent record in the same list (informational only)
    pub parent: Option<usize>,

    /// Ephemeral `[i_N]` handle, set only for visible clickable elements
    pub highlight_index: Option<usize>,

    /// Computed style hints carried through from layout (not used for filtering)
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub style_hints: HashMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
}

impl ElementRecord {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
