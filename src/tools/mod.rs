//! Action toolbox exposed to oracle snippets
//!
//! Every action that takes an element addresses it by the ephemeral index from
//! the most recent perception cycle. Lookups go through the shared handle map,
//! never through anything cached in the toolbox itself.

mod click;
mod evaluate;
mod get_element;
mod index;
mod navigate;
mod type_text;

pub use evaluate::build_expression;
pub use index::parse_index;

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::Config;
use crate::dom::{ElementRecord, SharedHandles};
use crate::driver::{DriverError, PageDriver};
use crate::utils::{validate_interaction_timeout, validate_navigation_timeout};

/// Names the toolbox occupies in the snippet namespace
pub const TOOL_NAMES: &[&str] = &[
    "navigate",
    "click",
    "input_text",
    "evaluate",
    "get_element",
    "done",
];

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Index {index} is invalid for the current page state.")]
    UnknownIndex { index: i64 },

    #[error("Navigation to {url} failed: {source}")]
    Navigation { url: String, source: DriverError },

    #[error("Failed to interact with element {index}. The page might have changed. ({source})")]
    Interaction { index: i64, source: DriverError },

    #[error("JS evaluation failed: {0}")]
    Evaluation(DriverError),
}

impl ToolError {
    /// Whether the failure happened while resolving an index, before touching the page
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::UnknownIndex { .. })
    }
}

pub type ToolResult<T> = Result<T, ToolError>;

/// The fixed set of page actions plus the completion slot.
pub struct Toolbox {
    driver: Arc<dyn PageDriver>,
    handles: SharedHandles,
    navigation_timeout: Duration,
    settle_delay: Duration,
    completion: Mutex<Option<Value>>,
}

impl Toolbox {
    /// Build a toolbox with timings taken from `config`, validated against their ceilings
    pub fn new(
        driver: Arc<dyn PageDriver>,
        handles: SharedHandles,
        config: &Config,
    ) -> ToolResult<Self> {
        let navigation_timeout =
            validate_navigation_timeout(Some(config.navigation_timeout_ms), 5000)?;
        let settle_delay = validate_interaction_timeout(Some(config.settle_delay_ms), 1000)?;
        Ok(Self::with_timing(
            driver,
            handles,
            navigation_timeout,
            settle_delay,
        ))
    }

    pub fn with_timing(
        driver: Arc<dyn PageDriver>,
        handles: SharedHandles,
        navigation_timeout: Duration,
        settle_delay: Duration,
    ) -> Self {
        Self {
            driver,
            handles,
            navigation_timeout,
            settle_delay,
            completion: Mutex::new(None),
        }
    }

    /// Resolve an index argument against the current cycle's map
    fn resolve(&self, index: &Value) -> ToolResult<(i64, ElementRecord)> {
        let index = parse_index(index)?;
        let handles = self.handles.read();
        handles
            .get(index)
            .cloned()
            .map(|record| (index, record))
            .ok_or(ToolError::UnknownIndex { index })
    }

    /// Record the final result. A later call replaces an earlier one.
    pub fn done(&self, result: Value) {
        *self.completion.lock() = Some(result);
    }

    pub fn is_done(&self) -> bool {
        self.completion.lock().is_some()
    }

    pub fn result(&self) -> Option<Value> {
        self.completion.lock().clone()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory page used by the toolbox unit tests

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::dom::{ElementRecord, HandleMap, SharedHandles, index_elements};
    use crate::driver::{DriverError, DriverResult, PageDriver};

    #[derive(Default)]
    pub struct RecordingDriver {
        pub calls: Mutex<Vec<String>>,
        pub evaluate_result: Mutex<Option<DriverResult<Value>>>,
        pub fail_navigation: bool,
        pub navigation_timeouts: Mutex<Vec<Duration>>,
    }

    impl RecordingDriver {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl PageDriver for RecordingDriver {
        async fn capture_snapshot(&self, _computed_styles: &[&str]) -> DriverResult<Value> {
            Ok(json!({"documents": [], "strings": []}))
        }

        async fn navigate(&self, url: &str, timeout: Duration) -> DriverResult<bool> {
            self.calls.lock().push(format!("navigate {}", url));
            self.navigation_timeouts.lock().push(timeout);
            if self.fail_navigation {
                return Err(DriverError::Protocol {
                    method: "Page.navigate".into(),
                    message: "net::ERR_NAME_NOT_RESOLVED".into(),
                });
            }
            // Never finishes loading within the bound
            Ok(false)
        }

        async fn current_url(&self) -> DriverResult<Option<String>> {
            Ok(None)
        }

        async fn click_backend_node(&self, backend_node_id: i64) -> DriverResult<()> {
            self.calls.lock().push(format!("click {}", backend_node_id));
            Ok(())
        }

        async fn insert_keystrokes(&self, text: &str) -> DriverResult<()> {
            self.calls.lock().push(format!("keys {}", text));
            Ok(())
        }

        async fn evaluate(&self, expression: &str) -> DriverResult<Value> {
            self.calls.lock().push(format!("eval {}", expression));
            self.evaluate_result.lock().take().unwrap_or(Ok(Value::Null))
        }

        async fn describe_node(&self, backend_node_id: i64, depth: u32) -> DriverResult<Value> {
            self.calls
                .lock()
                .push(format!("describe {} {}", backend_node_id, depth));
            Ok(json!({"backendNodeId": backend_node_id, "nodeName": "BUTTON"}))
        }
    }

    fn record(tag: &str, backend_node_id: i64, text: &str) -> ElementRecord {
        ElementRecord {
            node_index: backend_node_id as usize,
            backend_node_id,
            tag_name: tag.to_string(),
            attributes: HashMap::from([("id".to_string(), format!("el{}", backend_node_id))]),
            text_content: text.to_string(),
            clickable: true,
            visible: true,
            parent: None,
            highlight_index: None,
            style_hints: HashMap::new(),
            bounds: None,
        }
    }

    /// Handle map with `[i_0]` -> backend 10 (button), `[i_1]` -> backend 11 (input)
    pub fn indexed_handles() -> SharedHandles {
        let (_, map) = index_elements(
            vec![record("button", 10, "Go"), record("input", 11, "")],
            1,
        );
        Arc::new(parking_lot::RwLock::new(map))
    }

    pub fn empty_handles() -> SharedHandles {
        Arc::new(parking_lot::RwLock::new(HandleMap::empty(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;

    fn toolbox(driver: Arc<RecordingDriver>, handles: SharedHandles) -> Toolbox {
        Toolbox::with_timing(driver, handles, Duration::from_millis(10), Duration::ZERO)
    }

    #[test]
    fn last_done_wins() {
        let tb = toolbox(Arc::new(RecordingDriver::default()), empty_handles());
        assert!(!tb.is_done());
        tb.done(json!("first"));
        tb.done(json!({"title": "second"}));
        assert!(tb.is_done());
        assert_eq!(tb.result(), Some(json!({"title": "second"})));
    }

    #[test]
    fn timings_are_validated_from_config() {
        let config = Config {
            settle_delay_ms: 60_000,
            ..Config::default()
        };
        let result = Toolbox::new(
            Arc::new(RecordingDriver::default()),
            empty_handles(),
            &config,
        );
        assert!(matches!(result, Err(ToolError::InvalidArgument(_))));
    }

    #[test]
    fn resolution_errors_are_classified() {
        assert!(ToolError::UnknownIndex { index: 3 }.is_resolution());
        assert!(ToolError::InvalidArgument("x".into()).is_resolution());
        assert!(!ToolError::Evaluation(DriverError::Exception("boom".into())).is_resolution());
        assert_eq!(
            ToolError::UnknownIndex { index: 3 }.to_string(),
            "Index 3 is invalid for the current page state."
        );
    }
}
