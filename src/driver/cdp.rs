//! chromiumoxide-backed page driver
//!
//! Commands are issued as raw JSON methods so responses stay in protocol wire
//! format; the snapshot decoder in `dom::snapshot` owns the shape of that data.

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use super::{DriverError, DriverResult, PageDriver};

/// Scroll the resolved node into view, then click it in page context
const CLICK_FUNCTION: &str = r#"function() {
    this.scrollIntoView({block: 'center', inline: 'center'});
    this.click();
}"#;

// Raw CDP command wrapper to allow executing arbitrary methods with JSON params
#[derive(Debug, Clone)]
struct RawCdpCommand {
    method: String,
    params: Value,
}

impl RawCdpCommand {
    fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

impl serde::Serialize for RawCdpCommand {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Serialize only the params as the Command payload
        self.params.serialize(serializer)
    }
}

impl chromiumoxide_types::Method for RawCdpCommand {
    fn identifier(&self) -> chromiumoxide_types::MethodId {
        self.method.clone().into()
    }
}

impl chromiumoxide_types::Command for RawCdpCommand {
    type Response = Value;
}

/// `Runtime.evaluate` / `Runtime.callFunctionOn` response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeResponse {
    #[serde(default)]
    result: Option<RemoteObject>,
    #[serde(default)]
    exception_details: Option<ExceptionDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteObject {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    object_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExceptionDetails {
    #[serde(default)]
    text: String,
    #[serde(default)]
    exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    fn message(&self) -> String {
        self.exception
            .as_ref()
            .and_then(|e| e.description.clone())
            .unwrap_or_else(|| self.text.clone())
    }
}

#[derive(Debug, Deserialize)]
struct ResolveNodeResponse {
    object: RemoteObject,
}

/// Page driver speaking CDP through a chromiumoxide page session
pub struct CdpPageDriver {
    page: Page,
}

impl CdpPageDriver {
    /// Wrap a page and enable the DOM domain (needed for `DOM.resolveNode`)
    pub async fn attach(page: Page) -> DriverResult<Self> {
        let driver = Self { page };
        driver.send("DOM.enable", json!({})).await?;
        Ok(driver)
    }

    async fn send(&self, method: &str, params: Value) -> DriverResult<Value> {
        debug!("CDP -> {}", method);
        let response = self
            .page
            .execute(RawCdpCommand::new(method, params))
            .await
            .map_err(|e| DriverError::Protocol {
                method: method.to_string(),
                message: e.to_string(),
            })?;
        Ok(response.result)
    }

    async fn send_runtime(&self, method: &str, params: Value) -> DriverResult<Option<RemoteObject>> {
        let raw = self.send(method, params).await?;
        let response: RuntimeResponse =
            serde_json::from_value(raw).map_err(|e| DriverError::Decode {
                method: method.to_string(),
                message: e.to_string(),
            })?;
        if let Some(details) = response.exception_details {
            return Err(DriverError::Exception(details.message()));
        }
        Ok(response.result)
    }
}

#[async_trait]
impl PageDriver for CdpPageDriver {
    async fn capture_snapshot(&self, computed_styles: &[&str]) -> DriverResult<Value> {
        self.send(
            "DOMSnapshot.captureSnapshot",
            json!({
                "computedStyles": computed_styles,
                "includePaintOrder": true,
                "includeDOMRects": true
            }),
        )
        .await
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> DriverResult<bool> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(true),
            // chromiumoxide's own request timeout; the page may still be usable
            Ok(Err(CdpError::Timeout)) => {
                warn!("Page load for {} timed out in the browser", url);
                Ok(false)
            }
            Ok(Err(e)) => Err(DriverError::Protocol {
                method: "Page.navigate".to_string(),
                message: e.to_string(),
            }),
            Err(_) => Ok(false),
        }
    }

    async fn current_url(&self) -> DriverResult<Option<String>> {
        self.page.url().await.map_err(|e| DriverError::Protocol {
            method: "Target.getTargetInfo".to_string(),
            message: e.to_string(),
        })
    }

    async fn click_backend_node(&self, backend_node_id: i64) -> DriverResult<()> {
        let raw = self
            .send("DOM.resolveNode", json!({ "backendNodeId": backend_node_id }))
            .await?;
        let resolved: ResolveNodeResponse =
            serde_json::from_value(raw).map_err(|e| DriverError::Decode {
                method: "DOM.resolveNode".to_string(),
                message: e.to_string(),
            })?;
        let object_id = resolved.object.object_id.ok_or_else(|| DriverError::Decode {
            method: "DOM.resolveNode".to_string(),
            message: format!("node {} has no object id", backend_node_id),
        })?;

        self.send_runtime(
            "Runtime.callFunctionOn",
            json!({
                "functionDeclaration": CLICK_FUNCTION,
                "objectId": object_id,
                "awaitPromise": true
            }),
        )
        .await?;
        Ok(())
    }

    async fn insert_keystrokes(&self, text: &str) -> DriverResult<()> {
        for ch in text.chars() {
            let key_text = if ch == '\n' { "\r".to_string() } else { ch.to_string() };
            self.send(
                "Input.dispatchKeyEvent",
                json!({ "type": "char", "text": key_text }),
            )
            .await?;
        }
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> DriverResult<Value> {
        let result = self
            .send_runtime(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "awaitPromise": true,
                    "returnByValue": true
                }),
            )
            .await?;
        // `undefined` comes back without a value
        Ok(result.and_then(|r| r.value).unwrap_or(Value::Null))
    }

    async fn describe_node(&self, backend_node_id: i64, depth: u32) -> DriverResult<Value> {
        // CDP rejects a depth of 0
        let depth = depth.max(1);
        let raw = self
            .send(
                "DOM.describeNode",
                json!({ "backendNodeId": backend_node_id, "depth": depth }),
            )
            .await?;
        Ok(raw.get("node").cloned().unwrap_or(Value::Null))
    }
}
