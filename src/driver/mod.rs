//! Protocol primitives the agent needs from a live page
//!
//! Everything above this layer talks to the browser only through [`PageDriver`], so the
//! perception and action layers can run against an in-memory page in tests.

mod cdp;

pub use cdp::CdpPageDriver;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Computed style properties requested with every snapshot
pub const SNAPSHOT_COMPUTED_STYLES: [&str; 4] = ["display", "visibility", "opacity", "overflow"];

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("{method} failed: {message}")]
    Protocol { method: String, message: String },

    #[error("Script threw: {0}")]
    Exception(String),

    #[error("Unexpected {method} response: {message}")]
    Decode { method: String, message: String },
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Request/response channel to one exclusively-owned page
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// `DOMSnapshot.captureSnapshot` in wire format (documents + shared string table)
    async fn capture_snapshot(&self, computed_styles: &[&str]) -> DriverResult<Value>;

    /// Load `url`, waiting at most `timeout` for it to finish.
    ///
    /// `Ok(false)` means the bound elapsed first; the page keeps loading and is
    /// still usable. Failures to start the load are errors.
    async fn navigate(&self, url: &str, timeout: Duration) -> DriverResult<bool>;

    async fn current_url(&self) -> DriverResult<Option<String>>;

    /// Resolve a backend node and run scroll-into-view + click on it
    async fn click_backend_node(&self, backend_node_id: i64) -> DriverResult<()>;

    /// Dispatch one key event per character to the focused element
    async fn insert_keystrokes(&self, text: &str) -> DriverResult<()>;

    /// Evaluate an expression in the page, awaiting promises, returning by value
    async fn evaluate(&self, expression: &str) -> DriverResult<Value>;

    /// `DOM.describeNode` for a backend node
    async fn describe_node(&self, backend_node_id: i64, depth: u32) -> DriverResult<Value>;
}
