//! Perception: snapshot capture, interactivity indexing and state serialization

mod element;
mod indexer;
mod serializer;
mod snapshot;

pub use element::{ElementRecord, Rect};
pub use indexer::{HandleMap, index_elements, is_element_clickable};
pub use serializer::{MAX_TEXT_CHARS, derived_text, handle_marker, serialize_elements};
pub use snapshot::parse_snapshot;

use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::driver::{DriverError, PageDriver, SNAPSHOT_COMPUTED_STYLES};

/// Handle map shared between the indexer (writer) and the toolbox (reader)
pub type SharedHandles = Arc<RwLock<HandleMap>>;

#[derive(Error, Debug)]
pub enum PerceptionError {
    #[error("Could not capture DOM state: {0}")]
    Capture(#[from] DriverError),

    #[error("Could not decode DOM snapshot: {0}")]
    Decode(String),
}

/// Result of one perception cycle
#[derive(Debug, Clone)]
pub struct PageState {
    pub cycle: u64,
    pub url: Option<String>,
    /// Serialized element lines for the oracle
    pub text: String,
    pub visible_count: usize,
    pub interactive_count: usize,
}

/// Owns the handle map and runs capture → parse → index → serialize
pub struct DomService {
    driver: Arc<dyn PageDriver>,
    handles: SharedHandles,
}

impl DomService {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            driver,
            handles: Arc::new(RwLock::new(HandleMap::empty(0))),
        }
    }

    /// Read handle for the toolbox
    pub fn handles(&self) -> SharedHandles {
        Arc::clone(&self.handles)
    }

    /// Best-effort read of the page URL; `None` when the page cannot say
    pub async fn current_url(&self) -> Option<String> {
        match self.driver.current_url().await {
            Ok(url) => url,
            Err(e) => {
                debug!("Could not read current URL: {}", e);
                None
            }
        }
    }

    /// Start a new cycle, discarding the previous mapping before anything else happens
    fn begin_cycle(&self) -> u64 {
        let mut handles = self.handles.write();
        let cycle = handles.cycle() + 1;
        *handles = HandleMap::empty(cycle);
        cycle
    }

    /// Run one perception cycle.
    ///
    /// On error the handle map stays empty for the new cycle, so no index from
    /// an earlier cycle can resolve.
    pub async fn perceive(&self) -> Result<PageState, PerceptionError> {
        let cycle = self.begin_cycle();

        let raw = self
            .driver
            .capture_snapshot(&SNAPSHOT_COMPUTED_STYLES)
            .await
            .inspect_err(|e| error!("CDP Snapshot failed: {}", e))?;
        let elements = parse_snapshot(raw, &SNAPSHOT_COMPUTED_STYLES)?;
        let (visible, map) = index_elements(elements, cycle);
        let interactive_count = map.len();

        *self.handles.write() = map;

        let url = self.current_url().await;

        debug!(
            "Perception cycle {}: {} visible, {} interactive",
            cycle,
            visible.len(),
            interactive_count
        );

        Ok(PageState {
            cycle,
            url,
            text: serialize_elements(&visible),
            visible_count: visible.len(),
            interactive_count,
        })
    }
}
