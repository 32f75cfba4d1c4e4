use tracing::warn;

use super::processor::AgentInner;
use crate::agent::prompts::perception_error_text;

/// What the oracle gets to see of the page for one step
#[derive(Debug, Clone)]
pub(super) struct Perception {
    pub(super) url: Option<String>,
    pub(super) text: String,
}

/// Browser state management implementation
impl AgentInner {
    /// Run a perception cycle. Never fails: a capture or decode error becomes
    /// the perception text so the oracle knows it cannot see the page.
    pub(super) async fn get_browser_state(&self) -> Perception {
        match self.dom.perceive().await {
            Ok(state) => Perception {
                url: state.url,
                text: state.text,
            },
            Err(e) => {
                warn!("Perception failed, continuing blind: {}", e);
                Perception {
                    url: self.dom.current_url().await,
                    text: perception_error_text(&e.to_string()),
                }
            }
        }
    }
}
