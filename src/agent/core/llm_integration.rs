use tracing::{debug, error, info};

use super::processor::AgentInner;
use crate::oracle::OracleError;

/// Oracle integration implementation
impl AgentInner {
    /// Ask the oracle for the next snippet given the full history
    pub(super) async fn decide(&self) -> Result<String, OracleError> {
        info!("Thinking...");
        match self.oracle.complete(self.history.messages()).await {
            Ok(reply) => {
                debug!("Oracle reply:\n{}", reply);
                Ok(reply)
            }
            Err(e) => {
                error!("Oracle call failed: {}", e);
                Err(e)
            }
        }
    }
}
