use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

use crate::agent::history::ConversationHistory;
use crate::agent::prompts::{AgentMessagePrompt, execution_error_message};
use crate::agent::{AgentError, AgentResult, StepRecord};
use crate::dom::DomService;
use crate::oracle::{ChatMessage, Oracle};
use crate::script::{Namespace, sanitize_code};
use crate::tools::Toolbox;

/// Task-scoped state owned by one agent run
pub(super) struct AgentInner {
    pub(super) dom: DomService,
    pub(super) toolbox: Toolbox,
    pub(super) oracle: Arc<dyn Oracle>,
    pub(super) namespace: Namespace,
    pub(super) history: ConversationHistory,
    pub(super) agent_prompt: AgentMessagePrompt,
    /// `print` output of the previous step, shown with the next perception
    pub(super) pending_output: Vec<String>,
}

/// Core processing logic
impl AgentInner {
    /// One PERCEIVE → DECIDE → SANITIZE → EXECUTE pass.
    ///
    /// Only an oracle failure is returned as an error. An execution failure is
    /// appended to the history as feedback and reported in the step record.
    pub(super) async fn process_step(&mut self, step: usize) -> AgentResult<StepRecord> {
        // PERCEIVE
        let perception = self.get_browser_state().await;
        let printed = std::mem::take(&mut self.pending_output);
        let message = self.agent_prompt.build_message_prompt(
            perception.url.as_deref(),
            &perception.text,
            &printed,
        );
        self.history.push(ChatMessage::user(message));

        // DECIDE
        let reply = self
            .decide()
            .await
            .map_err(|source| AgentError::Oracle { step, source })?;
        self.history.push(ChatMessage::assistant(reply.clone()));

        // SANITIZE
        let code = sanitize_code(&reply);
        info!(step, "Executing code:\n{}", code);

        // EXECUTE
        let (result, output) = self.execute_code(&code).await;
        self.pending_output = output.clone();

        let (error, failure) = match result {
            Ok(()) => (None, None),
            Err(e) => {
                let text = e.to_string();
                let class = e.class();
                error!(step, failure = ?class, "Execution Error: {}", text);
                self.history
                    .push(ChatMessage::user(execution_error_message(&text)));
                (Some(text), Some(class))
            }
        };

        Ok(StepRecord {
            step,
            code,
            error,
            failure,
            output,
            timestamp: Utc::now(),
        })
    }
}
