use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::config::AgentConfig;
use super::processor::AgentInner;
use crate::Config;
use crate::agent::history::ConversationHistory;
use crate::agent::prompts::{AgentMessagePrompt, SystemPrompt};
use crate::agent::{AgentError, AgentOutcome, AgentResult, AgentRun, CompletionSchema};
use crate::dom::DomService;
use crate::driver::PageDriver;
use crate::oracle::{ChatMessage, Oracle};
use crate::script::Namespace;
use crate::tools::Toolbox;

/// Drives one task on one exclusively-owned page.
///
/// The handle map, the execution namespace and the conversation history all
/// live here and are dropped with the agent.
pub struct Agent {
    inner: AgentInner,
    config: AgentConfig,
}

/// Agent implementation
impl Agent {
    /// Create a new agent for `task`; timings are validated from `config`
    pub fn new(
        task: &str,
        schema: CompletionSchema,
        driver: Arc<dyn PageDriver>,
        oracle: Arc<dyn Oracle>,
        config: &Config,
    ) -> AgentResult<Self> {
        let dom = DomService::new(Arc::clone(&driver));
        let toolbox = Toolbox::new(driver, dom.handles(), config)?;
        let system_prompt = SystemPrompt::new(task, schema);

        Ok(Self {
            inner: AgentInner {
                dom,
                toolbox,
                oracle,
                namespace: Namespace::new(),
                history: ConversationHistory::new(system_prompt.build_prompt()),
                agent_prompt: AgentMessagePrompt,
                pending_output: Vec::new(),
            },
            config: AgentConfig::from(config),
        })
    }

    /// Override the loop parameters
    pub fn with_agent_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Run until `done()` is observed, the step budget runs out, the oracle
    /// fails, or `cancel` fires.
    ///
    /// Cancellation is honoured at every suspension point, including mid-step.
    pub async fn run(&mut self, cancel: CancellationToken) -> AgentResult<AgentRun> {
        let run_id = Uuid::new_v4();
        let span = info_span!("agent_run", %run_id);
        self.run_loop(run_id, cancel).instrument(span).await
    }

    async fn run_loop(&mut self, run_id: Uuid, cancel: CancellationToken) -> AgentResult<AgentRun> {
        let max_steps = self.config.max_steps;
        let mut records = Vec::with_capacity(max_steps);

        for step in 1..=max_steps {
            info!("--- STEP {}/{} ---", step, max_steps);

            let record = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(step, "Agent run cancelled");
                    return Err(AgentError::Cancelled);
                }
                record = self.inner.process_step(step) => record?,
            };

            let succeeded = record.error.is_none();
            records.push(record);

            // CHECK_DONE
            if succeeded && let Some(result) = self.inner.toolbox.result() {
                info!("Task completed in {} steps", step);
                return Ok(AgentRun {
                    run_id,
                    outcome: AgentOutcome::Completed {
                        result,
                        steps: step,
                    },
                    steps: records,
                });
            }

            if step < max_steps && !self.config.step_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                    _ = tokio::time::sleep(self.config.step_delay) => {}
                }
            }
        }

        warn!("Max steps reached without completion");
        Ok(AgentRun {
            run_id,
            outcome: AgentOutcome::BudgetExhausted { steps: max_steps },
            steps: records,
        })
    }

    /// Conversation so far, system message first
    pub fn history(&self) -> &[ChatMessage] {
        self.inner.history.messages()
    }

    /// Variables bound by snippets so far
    pub fn namespace(&self) -> &Namespace {
        &self.inner.namespace
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}
