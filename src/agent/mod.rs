mod core;
mod history;
pub mod prompts;

pub use self::core::{Agent, AgentConfig};
pub use history::ConversationHistory;
pub use prompts::{AgentMessagePrompt, SystemPrompt};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::oracle::OracleError;
use crate::script::FailureClass;
use crate::tools::ToolError;

/// Shape the oracle is asked to pass to `done()`.
///
/// Rendered into the system message only; results are not validated against it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSchema {
    schema: Value,
}

impl CompletionSchema {
    /// JSON Schema derived from a Rust type
    pub fn from_type<T: JsonSchema>() -> Self {
        Self {
            schema: schemars::schema_for!(T).to_value(),
        }
    }

    /// Use a hand-written schema description as-is
    pub fn from_value(schema: Value) -> Self {
        Self { schema }
    }

    pub fn as_value(&self) -> &Value {
        &self.schema
    }

    /// Pretty JSON for the prompt
    pub fn render(&self) -> String {
        serde_json::to_string_pretty(&self.schema).unwrap_or_else(|_| self.schema.to_string())
    }
}

/// How a run ended when no fatal error occurred
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentOutcome {
    /// `done()` was called; `steps` is the step on which it was observed
    Completed { result: Value, steps: usize },
    /// The step budget ran out without completion
    BudgetExhausted { steps: usize },
}

impl AgentOutcome {
    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Completed { result, .. } => Some(result),
            Self::BudgetExhausted { .. } => None,
        }
    }
}

/// One loop iteration as seen from outside
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    /// Sanitized snippet that was executed
    pub code: String,
    /// Execution error fed back to the oracle, if any
    pub error: Option<String>,
    pub failure: Option<FailureClass>,
    /// Lines printed by the snippet
    pub output: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRun {
    pub run_id: Uuid,
    pub outcome: AgentOutcome,
    pub steps: Vec<StepRecord>,
}

/// Fatal run errors. Execution and perception failures are not here: they are
/// fed back to the oracle and the loop continues.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Oracle call failed at step {step}: {source}")]
    Oracle { step: usize, source: OracleError },

    #[error("Agent run cancelled")]
    Cancelled,

    #[error("Invalid agent configuration: {0}")]
    Config(#[from] ToolError),
}

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct PageTitle {
        /// Title of the page
        title: String,
    }

    #[test]
    fn schema_from_type_names_fields() {
        let schema = CompletionSchema::from_type::<PageTitle>();
        assert_eq!(schema.as_value()["properties"]["title"]["type"], json!("string"));
        assert!(schema.render().contains("Title of the page"));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = AgentOutcome::Completed {
            result: json!({"title": "x"}),
            steps: 2,
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"status": "completed", "result": {"title": "x"}, "steps": 2})
        );
        assert_eq!(
            serde_json::to_value(AgentOutcome::BudgetExhausted { steps: 15 }).unwrap(),
            json!({"status": "budget_exhausted", "steps": 15})
        );
    }
}
