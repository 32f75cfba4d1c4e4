use tracing::debug;

use super::processor::AgentInner;
use crate::script::{Interpreter, ScriptError};

/// Snippet execution implementation
impl AgentInner {
    /// Run a sanitized snippet against the persistent namespace.
    ///
    /// Print output is returned even when execution fails partway.
    pub(super) async fn execute_code(&mut self, code: &str) -> (Result<(), ScriptError>, Vec<String>) {
        let mut interpreter = Interpreter::new(&self.toolbox);
        let result = interpreter.run(code, &mut self.namespace).await;
        let output = interpreter.into_output();

        debug!(
            "Snippet finished ({}), {} variables bound, {} lines printed",
            if result.is_ok() { "ok" } else { "failed" },
            self.namespace.len(),
            output.len()
        );
        (result, output)
    }
}
