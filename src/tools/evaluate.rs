//! evaluate(script, variables)
//!
//! The script is a single JavaScript expression. It is wrapped in an async arrow
//! function taking `params`, so `await` works inside it and caller variables
//! arrive as a JSON object.

use serde_json::Value;
use tracing::debug;

use super::{ToolError, ToolResult, Toolbox};

/// Build the page-side expression for `script` with `variables` bound to `params`
pub fn build_expression(script: &str, variables: Option<&Value>) -> String {
    let body = script.trim().trim_end_matches(';').trim_end();
    let params = match variables {
        None | Some(Value::Null) => "{}".to_string(),
        Some(v) => v.to_string(),
    };
    format!("(async (params) => (\n{}\n))({})", body, params)
}

impl Toolbox {
    /// Evaluate a JS expression in the page and return its JSON value.
    ///
    /// A thrown exception or rejected promise becomes an error carrying the message.
    pub async fn evaluate(&self, script: &str, variables: Option<&Value>) -> ToolResult<Value> {
        let expression = build_expression(script, variables);
        debug!("Evaluating {} chars of JS", expression.len());
        self.driver
            .evaluate(&expression)
            .await
            .map_err(ToolError::Evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverError;
    use crate::tools::test_support::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn wraps_expression_with_params() {
        let expr = build_expression("document.title;", Some(&json!({"n": 2})));
        assert_eq!(expr, "(async (params) => (\ndocument.title\n))({\"n\":2})");
        let expr = build_expression("params.n * 2", None);
        assert!(expr.ends_with("({})"));
    }

    #[test]
    fn trailing_line_comment_cannot_swallow_the_wrapper() {
        let expr = build_expression("1 + 1 // two", None);
        assert!(expr.contains("// two\n))"));
    }

    #[tokio::test]
    async fn returns_the_page_value() {
        let driver = Arc::new(RecordingDriver::default());
        *driver.evaluate_result.lock() = Some(Ok(json!("Example Domain")));
        let tb = Toolbox::with_timing(driver.clone(), empty_handles(), Duration::ZERO, Duration::ZERO);

        let value = tb.evaluate("document.title", None).await.unwrap();
        assert_eq!(value, json!("Example Domain"));
        assert!(driver.calls()[0].starts_with("eval (async (params) =>"));
    }

    #[tokio::test]
    async fn page_exceptions_become_evaluation_errors() {
        let driver = Arc::new(RecordingDriver::default());
        *driver.evaluate_result.lock() =
            Some(Err(DriverError::Exception("ReferenceError: foo is not defined".into())));
        let tb = Toolbox::with_timing(driver, empty_handles(), Duration::ZERO, Duration::ZERO);

        let err = tb.evaluate("foo.bar", None).await.unwrap_err();
        assert!(matches!(err, ToolError::Evaluation(_)));
        assert!(err.to_string().contains("foo is not defined"));
    }
}
