//! Message templates exchanged with the oracle
//!
//! The element line format and the `[i_N]` markers described here must match
//! `dom::serialize_elements` and `tools::parse_index`.

use super::CompletionSchema;

/// System message: task, completion schema, toolbox and rules
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    task: String,
    schema: CompletionSchema,
}

impl SystemPrompt {
    pub fn new(task: impl Into<String>, schema: CompletionSchema) -> Self {
        Self {
            task: task.into(),
            schema,
        }
    }

    pub fn build_prompt(&self) -> String {
        format!(
            r#"You are a browser automation agent. You act by writing short code snippets.

USER TASK: {task}

REQUIRED OUTPUT SCHEMA (call done() with a value of this shape):
{schema}

AVAILABLE FUNCTIONS:
- navigate("https://...")            load a URL and wait for the network to settle
- click(index)                       click the element with that index, e.g. click(3) or click("[i_3]")
- input_text(index, "text")          focus the element, then type the text
- evaluate("js expression", variables={{}})
                                     evaluate ONE JavaScript expression in the page and return its JSON value.
                                     `params` holds the variables object; `await` is allowed inside.
                                     For statements, use an IIFE: evaluate("(() => {{ ...; return x; }})()")
- get_element(index, depth=1)        inspect an element's tag, attributes, text and DOM subtree
- done(result)                       finish the task with the final result
- print(...)                         show values to yourself in the next step
- sleep(seconds)                     wait before continuing
- len(x)                             length of an array, string or object

SNIPPET LANGUAGE:
- One statement per line (or separated by ';'): `name = expr`, `let name = expr`, `name += expr`, or a function call.
- Values are JSON: strings, numbers, true/false/null, [arrays], {{objects}}; access with a.b and a[0].
- `+` adds numbers, joins strings, concatenates arrays and merges objects.
- Only the functions above can be called. There are no loops, conditions or imports; do that work inside evaluate().

RULES:
1. The page state lists elements as `[i_N] <tag ...> text`. Only elements with an [i_N] marker can be clicked or typed into.
2. Indices are VALID ONLY FOR THE CURRENT STEP. They change after every step and after navigate().
3. Variables you assign persist between steps, even when a later statement fails.
4. If a snippet fails, the error is reported back to you; fix it and try again.
5. Do not invent indices. Only use what you see in the page state.
6. Reply with a single code block and nothing else."#,
            task = self.task,
            schema = self.schema.render(),
        )
    }
}

/// Per-step user message built from the perception result
#[derive(Debug, Clone, Default)]
pub struct AgentMessagePrompt;

impl AgentMessagePrompt {
    pub fn build_message_prompt(&self, url: Option<&str>, state: &str, printed: &[String]) -> String {
        let state = if state.trim().is_empty() {
            "(no visible elements)"
        } else {
            state
        };

        let mut message = format!(
            "CURRENT URL: {}\n\nINTERACTIVE DOM STATE:\n{}\n",
            url.unwrap_or("unknown"),
            state
        );
        if !printed.is_empty() {
            message.push_str("\nOUTPUT FROM PREVIOUS STEP:\n");
            message.push_str(&printed.join("\n"));
            message.push('\n');
        }
        message.push_str("\nWrite the next code snippet to proceed.");
        message
    }
}

/// Feedback appended after a failed execution
pub fn execution_error_message(error: &str) -> String {
    format!(
        "The previous code failed with: Execution Error: {}. Please fix it and try again.",
        error
    )
}

/// Perception content used when the page could not be read
pub fn perception_error_text(error: &str) -> String {
    format!("Error reading DOM: {}", error)
}
