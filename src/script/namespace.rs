use serde_json::Value;
use std::collections::BTreeMap;

use super::ScriptError;
use crate::tools::TOOL_NAMES;

/// Helpers available to snippets next to the toolbox
pub const HELPER_NAMES: &[&str] = &["print", "sleep", "len"];

/// Words that parse as something other than a variable
const KEYWORDS: &[&str] = &[
    "let", "const", "var", "await", "true", "false", "null", "undefined", "True", "False", "None",
];

/// Variables that persist across snippets for the whole task.
///
/// Bindings are never rolled back: a snippet that fails midway keeps every
/// assignment made before the failure.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    vars: BTreeMap<String, Value>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in functions and keywords; none of these can be bound
    pub fn is_reserved(name: &str) -> bool {
        TOOL_NAMES.contains(&name) || HELPER_NAMES.contains(&name) || KEYWORDS.contains(&name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        if Self::is_reserved(name) {
            return Err(ScriptError::ReservedName(name.to_string()));
        }
        self.vars.insert(name.to_string(), value);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.vars.keys().map(String::as_str)
    }
}
