//! Oracle snippet handling: sanitizing, parsing and capability-scoped execution
//!
//! Snippets are a small statement language over JSON values. Besides literals,
//! variables and `+`, the only things a snippet can do are call the action
//! toolbox and the `print`/`sleep`/`len` helpers.

mod ast;
mod interpreter;
mod lexer;
mod namespace;
mod parser;
mod sanitizer;

pub use ast::{Call, Expr, Program, Stmt, StmtKind};
pub use interpreter::Interpreter;
pub use namespace::{HELPER_NAMES, Namespace};
pub use parser::{MAX_NESTING, parse_program};
pub use sanitizer::sanitize_code;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tools::ToolError;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("SyntaxError on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("NameError: name '{0}' is not defined")]
    UndefinedVariable(String),

    #[error("NameError: '{0}' is not a known function")]
    UnknownFunction(String),

    #[error("'{0}' is reserved and cannot be assigned")]
    ReservedName(String),

    #[error("{function}(): {message}")]
    Argument { function: String, message: String },

    #[error("TypeError: {0}")]
    Type(String),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Coarse class of a failed snippet, recorded with each step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Rejected before the first statement ran
    Syntax,
    /// An index or argument did not resolve; the page was not touched
    Resolution,
    /// The page rejected a navigation, click, keystroke or script
    Action,
    /// Name, type or argument error inside the snippet
    Runtime,
}

impl ScriptError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Parse { .. } | Self::ReservedName(_) => FailureClass::Syntax,
            Self::Tool(e) if e.is_resolution() => FailureClass::Resolution,
            Self::Tool(_) => FailureClass::Action,
            Self::UndefinedVariable(_)
            | Self::UnknownFunction(_)
            | Self::Argument { .. }
            | Self::Type(_) => FailureClass::Runtime,
        }
    }
}
