//! Browser code agent
//!
//! Drives a Chrome page through a perceive-decide-act loop: the page is captured via
//! `DOMSnapshot`, indexed into ephemeral `[i_N]` handles and serialized for an oracle,
//! whose code snippets run against a persistent namespace seeded with a fixed action toolbox.

pub mod agent;
mod browser;
pub mod browser_setup;
pub mod dom;
pub mod driver;
pub mod oracle;
pub mod script;
pub mod tools;
mod utils;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Step budget for one task run
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Bound on how long `navigate()` waits for the page to load
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Pause after `click()` so UI reactions settle before the next perception
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Pause between loop iterations
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub browser: BrowserConfig,
}

/// Chat-completion endpoint used as the decision oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,

    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

/// Browser security and launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Disable web security features (Same-Origin Policy, etc.)
    /// WARNING: Only enable for trusted content
    #[serde(default = "default_disable_security")]
    pub disable_security: bool,

    /// Window dimensions
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

fn default_max_steps() -> usize {
    15
}
fn default_navigation_timeout_ms() -> u64 {
    5000
}
fn default_settle_delay_ms() -> u64 {
    1000
}
fn default_step_delay_ms() -> u64 {
    1000
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_temperature() -> f64 {
    0.0
}
fn default_max_tokens() -> u64 {
    2048
}
fn default_oracle_timeout_secs() -> u64 {
    120
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_disable_security() -> bool {
    false // SECURE BY DEFAULT
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    720
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            step_delay_ms: default_step_delay_ms(),
            oracle: OracleConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_oracle_timeout_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            disable_security: default_disable_security(),
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

/// Load config from config.yaml in package root
pub fn load_yaml_config() -> anyhow::Result<Config> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.yaml");
    load_yaml_config_from(&config_path)
}

/// Load config from an explicit path, falling back to defaults when the file is absent
pub fn load_yaml_config_from(config_path: &Path) -> anyhow::Result<Config> {
    if config_path.exists() {
        let contents = fs::read_to_string(config_path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

pub use agent::{
    Agent, AgentConfig, AgentError, AgentOutcome, AgentResult, AgentRun, CompletionSchema,
    ConversationHistory, StepRecord,
};
pub use browser::{BrowserError, BrowserResult, BrowserWrapper, create_blank_page, launch_browser};
pub use dom::{DomService, ElementRecord, HandleMap, PageState, PerceptionError};
pub use driver::{CdpPageDriver, DriverError, PageDriver};
pub use oracle::{ChatMessage, ChatRole, OpenAiOracle, Oracle, OracleError};
pub use script::{FailureClass, Interpreter, Namespace, ScriptError, sanitize_code};
pub use tools::{ToolError, ToolResult, Toolbox};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_budget() {
        let config = Config::default();
        assert_eq!(config.max_steps, 15);
        assert_eq!(config.navigation_timeout_ms, 5000);
        assert_eq!(config.settle_delay_ms, 1000);
        assert!(config.browser.headless);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("max_steps: 4\noracle:\n  model: local\n").unwrap();
        assert_eq!(config.max_steps, 4);
        assert_eq!(config.oracle.model, "local");
        assert_eq!(config.oracle.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.navigation_timeout_ms, 5000);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_yaml_config_from(Path::new("/nonexistent/config.yaml")).unwrap();
        assert_eq!(config.max_steps, 15);
    }
}
