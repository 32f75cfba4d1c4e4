use std::time::Duration;

use crate::Config;

/// Loop parameters taken from the process configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_steps: usize,
    /// Pause between iterations
    pub step_delay: Duration,
}

impl From<&Config> for AgentConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_steps: config.max_steps,
            step_delay: Duration::from_millis(config.step_delay_ms),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}
